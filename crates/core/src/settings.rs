//! Persisted subtitle preferences.
//! Stored as JSON; partial files are merged over the defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, trace};

/// Default step used when nudging the sync offset.
pub const DEFAULT_SYNC_STEP: f64 = 0.1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    #[default]
    Bottom,
    Top,
}

/// Visual style handed to the rendering host; parsing never looks at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleStyle {
    pub font_size: u32,
    pub color: String,
    pub placement: Placement,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_size: 24,
            color: "#ffffff".to_string(),
            placement: Placement::Bottom,
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Placement::Bottom => "bottom",
            Placement::Top => "top",
        })
    }
}

/// Short form for hosts that print instead of render, e.g. `bottom 24px #ffffff`.
impl fmt::Display for SubtitleStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}px {}", self.placement, self.font_size, self.color)
    }
}

/// User settings for subtitle playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleSettings {
    /// Seconds added to playback time before looking up a cue.
    pub sync_offset: f64,
    pub sync_step: f64,
    pub style: SubtitleStyle,
}

impl Default for SubtitleSettings {
    fn default() -> Self {
        Self {
            sync_offset: 0.0,
            sync_step: DEFAULT_SYNC_STEP,
            style: SubtitleStyle::default(),
        }
    }
}

impl SubtitleSettings {
    /// Load settings from `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        trace!("SubtitleSettings::load path={}", path.display());
        if !path.exists() {
            debug!("no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing settings {}", path.display()))
    }

    /// Save settings as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        trace!("SubtitleSettings::save path={}", path.display());
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).with_context(|| format!("writing settings {}", path.display()))?;
        debug!("saved subtitle settings to {}", path.display());
        Ok(())
    }
}
