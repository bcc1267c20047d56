//! Parsed subtitle documents and the active-cue query.

use crate::markup::sanitize;
use crate::srt::timing::Position;
use crate::srt::{split_blocks, SkippedBlock};
use crate::validate::{validate, ValidationReport};
use serde::Serialize;
use tracing::{info, trace};

/// One timed subtitle entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cue {
    /// Sequence number declared in the source; not guaranteed unique.
    pub index: u32,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub raw_text: String,
    pub plain_text: String,
    pub html: String,
    pub has_formatting: bool,
    pub position: Option<Position>,
}

impl Cue {
    /// Build a cue from already-validated timing, sanitizing its text.
    pub fn new(
        index: u32,
        start_time: f64,
        end_time: f64,
        position: Option<Position>,
        raw_text: &str,
    ) -> Self {
        let sanitized = sanitize(raw_text);
        Self {
            index,
            start_time,
            end_time,
            duration: end_time - start_time,
            raw_text: raw_text.to_string(),
            plain_text: sanitized.plain_text,
            html: sanitized.html,
            has_formatting: sanitized.has_formatting,
            position,
        }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, time: f64) -> bool {
        self.start_time <= time && time <= self.end_time
    }
}

/// Immutable result of one parse: cues in start-time order plus diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubtitleDocument {
    pub cues: Vec<Cue>,
    pub skipped: Vec<SkippedBlock>,
    pub report: ValidationReport,
}

impl SubtitleDocument {
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    /// Position of the earliest-starting cue containing `time`.
    pub fn active_position(&self, time: f64) -> Option<usize> {
        self.cues
            .iter()
            .take_while(|cue| cue.start_time <= time)
            .position(|cue| cue.contains(time))
    }

    /// The cue showing at `time`, which must already include any sync offset.
    /// When cues overlap the earliest-starting one wins.
    pub fn active_cue_at(&self, time: f64) -> Option<&Cue> {
        self.active_position(time).map(|i| &self.cues[i])
    }

    /// End of the last cue, or zero for an empty document.
    pub fn end_time(&self) -> f64 {
        self.cues.iter().map(|c| c.end_time).fold(0.0, f64::max)
    }
}

/// Parse SRT text into a document.
/// Malformed blocks are skipped and recorded; this never fails.
pub fn parse(text: &str) -> SubtitleDocument {
    trace!("parse(len={})", text.len());
    let (blocks, skipped) = split_blocks(text);
    let mut cues: Vec<Cue> = blocks
        .into_iter()
        .map(|b| Cue::new(b.index, b.start, b.end, b.position, &b.text))
        .collect();
    cues.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    let report = validate(&cues);
    info!(
        cues = report.total,
        skipped = skipped.len(),
        formatted = report.formatted,
        positioned = report.positioned,
        overlaps = report.overlaps.len(),
        "parsed subtitles"
    );
    SubtitleDocument {
        cues,
        skipped,
        report,
    }
}

/// Free-function form of [`SubtitleDocument::active_cue_at`].
pub fn active_cue_at(document: &SubtitleDocument, time: f64) -> Option<&Cue> {
    document.active_cue_at(time)
}
