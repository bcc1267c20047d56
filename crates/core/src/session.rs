//! Subtitle state for one playback session.
//! The playback controller owns a `SubtitleSession` and feeds it the current time.

use crate::document::{parse, Cue, SubtitleDocument};
use crate::settings::{SubtitleSettings, SubtitleStyle};
use anyhow::{anyhow, Result};
use tracing::{debug, info, trace};

/// A parsed subtitle document labelled with its language.
#[derive(Debug, Clone)]
pub struct SubtitleTrack {
    pub language: String,
    pub document: SubtitleDocument,
}

/// What the renderer should do after a [`SubtitleSession::poll`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CueChange<'a> {
    Show(&'a Cue),
    Hide,
}

/// Tracks, the selected track, sync offset and the cue on screen.
#[derive(Debug, Clone, Default)]
pub struct SubtitleSession {
    tracks: Vec<SubtitleTrack>,
    selected: Option<usize>,
    sync_offset: f64,
    sync_step: f64,
    style: SubtitleStyle,
    shown: Option<usize>,
}

fn round_ms(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

impl SubtitleSession {
    pub fn new(settings: SubtitleSettings) -> Self {
        Self {
            sync_offset: round_ms(settings.sync_offset),
            sync_step: settings.sync_step,
            style: settings.style,
            ..Default::default()
        }
    }

    /// Parse `text` and store it under `language`, replacing a track with the same name.
    /// Returns the number of cues parsed.
    pub fn add_track(&mut self, language: &str, text: &str) -> usize {
        trace!("add_track language={language}");
        let document = parse(text);
        let count = document.len();
        if document.is_empty() {
            info!("no subtitles found for {language}");
        }
        let track = SubtitleTrack {
            language: language.to_string(),
            document,
        };
        match self.position_of(language) {
            Some(i) => {
                self.tracks[i] = track;
                if self.selected == Some(i) {
                    self.shown = None;
                }
            }
            None => self.tracks.push(track),
        }
        count
    }

    /// Add an uploaded file; the language is the file name up to its first dot.
    pub fn add_upload(&mut self, file_name: &str, text: &str) -> (String, usize) {
        let language = language_from_file_name(file_name);
        let count = self.add_track(&language, text);
        (language, count)
    }

    pub fn tracks(&self) -> &[SubtitleTrack] {
        &self.tracks
    }

    pub fn languages(&self) -> Vec<&str> {
        self.tracks.iter().map(|t| t.language.as_str()).collect()
    }

    /// Select a track by language, or turn subtitles off with `None`.
    pub fn select(&mut self, language: Option<&str>) -> Result<()> {
        let selected = match language {
            Some(language) => Some(
                self.position_of(language)
                    .ok_or_else(|| anyhow!("subtitle track not found: {language}"))?,
            ),
            None => None,
        };
        info!("subtitles {}", language.unwrap_or("off"));
        self.selected = selected;
        self.shown = None;
        Ok(())
    }

    pub fn selected(&self) -> Option<&SubtitleTrack> {
        self.selected.map(|i| &self.tracks[i])
    }

    pub fn sync_offset(&self) -> f64 {
        self.sync_offset
    }

    pub fn set_sync_offset(&mut self, seconds: f64) {
        self.sync_offset = round_ms(seconds);
        self.shown = None;
        debug!("subtitle sync offset {:+.3}s", self.sync_offset);
    }

    /// Nudge the offset by `steps` multiples of the configured step.
    pub fn adjust_sync(&mut self, steps: i32) -> f64 {
        self.set_sync_offset(self.sync_offset + f64::from(steps) * self.sync_step);
        self.sync_offset
    }

    pub fn style(&self) -> &SubtitleStyle {
        &self.style
    }

    /// The cue active at `playback_time` shifted by the sync offset.
    pub fn cue_at(&self, playback_time: f64) -> Option<&Cue> {
        self.selected()?
            .document
            .active_cue_at(playback_time + self.sync_offset)
    }

    /// Report whether the displayed cue changed since the previous poll.
    pub fn poll(&mut self, playback_time: f64) -> Option<CueChange<'_>> {
        let current = self
            .selected()
            .and_then(|t| t.document.active_position(playback_time + self.sync_offset));
        if current == self.shown {
            return None;
        }
        self.shown = current;
        match (self.selected, current) {
            (Some(track), Some(i)) => Some(CueChange::Show(&self.tracks[track].document.cues[i])),
            _ => Some(CueChange::Hide),
        }
    }

    /// Snapshot the current preferences for persistence.
    pub fn settings(&self) -> SubtitleSettings {
        SubtitleSettings {
            sync_offset: self.sync_offset,
            sync_step: self.sync_step,
            style: self.style.clone(),
        }
    }

    fn position_of(&self, language: &str) -> Option<usize> {
        self.tracks
            .iter()
            .position(|t| t.language.eq_ignore_ascii_case(language))
    }
}

/// `"spanish.forced.srt"` becomes `"spanish"`.
pub fn language_from_file_name(file_name: &str) -> String {
    file_name.split('.').next().unwrap_or(file_name).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENGLISH: &str = "1\n00:00:01,000 --> 00:00:03,000\nHello\n\n\
                           2\n00:00:05,000 --> 00:00:06,000\n<i>World</i>\n";
    const SPANISH: &str = "1\n00:00:01,000 --> 00:00:03,000\nHola\n";

    fn session() -> SubtitleSession {
        let mut session = SubtitleSession::new(SubtitleSettings::default());
        session.add_track("English", ENGLISH);
        session.add_track("Spanish", SPANISH);
        session
    }

    #[test]
    fn nothing_shows_until_a_track_is_selected() {
        let mut session = session();
        assert!(session.cue_at(2.0).is_none());
        assert_eq!(session.poll(2.0), None);
        session.select(Some("english")).unwrap();
        assert_eq!(session.cue_at(2.0).unwrap().plain_text, "Hello");
    }

    #[test]
    fn unknown_track_keeps_selection() {
        let mut session = session();
        session.select(Some("Spanish")).unwrap();
        assert!(session.select(Some("Klingon")).is_err());
        assert_eq!(session.selected().unwrap().language, "Spanish");
        session.select(None).unwrap();
        assert!(session.selected().is_none());
    }

    #[test]
    fn poll_reports_only_changes() {
        let mut session = session();
        session.select(Some("English")).unwrap();
        assert_eq!(session.poll(0.5), None);
        match session.poll(1.5) {
            Some(CueChange::Show(cue)) => assert_eq!(cue.index, 1),
            other => panic!("expected show, got {other:?}"),
        }
        assert_eq!(session.poll(2.5), None);
        assert_eq!(session.poll(4.0), Some(CueChange::Hide));
        assert_eq!(session.poll(4.5), None);
        match session.poll(5.5) {
            Some(CueChange::Show(cue)) => assert_eq!(cue.html, "<em>World</em>"),
            other => panic!("expected show, got {other:?}"),
        }
    }

    #[test]
    fn sync_offset_shifts_lookup() {
        let mut session = session();
        session.select(Some("English")).unwrap();
        assert!(session.cue_at(0.5).is_none());
        session.set_sync_offset(0.6);
        assert_eq!(session.cue_at(0.5).unwrap().index, 1);
        assert_eq!(session.adjust_sync(-2), 0.4);
        assert_eq!(session.adjust_sync(3), 0.7);
        assert_eq!(session.settings().sync_offset, 0.7);
    }

    #[test]
    fn upload_uses_file_stem_as_language() {
        let mut session = session();
        let (language, count) = session.add_upload("french.fr.srt", SPANISH);
        assert_eq!(language, "french");
        assert_eq!(count, 1);
        assert_eq!(session.languages(), vec!["English", "Spanish", "french"]);
    }

    #[test]
    fn re_adding_a_language_replaces_it() {
        let mut session = session();
        assert_eq!(session.add_track("spanish", ENGLISH), 2);
        assert_eq!(session.tracks().len(), 2);
        session.select(Some("Spanish")).unwrap();
        assert_eq!(session.cue_at(5.5).unwrap().index, 2);
    }
}
