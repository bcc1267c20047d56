//! SRT subtitle parsing, sanitization and timed-cue lookup.
//! Hosts hand in raw subtitle text and poll for the cue to show.

pub mod document;
pub mod markup;
pub mod session;
pub mod settings;
pub mod srt;
pub mod validate;

pub use document::{active_cue_at, parse, Cue, SubtitleDocument};
pub use session::{CueChange, SubtitleSession, SubtitleTrack};
pub use settings::SubtitleSettings;
