//! Diagnostic checks over a parsed, time-sorted cue list.
//! Nothing here changes the cues; the report only feeds logging and tests.

use crate::document::Cue;
use serde::Serialize;
use tracing::debug;

/// Cues shorter than this are hard to read.
pub const MIN_READABLE_SECS: f64 = 0.5;
/// Cues longer than this are probably mistimed.
pub const MAX_EXPECTED_SECS: f64 = 30.0;

/// Two adjacent cues whose time ranges intersect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlap {
    pub current_index: u32,
    pub next_index: u32,
    pub overlap_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationIssue {
    TooShort,
    TooLong,
}

/// A cue whose duration falls outside the readable range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationWarning {
    pub index: u32,
    pub duration: f64,
    pub issue: DurationIssue,
}

/// Aggregate diagnostics for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub total: usize,
    pub formatted: usize,
    pub positioned: usize,
    pub overlaps: Vec<Overlap>,
    pub duration_warnings: Vec<DurationWarning>,
}

impl ValidationReport {
    pub fn short_cues(&self) -> usize {
        self.count(DurationIssue::TooShort)
    }

    pub fn long_cues(&self) -> usize {
        self.count(DurationIssue::TooLong)
    }

    fn count(&self, issue: DurationIssue) -> usize {
        self.duration_warnings
            .iter()
            .filter(|w| w.issue == issue)
            .count()
    }
}

/// Compute overlap and duration diagnostics.
/// Expects `cues` already sorted by start time; only adjacent pairs are compared.
pub fn validate(cues: &[Cue]) -> ValidationReport {
    let mut report = ValidationReport {
        total: cues.len(),
        formatted: cues.iter().filter(|c| c.has_formatting).count(),
        positioned: cues.iter().filter(|c| c.position.is_some()).count(),
        ..Default::default()
    };
    for pair in cues.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        if current.end_time > next.start_time {
            let overlap_seconds = current.end_time - next.start_time;
            debug!(
                current = current.index,
                next = next.index,
                "subtitle cues overlap by {overlap_seconds:.3}s"
            );
            report.overlaps.push(Overlap {
                current_index: current.index,
                next_index: next.index,
                overlap_seconds,
            });
        }
    }
    for cue in cues {
        let issue = if cue.duration < MIN_READABLE_SECS {
            DurationIssue::TooShort
        } else if cue.duration > MAX_EXPECTED_SECS {
            DurationIssue::TooLong
        } else {
            continue;
        };
        debug!(index = cue.index, duration = cue.duration, ?issue, "unusual cue duration");
        report.duration_warnings.push(DurationWarning {
            index: cue.index,
            duration: cue.duration,
            issue,
        });
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(index: u32, start: f64, end: f64) -> Cue {
        Cue::new(index, start, end, None, "text")
    }

    #[test]
    fn reports_adjacent_overlaps() {
        let cues = vec![cue(1, 1.0, 3.0), cue(2, 2.5, 4.0), cue(3, 4.0, 5.0)];
        let report = validate(&cues);
        assert_eq!(report.overlaps.len(), 1);
        assert_eq!(report.overlaps[0].current_index, 1);
        assert_eq!(report.overlaps[0].next_index, 2);
        assert!((report.overlaps[0].overlap_seconds - 0.5).abs() < 1e-9);
    }

    #[test]
    fn flags_short_and_long_cues() {
        let cues = vec![cue(1, 0.0, 0.2), cue(2, 1.0, 2.0), cue(3, 10.0, 45.0)];
        let report = validate(&cues);
        assert_eq!(report.short_cues(), 1);
        assert_eq!(report.long_cues(), 1);
        assert_eq!(report.duration_warnings[0].index, 1);
        assert_eq!(report.duration_warnings[1].issue, DurationIssue::TooLong);
    }

    #[test]
    fn counts_formatting_and_positions() {
        let mut cues = vec![cue(1, 0.0, 1.0)];
        cues.push(Cue::new(2, 1.0, 2.0, None, "<i>x</i>"));
        cues.push(Cue::new(
            3,
            2.0,
            3.0,
            Some(crate::srt::timing::Position {
                x1: Some(1),
                ..Default::default()
            }),
            "y",
        ));
        let report = validate(&cues);
        assert_eq!(report.total, 3);
        assert_eq!(report.formatted, 1);
        assert_eq!(report.positioned, 1);
        assert!(report.overlaps.is_empty());
    }
}
