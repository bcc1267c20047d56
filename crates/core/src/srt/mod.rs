//! This module is responsible for splitting SRT text into timed blocks.
//! It also writes cues back out as SRT while preserving timing.

pub mod timing;

use crate::document::Cue;
use anyhow::{anyhow, bail, Result};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use timing::{format_timestamp, parse_timing_line, Position};
use tracing::debug;

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid blank line regex"));

/// Represents a single SRT block that passed structural checks.
/// The text is kept untouched; markup is handled by the sanitizer.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    pub index: u32,
    pub start: f64,
    pub end: f64,
    pub position: Option<Position>,
    pub text: String,
}

/// A candidate block that was dropped, with the reason it was rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedBlock {
    /// 1-based position of the block among the blank-line separated chunks.
    pub block: usize,
    pub reason: String,
}

/// Normalize line endings, drop a leading BOM and trim the document.
pub fn normalize(input: &str) -> String {
    let text = input.replace("\r\n", "\n").replace('\r', "\n");
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    text.trim().to_string()
}

/// Split SRT text into blocks, skipping anything malformed.
/// Every rejected chunk is reported instead of failing the whole document.
pub fn split_blocks(input: &str) -> (Vec<RawBlock>, Vec<SkippedBlock>) {
    let text = normalize(input);
    let mut blocks = Vec::new();
    let mut skipped = Vec::new();
    if text.is_empty() {
        return (blocks, skipped);
    }
    for (i, chunk) in BLANK_LINES.split(&text).enumerate() {
        match parse_block(chunk) {
            Ok(block) => blocks.push(block),
            Err(err) => {
                debug!(block = i + 1, "skipping subtitle block: {err}");
                skipped.push(SkippedBlock {
                    block: i + 1,
                    reason: err.to_string(),
                });
            }
        }
    }
    (blocks, skipped)
}

/// Parse one chunk: index line, timing line, then one or more text lines.
fn parse_block(chunk: &str) -> Result<RawBlock> {
    let lines: Vec<&str> = chunk.trim().split('\n').collect();
    if lines.len() < 3 {
        bail!("fewer than 3 lines");
    }
    let index_line = lines[0].trim();
    let index: u32 = index_line
        .bytes()
        .all(|b| b.is_ascii_digit())
        .then(|| index_line.parse().ok())
        .flatten()
        .ok_or_else(|| anyhow!("invalid index {index_line:?}"))?;
    let timing = parse_timing_line(lines[1])?;
    Ok(RawBlock {
        index,
        start: timing.start,
        end: timing.end,
        position: timing.position,
        text: lines[2..].join("\n"),
    })
}

/// Format cues back to SRT text.
/// The way this works is by writing each cue sequentially with blank lines.
pub fn format(cues: &[Cue]) -> String {
    let mut out = String::new();
    for cue in cues {
        out.push_str(&format!(
            "{}\n{} --> {}{}\n{}\n\n",
            cue.index,
            format_timestamp(cue.start_time),
            format_timestamp(cue.end_time),
            cue.position.map(format_position).unwrap_or_default(),
            cue.raw_text
        ));
    }
    out
}

/// Render a position back as ` X1:.. X2:.. Y1:.. Y2:..`, omitting absent coordinates.
fn format_position(position: Position) -> String {
    [
        ("X1", position.x1),
        ("X2", position.x2),
        ("Y1", position.y1),
        ("Y2", position.y2),
    ]
    .iter()
    .filter_map(|(name, value)| value.map(|v| format!(" {name}:{v}")))
    .collect()
}
