//! Timestamp decoding for SRT timing lines.
//! Handles `HH:MM:SS,mmm` codes and the optional `X1:.. Y2:..` annotation.

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static TIMING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([0-9]+:[0-9]+:[0-9]+[,.][0-9]+)\s*-->\s*([0-9]+:[0-9]+:[0-9]+[,.][0-9]+)(.*)$")
        .expect("valid timing line regex")
});
static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+):([0-9]+):([0-9]+)[,.]([0-9]+)$").expect("valid timestamp regex")
});
static COORDINATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([XY][12]):(-?[0-9]+)").expect("valid coordinate regex")
});

/// Pixel-space box hint carried by some SRT files after the end time.
/// Each coordinate is optional since writers emit arbitrary subsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x1: Option<i32>,
    pub x2: Option<i32>,
    pub y1: Option<i32>,
    pub y2: Option<i32>,
}

/// Decoded timing line: start and end in seconds plus the optional position.
#[derive(Debug, Clone, PartialEq)]
pub struct Timing {
    pub start: f64,
    pub end: f64,
    pub position: Option<Position>,
}

/// Parse a timing line like `00:00:01,000 --> 00:00:02,500 X1:10 Y1:20`.
/// Fails when either code is malformed or out of range, or when the range is empty.
pub fn parse_timing_line(line: &str) -> Result<Timing> {
    let caps = TIMING_LINE
        .captures(line)
        .ok_or_else(|| anyhow!("malformed timing line"))?;
    let start = decode_timestamp(&caps[1]).context("bad start time")?;
    let end = decode_timestamp(&caps[2]).context("bad end time")?;
    if start >= end {
        bail!("invalid time range");
    }
    Ok(Timing {
        start,
        end,
        position: parse_position(&caps[3]),
    })
}

/// Decode `HH:MM:SS,mmm` (or with `.`) into seconds.
/// Minutes and seconds must be below 60; only the first three fraction digits count.
pub fn decode_timestamp(code: &str) -> Result<f64> {
    let caps = TIMESTAMP
        .captures(code.trim())
        .ok_or_else(|| anyhow!("bad timestamp {code:?}"))?;
    let hours: u64 = caps[1].parse().context("hours out of range")?;
    let minutes: u64 = caps[2].parse().context("minutes out of range")?;
    let seconds: u64 = caps[3].parse().context("seconds out of range")?;
    if minutes >= 60 || seconds >= 60 {
        bail!("time component out of range in {code:?}");
    }
    let millis = decode_millis(&caps[4]);
    if millis >= 1000 {
        bail!("milliseconds out of range in {code:?}");
    }
    let total_ms = hours
        .checked_mul(3_600_000)
        .and_then(|ms| ms.checked_add((minutes * 60 + seconds) * 1000 + u64::from(millis)))
        .ok_or_else(|| anyhow!("hours out of range in {code:?}"))?;
    Ok(total_ms as f64 / 1000.0)
}

/// Take up to three digits and right-pad them, so `5` is 500ms and `05` is 50ms.
fn decode_millis(digits: &str) -> u32 {
    digits
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(3)
        .fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
}

/// Encode seconds as `HH:MM:SS,mmm`, rounding to the nearest millisecond.
pub fn format_timestamp(seconds: f64) -> String {
    let ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let h = ms / 3_600_000;
    let m = (ms % 3_600_000) / 60_000;
    let s = (ms % 60_000) / 1000;
    let ms = ms % 1000;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

fn parse_position(rest: &str) -> Option<Position> {
    let mut position = Position::default();
    let mut found = false;
    for caps in COORDINATE.captures_iter(rest) {
        let Ok(value) = caps[2].parse::<i32>() else {
            continue;
        };
        let slot = match caps[1].to_ascii_uppercase().as_str() {
            "X1" => &mut position.x1,
            "X2" => &mut position.x2,
            "Y1" => &mut position.y1,
            _ => &mut position.y2,
        };
        *slot = Some(value);
        found = true;
    }
    found.then_some(position)
}
