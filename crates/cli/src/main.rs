//! Binary entry point for the subtitle cue tool.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use subcue_core::srt::{self, timing};
use subcue_core::{parse, CueChange, SubtitleDocument, SubtitleSession, SubtitleSettings};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command line options for the binary.
#[derive(Parser)]
struct Cli {
    /// Enable verbose debug and trace logs.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a subtitle file and print its diagnostics.
    Inspect {
        input: PathBuf,
        /// Dump the whole parsed document as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the cue showing at a playback time.
    At {
        input: PathBuf,
        /// Seconds, or a `HH:MM:SS,mmm` timestamp.
        time: String,
        #[command(flatten)]
        sync: SyncArgs,
    },
    /// Simulate playback and print each subtitle change.
    Play {
        input: PathBuf,
        /// Playback position to start from, in seconds.
        #[arg(long, default_value_t = 0.0)]
        from: f64,
        /// Clock tick in milliseconds.
        #[arg(long, default_value_t = 250)]
        tick_ms: u64,
        #[command(flatten)]
        sync: SyncArgs,
    },
    /// Write a cleaned, sorted copy of the subtitle file.
    Clean {
        input: PathBuf,
        /// Output path; defaults to `<stem>_clean.srt` next to the input.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct SyncArgs {
    /// Sync offset in seconds; overrides the settings file.
    #[arg(long, allow_hyphen_values = true)]
    offset: Option<f64>,

    /// JSON settings file with sync offset and style.
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl SyncArgs {
    fn load(&self) -> Result<SubtitleSettings> {
        let mut settings = match &self.settings {
            Some(path) => SubtitleSettings::load(path)?,
            None => SubtitleSettings::default(),
        };
        if let Some(offset) = self.offset {
            settings.sync_offset = offset;
        }
        Ok(settings)
    }
}

/// Read a subtitle file, decoding invalid UTF-8 lossily.
fn read_subtitles(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Build a session with the file loaded and selected.
fn open_session(path: &Path, sync: &SyncArgs) -> Result<SubtitleSession> {
    let mut session = SubtitleSession::new(sync.load()?);
    let file_name = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let (language, count) = session.add_upload(&file_name, &read_subtitles(path)?);
    if count == 0 {
        warn!("no subtitles could be parsed from {}", path.display());
    }
    session.select(Some(&language))?;
    Ok(session)
}

fn parse_time(time: &str) -> Result<f64> {
    match time.parse::<f64>() {
        Ok(seconds) => Ok(seconds),
        Err(_) => timing::decode_timestamp(time),
    }
}

fn inspect(document: &SubtitleDocument, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(document)?);
        return Ok(());
    }
    let report = &document.report;
    println!(
        "{} cues ({} formatted, {} positioned), {} skipped blocks",
        report.total,
        report.formatted,
        report.positioned,
        document.skipped.len()
    );
    for skipped in &document.skipped {
        println!("  block {}: {}", skipped.block, skipped.reason);
    }
    for overlap in &report.overlaps {
        println!(
            "  cue {} overlaps cue {} by {:.3}s",
            overlap.current_index, overlap.next_index, overlap.overlap_seconds
        );
    }
    for warning in &report.duration_warnings {
        println!(
            "  cue {} lasts {:.3}s ({:?})",
            warning.index, warning.duration, warning.issue
        );
    }
    Ok(())
}

/// Drive a virtual playback clock and print every change until the last cue
/// ends or `stop` resolves.
async fn play(
    mut session: SubtitleSession,
    from: f64,
    tick_ms: u64,
    stop: impl Future<Output = std::io::Result<()>>,
) -> Result<()> {
    let end = session
        .selected()
        .map(|t| t.document.end_time())
        .unwrap_or_default();
    let mut ticker = tokio::time::interval(Duration::from_millis(tick_ms.max(1)));
    tokio::pin!(stop);
    let started = tokio::time::Instant::now();
    info!(
        "playing from {} with offset {:+.3}s, style {}",
        timing::format_timestamp(from),
        session.sync_offset(),
        session.style()
    );
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut stop => {
                info!("stopped");
                return Ok(());
            }
        }
        let now = from + started.elapsed().as_secs_f64();
        match session.poll(now) {
            Some(CueChange::Show(cue)) => {
                println!("[{}] {}", timing::format_timestamp(now), cue.plain_text)
            }
            Some(CueChange::Hide) => println!("[{}] -", timing::format_timestamp(now)),
            None => {}
        }
        if now > end + session.sync_offset().abs() {
            return Ok(());
        }
    }
}

/// Application entry point which parses CLI args and performs actions.
/// This function should initialize logging and delegate to the core library.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = if cli.debug {
        EnvFilter::default()
            .add_directive("subcue=trace".parse()?)
            .add_directive("subcue_core=trace".parse()?)
            .add_directive("info".parse()?)
    } else {
        EnvFilter::default()
            .add_directive("subcue=info".parse()?)
            .add_directive("subcue_core=info".parse()?)
            .add_directive("warn".parse()?)
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    match cli.command {
        Command::Inspect { input, json } => {
            let document = parse(&read_subtitles(&input)?);
            inspect(&document, json)?;
        }
        Command::At { input, time, sync } => {
            let session = open_session(&input, &sync)?;
            match session.cue_at(parse_time(&time)?) {
                Some(cue) => {
                    println!("{}", cue.html);
                    println!("{}", cue.plain_text);
                    println!("style: {}", session.style());
                }
                None => println!("(no subtitle)"),
            }
        }
        Command::Play {
            input,
            from,
            tick_ms,
            sync,
        } => {
            let session = open_session(&input, &sync)?;
            play(session, from, tick_ms, tokio::signal::ctrl_c()).await?;
        }
        Command::Clean { input, output } => {
            let document = parse(&read_subtitles(&input)?);
            let out = output.unwrap_or_else(|| {
                input.with_file_name(format!(
                    "{}_clean.srt",
                    input.file_stem().unwrap_or_default().to_string_lossy()
                ))
            });
            fs::write(&out, srt::format(&document.cues))
                .with_context(|| format!("writing {}", out.display()))?;
            info!("wrote {} cues to {}", document.cues.len(), out.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_session() -> SubtitleSession {
        let mut session = SubtitleSession::new(SubtitleSettings::default());
        let (language, _) =
            session.add_upload("movie.en.srt", "1\n00:00:00,000 --> 01:00:00,000\nLong\n");
        session.select(Some(&language)).unwrap();
        session
    }

    #[tokio::test]
    async fn stop_signal_outlives_many_ticks() {
        let stop = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<(), std::io::Error>(())
        };
        let run = play(long_session(), 0.0, 1, stop);
        tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("stop signal was honoured")
            .unwrap();
    }

    #[tokio::test]
    async fn playback_ends_after_the_last_cue() {
        let mut session = SubtitleSession::new(SubtitleSettings::default());
        let (language, _) =
            session.add_upload("short.srt", "1\n00:00:00,000 --> 00:00:00,020\nBlink\n");
        session.select(Some(&language)).unwrap();
        let run = play(session, 0.0, 5, std::future::pending());
        tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("playback finished")
            .unwrap();
    }

    #[test]
    fn times_accept_seconds_or_timestamps() {
        assert_eq!(parse_time("2.5").unwrap(), 2.5);
        assert_eq!(parse_time("00:01:02,500").unwrap(), 62.5);
        assert!(parse_time("soon").is_err());
    }
}
