//! `soundboard`: a terminal soundboard.
//!
//! Features:
//! - one button per sound file in the sounds directory, plus Stop
//! - one sound at a time: starting a sound stops the previous one
//! - a seek gauge and remaining-time label that follow the playing sound

mod config;
mod library;
mod logs;
mod ui;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use crossbeam_channel::unbounded;
use soundboard::assets::AssetResolver;
use soundboard_player::NativeBackend;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{FileConfig, Overrides, Settings};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    ", ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "soundboard", version = VERSION)]
struct Args {
    /// TOML config file with `[soundboard]` and `[output]` tables.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the sound files.
    #[arg(long)]
    sounds_dir: Option<String>,

    /// Sound file extension, without the dot.
    #[arg(long)]
    extension: Option<String>,

    /// Output device name (substring match). Defaults to the system default device.
    #[arg(long)]
    device: Option<String>,

    /// List output devices and exit.
    #[arg(long)]
    list_devices: bool,

    /// Seek poll period in milliseconds.
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Buffered audio per pipeline stage, in seconds.
    #[arg(long)]
    buffer_seconds: Option<f32>,

    /// Resampler chunk size in frames.
    #[arg(long)]
    chunk_frames: Option<usize>,

    /// Max frames pulled per output callback refill.
    #[arg(long)]
    refill_max_frames: Option<usize>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            sounds_dir: self.sounds_dir.clone(),
            extension: self.extension.clone(),
            device: self.device.clone(),
            poll_ms: self.poll_ms,
            buffer_seconds: self.buffer_seconds,
            chunk_frames: self.chunk_frames,
            refill_max_frames: self.refill_max_frames,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_devices {
        for (i, name) in NativeBackend::list_devices()?.iter().enumerate() {
            println!("#{i}: {name}");
        }
        return Ok(());
    }

    let (log_tx, log_rx) = unbounded::<String>();
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,soundboard=info")),
        )
        .with(logs::LogLayer::new(log_tx))
        .init();

    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(file, args.overrides())?;

    let assets = AssetResolver::from_config(&settings.board);
    let sounds = library::scan_sounds(Path::new(&settings.board.sounds_dir), &assets)?;
    tracing::info!(
        version = VERSION,
        dir = %settings.board.sounds_dir,
        count = sounds.len(),
        "sounds loaded"
    );

    ui::run_tui(settings, sounds, log_rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_overrides() {
        let args = Args::parse_from([
            "soundboard",
            "--sounds-dir",
            "/srv/sfx",
            "--poll-ms",
            "50",
            "--device",
            "usb",
        ]);
        let o = args.overrides();
        assert_eq!(o.sounds_dir.as_deref(), Some("/srv/sfx"));
        assert_eq!(o.poll_ms, Some(50));
        assert_eq!(o.device.as_deref(), Some("usb"));
        assert!(o.extension.is_none());
        assert!(!args.list_devices);
    }
}
