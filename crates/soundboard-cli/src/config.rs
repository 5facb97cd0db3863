//! Config file loading and command-line overrides.
//!
//! Precedence: command-line flags, then the TOML file, then built-in defaults.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use soundboard::SoundboardConfig;
use soundboard_player::PlaybackConfig;

/// TOML layout: a `[soundboard]` table and an `[output]` table, both optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub soundboard: SoundboardConfig,
    pub output: OutputConfig,
}

/// Output device and buffering settings from TOML.
#[derive(Debug, Default, Deserialize)]
pub struct OutputConfig {
    /// Substring of the output device name.
    pub device: Option<String>,
    pub buffer_seconds: Option<f32>,
    pub chunk_frames: Option<usize>,
    pub refill_max_frames: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {path:?}"))?;
        toml::from_str(&raw).with_context(|| format!("parse config {path:?}"))
    }
}

/// Flags that override file settings when given.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub sounds_dir: Option<String>,
    pub extension: Option<String>,
    pub device: Option<String>,
    pub poll_ms: Option<u64>,
    pub buffer_seconds: Option<f32>,
    pub chunk_frames: Option<usize>,
    pub refill_max_frames: Option<usize>,
}

/// Everything the binary needs after merging.
#[derive(Debug, Clone)]
pub struct Settings {
    pub board: SoundboardConfig,
    pub playback: PlaybackConfig,
    pub device: Option<String>,
}

impl Settings {
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self> {
        let mut board = file.soundboard;
        if let Some(dir) = overrides.sounds_dir {
            board.sounds_dir = dir;
        }
        if let Some(ext) = overrides.extension {
            board.extension = ext;
        }
        if let Some(ms) = overrides.poll_ms {
            board.poll_interval_ms = ms;
        }
        board.validate().context("invalid soundboard settings")?;

        let defaults = PlaybackConfig::default();
        let playback = PlaybackConfig {
            chunk_frames: overrides
                .chunk_frames
                .or(file.output.chunk_frames)
                .unwrap_or(defaults.chunk_frames),
            refill_max_frames: overrides
                .refill_max_frames
                .or(file.output.refill_max_frames)
                .unwrap_or(defaults.refill_max_frames),
            buffer_seconds: overrides
                .buffer_seconds
                .or(file.output.buffer_seconds)
                .unwrap_or(defaults.buffer_seconds),
        };

        Ok(Self {
            board,
            playback,
            device: overrides.device.or(file.output.device),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let file: FileConfig = toml::from_str("").unwrap();
        let settings = Settings::resolve(file, Overrides::default()).unwrap();
        assert_eq!(settings.board, SoundboardConfig::default());
        assert_eq!(settings.playback.chunk_frames, PlaybackConfig::default().chunk_frames);
        assert!(settings.device.is_none());
    }

    #[test]
    fn flags_override_file_values() {
        let file: FileConfig = toml::from_str(
            r#"
            [soundboard]
            sounds_dir = "clips"
            poll_interval_ms = 100

            [output]
            device = "USB"
            buffer_seconds = 1.0
            "#,
        )
        .unwrap();
        let overrides = Overrides {
            sounds_dir: Some("/srv/sfx".to_string()),
            device: Some("Speakers".to_string()),
            ..Default::default()
        };

        let settings = Settings::resolve(file, overrides).unwrap();
        assert_eq!(settings.board.sounds_dir, "/srv/sfx");
        assert_eq!(settings.board.poll_interval_ms, 100);
        assert_eq!(settings.playback.buffer_seconds, 1.0);
        assert_eq!(settings.device.as_deref(), Some("Speakers"));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let overrides = Overrides {
            poll_ms: Some(0),
            ..Default::default()
        };
        assert!(Settings::resolve(FileConfig::default(), overrides).is_err());
    }

    #[test]
    fn unknown_output_key_is_ignored() {
        let file: FileConfig = toml::from_str("[output]\nlatency = 3\n").unwrap();
        assert!(file.output.device.is_none());
    }
}
