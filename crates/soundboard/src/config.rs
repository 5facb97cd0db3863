//! Soundboard settings shared by every host.

use std::time::Duration;

use serde::Deserialize;

use crate::error::SoundboardError;

/// Settings for asset lookup, polling, and widget discovery.
///
/// Every field has a default, so an empty TOML table is a valid config.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SoundboardConfig {
    /// Directory holding the sound files.
    pub sounds_dir: String,
    /// File extension appended to each sound identifier.
    pub extension: String,
    /// Seek poll period in milliseconds.
    pub poll_interval_ms: u64,
    /// Element id of the stop control.
    pub stop_id: String,
    /// Element id of the seek control.
    pub seek_id: String,
    /// Element id of the remaining-time label.
    pub label_id: String,
    /// Step of a provisioned seek control, in seconds.
    pub seek_step: f64,
}

impl Default for SoundboardConfig {
    fn default() -> Self {
        Self {
            sounds_dir: "sounds".to_string(),
            extension: "mp3".to_string(),
            poll_interval_ms: 200,
            stop_id: "stp".to_string(),
            seek_id: "seek".to_string(),
            label_id: "time-remaining".to_string(),
            seek_step: 0.01,
        }
    }
}

impl SoundboardConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Reject settings that would leave the board unusable.
    pub fn validate(&self) -> Result<(), SoundboardError> {
        if self.poll_interval_ms == 0 {
            return Err(SoundboardError::ZeroPollInterval);
        }
        if self.extension.trim().is_empty() {
            return Err(SoundboardError::EmptyExtension);
        }
        for (what, id) in [
            ("stop control", &self.stop_id),
            ("seek control", &self.seek_id),
            ("time label", &self.label_id),
        ] {
            if id.trim().is_empty() {
                return Err(SoundboardError::EmptyElementId(what));
            }
        }
        if !(self.seek_step.is_finite() && self.seek_step > 0.0) {
            return Err(SoundboardError::InvalidSeekStep(self.seek_step.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = SoundboardConfig::default();
        assert_eq!(cfg.poll_interval(), Duration::from_millis(200));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_table_deserializes_to_defaults() {
        let cfg: SoundboardConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, SoundboardConfig::default());
    }

    #[test]
    fn partial_table_overrides_only_given_fields() {
        let cfg: SoundboardConfig =
            toml::from_str("sounds_dir = \"clips\"\npoll_interval_ms = 50\n").unwrap();
        assert_eq!(cfg.sounds_dir, "clips");
        assert_eq!(cfg.poll_interval_ms, 50);
        assert_eq!(cfg.extension, "mp3");
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let cfg = SoundboardConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(SoundboardError::ZeroPollInterval));
    }

    #[test]
    fn validate_rejects_blank_ids_and_extension() {
        let cfg = SoundboardConfig {
            extension: " ".to_string(),
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(SoundboardError::EmptyExtension));

        let cfg = SoundboardConfig {
            seek_id: String::new(),
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(SoundboardError::EmptyElementId("seek control"))
        );
    }

    #[test]
    fn validate_rejects_bad_seek_step() {
        let cfg = SoundboardConfig {
            seek_step: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(SoundboardError::InvalidSeekStep(_))
        ));
    }
}
