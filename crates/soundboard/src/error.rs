use thiserror::Error;

/// Errors raised while validating soundboard settings.
///
/// Playback itself never fails toward the caller: missing assets and rejected
/// playback are logged and otherwise absorbed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SoundboardError {
    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,
    #[error("sound file extension must not be empty")]
    EmptyExtension,
    #[error("element id for {0} must not be empty")]
    EmptyElementId(&'static str),
    #[error("seek step must be a positive finite number, got {0}")]
    InvalidSeekStep(String),
}
