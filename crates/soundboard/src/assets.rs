//! Sound identifier → asset path.

use crate::config::SoundboardConfig;

/// Maps a sound identifier to `{dir}/{name}.{ext}`.
///
/// The identifier is interpolated as is: no trimming, escaping, or case folding.
/// An identifier without a matching file still yields a path; the media backend
/// simply never reports metadata for it.
#[derive(Clone, Debug)]
pub struct AssetResolver {
    dir: String,
    extension: String,
}

impl AssetResolver {
    pub fn new(dir: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn from_config(config: &SoundboardConfig) -> Self {
        Self::new(config.sounds_dir.clone(), config.extension.clone())
    }

    pub fn resolve(&self, name: &str) -> String {
        let dir = self.dir.trim_end_matches('/');
        if dir.is_empty() {
            format!("{name}.{}", self.extension)
        } else {
            format!("{dir}/{name}.{}", self.extension)
        }
    }

    /// Reverse of [`resolve`](Self::resolve) for a bare file name, e.g. `"bell.mp3"` → `"bell"`.
    pub fn identifier_for_file(&self, file_name: &str) -> Option<String> {
        let stem = file_name.strip_suffix(&self.extension)?.strip_suffix('.')?;
        if stem.is_empty() {
            None
        } else {
            Some(stem.to_string())
        }
    }
}

impl Default for AssetResolver {
    fn default() -> Self {
        Self::from_config(&SoundboardConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_uses_sounds_dir_and_mp3_by_default() {
        let assets = AssetResolver::default();
        assert_eq!(assets.resolve("airhorn"), "sounds/airhorn.mp3");
    }

    #[test]
    fn resolve_does_not_escape_or_fold_case() {
        let assets = AssetResolver::default();
        assert_eq!(assets.resolve("Ba Dum Tss"), "sounds/Ba Dum Tss.mp3");
        assert_eq!(assets.resolve("../x"), "sounds/../x.mp3");
        assert_eq!(assets.resolve("拍手"), "sounds/拍手.mp3");
    }

    #[test]
    fn resolve_handles_trailing_slash_and_empty_dir() {
        assert_eq!(AssetResolver::new("clips/", "wav").resolve("a"), "clips/a.wav");
        assert_eq!(AssetResolver::new("", "wav").resolve("a"), "a.wav");
    }

    #[test]
    fn identifier_for_file_strips_matching_extension_only() {
        let assets = AssetResolver::default();
        assert_eq!(assets.identifier_for_file("bell.mp3"), Some("bell".to_string()));
        assert_eq!(assets.identifier_for_file("bell.wav"), None);
        assert_eq!(assets.identifier_for_file(".mp3"), None);
        assert_eq!(assets.identifier_for_file("bellmp3"), None);
    }
}
