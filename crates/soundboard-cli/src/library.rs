//! Sound discovery: one button per file in the sounds directory.

use std::path::Path;

use anyhow::{Context, Result};
use soundboard::assets::AssetResolver;

/// Identifiers of every file in `dir` with the configured extension, sorted.
///
/// Non-recursive; subdirectories and other extensions are skipped.
pub fn scan_sounds(dir: &Path, assets: &AssetResolver) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("read sounds dir {dir:?}"))? {
        let entry = entry.with_context(|| format!("read entry in {dir:?}"))?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            tracing::debug!(?file_name, "skipping non-UTF-8 file name");
            continue;
        };
        if let Some(name) = assets.identifier_for_file(file_name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scan_lists_matching_files_sorted() {
        let dir = std::env::temp_dir().join(format!("soundboard-library-{}", std::process::id()));
        fs::create_dir_all(dir.join("nested.mp3")).unwrap();
        for f in ["horn.mp3", "bell.mp3", "notes.txt", ".mp3"] {
            fs::write(dir.join(f), b"").unwrap();
        }

        let names = scan_sounds(&dir, &AssetResolver::new("sounds", "mp3")).unwrap();
        assert_eq!(names, vec!["bell".to_string(), "horn".to_string()]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn scan_fails_for_missing_dir() {
        let missing = std::env::temp_dir().join("soundboard-no-such-dir");
        assert!(scan_sounds(&missing, &AssetResolver::default()).is_err());
    }
}
