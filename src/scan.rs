//! Filesystem discovery of supported audio files.

use std::path::{Path, PathBuf};

use crate::error::TagError;
use crate::tags::SUPPORTED_EXTENSIONS;

/// Source of candidate file paths for a scan. The directory walker is the
/// production implementation; tests substitute fixed lists.
pub trait FileLister {
    fn list(&self, root: &Path, recursive: bool) -> Result<Vec<PathBuf>, TagError>;
}

/// Walks a directory tree and returns every file whose extension matches a
/// supported container, lower-cased comparison, in sorted order.
pub struct DirLister;

impl FileLister for DirLister {
    fn list(&self, root: &Path, recursive: bool) -> Result<Vec<PathBuf>, TagError> {
        if !root.is_dir() {
            return Err(TagError::Io(format!(
                "not a directory: {}",
                root.display()
            )));
        }

        let mut files = Vec::new();
        let mut dirs = vec![root.to_path_buf()];

        while let Some(dir) = dirs.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                let file_type = entry.file_type()?;

                if file_type.is_dir() {
                    if recursive {
                        dirs.push(path);
                    }
                    continue;
                }
                if !file_type.is_file() {
                    continue;
                }

                let supported = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()));
                if supported {
                    files.push(path);
                }
            }
        }

        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn lists_only_supported_extensions() {
        let dir = tempfile::tempdir().unwrap();
        testutil::write_minimal_flac(dir.path(), "a.flac");
        std::fs::write(dir.path().join("b.mp3"), b"").unwrap();
        std::fs::write(dir.path().join("c.ogg"), b"").unwrap();
        std::fs::write(dir.path().join("cover.jpg"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let files = DirLister.list(dir.path(), false).unwrap();
        assert_eq!(names(&files), vec!["a.flac", "b.mp3", "c.ogg"]);
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("LOUD.FLAC"), b"").unwrap();

        let files = DirLister.list(dir.path(), false).unwrap();
        assert_eq!(names(&files), vec!["LOUD.FLAC"]);
    }

    #[test]
    fn non_recursive_skips_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir_all(&sub).unwrap();
        testutil::write_minimal_flac(dir.path(), "top.flac");
        testutil::write_minimal_flac(&sub, "nested.flac");

        let files = DirLister.list(dir.path(), false).unwrap();
        assert_eq!(names(&files), vec!["top.flac"]);
    }

    #[test]
    fn recursive_descends_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("a_sub");
        std::fs::create_dir_all(&sub).unwrap();
        testutil::write_minimal_flac(&sub, "nested.flac");
        testutil::write_minimal_flac(dir.path(), "top.flac");

        let files = DirLister.list(dir.path(), true).unwrap();
        assert_eq!(files.len(), 2);
        let mut sorted = files.clone();
        sorted.sort();
        assert_eq!(files, sorted);
    }

    #[test]
    fn missing_root_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DirLister.list(&dir.path().join("nope"), false).unwrap_err();
        assert!(matches!(err, TagError::Io(_)));
    }

    #[test]
    fn empty_directory_yields_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DirLister.list(dir.path(), true).unwrap().is_empty());
    }
}
