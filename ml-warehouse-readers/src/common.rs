//! File format detection and source discovery

use std::path::{Path, PathBuf};

use crate::error::Result;

/// File format detection utilities
pub struct FileFormat;

impl FileFormat {
    /// Check whether a path carries the given extension (case-insensitive)
    pub fn has_extension(path: &Path, extension: &str) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension))
    }
}

/// List the files in `folder` carrying `extension`, sorted by file name
///
/// Subdirectories and other files are skipped.
pub fn discover_sources(folder: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_file() && FileFormat::has_extension(&path, extension) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
