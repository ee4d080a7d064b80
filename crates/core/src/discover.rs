//! Selection of the files a batch should convert.

use crate::error::{ConversionError, Result};
use crate::is_supported_extension;
use std::fs;
use std::path::{Path, PathBuf};

/// Which files a batch converts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSelection {
    /// Exactly one named file.
    Single(PathBuf),
    /// Every supported file directly inside a directory.
    Directory(PathBuf),
}

impl FileSelection {
    /// Resolve the selection to a list of source paths.
    ///
    /// A single file is returned as given; whether it exists is checked
    /// when it is converted.
    pub fn resolve(&self) -> Result<Vec<PathBuf>> {
        match self {
            FileSelection::Single(path) => Ok(vec![path.clone()]),
            FileSelection::Directory(dir) => find_heic_files(dir),
        }
    }
}

/// List the HEIC files directly inside `dir`, sorted by name.
///
/// Extensions are matched case-insensitively. Subdirectories are skipped,
/// not descended into.
pub fn find_heic_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let discovery_err = |source: std::io::Error| ConversionError::Discovery {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(discovery_err)? {
        let entry = entry.map_err(discovery_err)?;
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            continue;
        }

        let path = entry.path();
        if has_supported_extension(&path) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Match the suffix after the last `.` of the file name, the same suffix
/// [`derive_destination`](crate::derive_destination) replaces. A bare
/// `.heic` therefore counts as a HEIC file.
fn has_supported_extension(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.rfind('.').map(|idx| &name[idx + 1..]))
        .map(is_supported_extension)
        .unwrap_or(false)
}
