//! Classpath partitioning into archives and libraries.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extension of archive-packages that must be extracted before analysis.
pub const ARCHIVE_EXTENSION: &str = "aar";
/// Extension of plain libraries consumed directly.
pub const LIBRARY_EXTENSION: &str = "jar";

/// Errors partitioning the classpath.
#[derive(Debug, Error)]
pub enum ClasspathError {
    /// Entries that are neither archives nor libraries.
    #[error(
        "Classpath size mismatch: {} of {total} entries are neither .aar nor .jar: {}",
        .unsupported.len(),
        display_paths(.unsupported)
    )]
    Unsupported {
        /// Number of classpath entries given.
        total: usize,
        /// Offending entries.
        unsupported: Vec<PathBuf>,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A classpath split by dependency kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classpath {
    /// Archive-packages (`.aar`).
    pub archives: Vec<PathBuf>,
    /// Plain libraries (`.jar`).
    pub libraries: Vec<PathBuf>,
}

/// Splits `entries` into archives and libraries.
///
/// # Errors
///
/// Returns [`ClasspathError::Unsupported`] if any entry has another extension.
pub fn partition(entries: &[PathBuf]) -> Result<Classpath, ClasspathError> {
    let mut classpath = Classpath::default();
    let mut unsupported = Vec::new();

    for entry in entries {
        match extension(entry) {
            Some(ARCHIVE_EXTENSION) => classpath.archives.push(entry.clone()),
            Some(LIBRARY_EXTENSION) => classpath.libraries.push(entry.clone()),
            _ => unsupported.push(entry.clone()),
        }
    }

    if classpath.archives.len() + classpath.libraries.len() != entries.len() {
        return Err(ClasspathError::Unsupported {
            total: entries.len(),
            unsupported,
        });
    }

    Ok(classpath)
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}
