//! Baseline staging.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors staging the baseline.
#[derive(Debug, Error)]
pub enum BaselineError {
    /// The caller's baseline could not be copied.
    #[error("Failed to copy baseline {from} to {to}: {source}")]
    Copy {
        /// Caller-supplied baseline.
        from: PathBuf,
        /// Staged location.
        to: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

/// Returns the staged baseline location for `label` inside `working_dir`.
#[must_use]
pub fn baseline_path(working_dir: &Path, label: &str) -> PathBuf {
    working_dir.join(format!("{label}_lint_baseline"))
}

/// Stages the baseline for one invocation and returns its location.
///
/// The source is copied verbatim unless `regenerate` is set or no source was
/// given; in those cases nothing is written and the engine creates the file.
///
/// # Errors
///
/// Returns an error if the source baseline cannot be copied.
pub fn stage_baseline(
    working_dir: &Path,
    label: &str,
    source: Option<&Path>,
    regenerate: bool,
) -> Result<PathBuf, BaselineError> {
    let staged = baseline_path(working_dir, label);

    match source {
        Some(from) if !regenerate => {
            std::fs::copy(from, &staged).map_err(|e| BaselineError::Copy {
                from: from.to_path_buf(),
                to: staged.clone(),
                source: e,
            })?;
            debug!("Staged baseline {} -> {}", from.display(), staged.display());
        }
        Some(_) => debug!("Regenerating baseline, ignoring existing file"),
        None => debug!("No baseline supplied, engine will create one"),
    }

    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn copies_existing_baseline_verbatim() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("lib_lint_baseline.xml");
        std::fs::write(&source, "<issues format=\"6\">\n</issues>\n").unwrap();
        let work = TempDir::new().unwrap();

        let staged = stage_baseline(work.path(), "lib", Some(&source), false).unwrap();

        assert_eq!(staged, work.path().join("lib_lint_baseline"));
        assert_eq!(
            std::fs::read(&staged).unwrap(),
            std::fs::read(&source).unwrap()
        );
        // Source is copied, not moved
        assert!(source.exists());
    }

    #[test]
    fn regenerate_leaves_baseline_absent() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("baseline.xml");
        std::fs::write(&source, "old").unwrap();
        let work = TempDir::new().unwrap();

        let staged = stage_baseline(work.path(), "lib", Some(&source), true).unwrap();
        assert!(!staged.exists());
    }

    #[test]
    fn missing_source_leaves_baseline_absent() {
        let work = TempDir::new().unwrap();
        let staged = stage_baseline(work.path(), "lib", None, false).unwrap();
        assert!(!staged.exists());
    }

    #[test]
    fn unreadable_source_is_an_error() {
        let work = TempDir::new().unwrap();
        let err = stage_baseline(
            work.path(),
            "lib",
            Some(Path::new("/nonexistent/baseline.xml")),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, BaselineError::Copy { .. }));
    }
}
