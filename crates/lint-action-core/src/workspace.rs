//! Per-invocation working area.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Prefix of every working area directory name.
pub const WORKING_AREA_PREFIX: &str = "lint-action";

/// An exclusively owned scratch directory for one invocation.
///
/// The directory is removed by [`WorkingArea::destroy`], or on drop if the
/// invocation unwinds before reaching it.
#[derive(Debug)]
pub struct WorkingArea {
    dir: TempDir,
}

impl WorkingArea {
    /// Creates a fresh working area under `parent`, or under the system
    /// temporary directory when `parent` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create(parent: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKING_AREA_PREFIX);
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        debug!("Created working area {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Returns the working area root.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns `name` resolved inside the working area.
    #[must_use]
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Recursively deletes the working area.
    ///
    /// Failures are logged and swallowed so they never replace the
    /// invocation's own outcome.
    pub fn destroy(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!("Removed working area {}", path.display()),
            Err(e) => warn!("Failed to remove working area {}: {e}", path.display()),
        }
    }
}
