//! Ambient settings for the lint action.
//!
//! These are knobs of the action itself (pool sizing, launcher, scratch
//! location), not of a single invocation. Per-invocation inputs live in
//! [`ActionConfiguration`](crate::ActionConfiguration).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level settings for the lint action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSettings {
    /// Archive extraction settings.
    #[serde(default)]
    pub unpack: UnpackSettings,

    /// External engine settings.
    #[serde(default)]
    pub engine: EngineSettings,

    /// Working area settings.
    #[serde(default)]
    pub workspace: WorkspaceSettings,
}

impl ActionSettings {
    /// Creates the default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses settings from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, SettingsError> {
        toml::from_str(content).map_err(|e| SettingsError::Parse {
            message: e.to_string(),
        })
    }
}

/// Archive extraction pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnpackSettings {
    /// Maximum number of archives extracted concurrently.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Upper bound on the wait for all extractions, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl UnpackSettings {
    /// Returns the bounded wait as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for UnpackSettings {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_pool_size() -> usize {
    6
}

fn default_timeout_secs() -> u64 {
    15
}

/// External engine launch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Launcher used for `.jar` tool artifacts.
    #[serde(default = "default_java")]
    pub java: PathBuf,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            java: default_java(),
        }
    }
}

fn default_java() -> PathBuf {
    PathBuf::from("java")
}

/// Working area settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    /// Parent directory for per-invocation working areas.
    /// Uses the system temporary directory when unset.
    #[serde(default)]
    pub temp_root: Option<PathBuf>,
}

/// Settings errors.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// IO error reading the settings file.
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in the settings file.
    #[error("Failed to parse settings: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },
}
