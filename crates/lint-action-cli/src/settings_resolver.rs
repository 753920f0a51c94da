//! Settings file resolution.
//!
//! Resolves the action settings using a deterministic priority order:
//!
//! 1. `--settings` flag (explicit path)
//! 2. `$LINT_ACTION_SETTINGS`
//! 3. No settings file → defaults

use anyhow::{Context, Result};
use lint_action_core::ActionSettings;
use std::path::{Path, PathBuf};

/// Environment variable naming the settings file.
pub const SETTINGS_ENV: &str = "LINT_ACTION_SETTINGS";

/// Where the settings were found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsSource {
    /// Explicitly specified via `--settings` flag.
    Explicit(PathBuf),
    /// Named by `$LINT_ACTION_SETTINGS`.
    Environment(PathBuf),
    /// No settings file; defaults will be used.
    Default,
}

impl SettingsSource {
    /// Returns the resolved path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Environment(p) => Some(p),
            Self::Default => None,
        }
    }

    /// Loads the settings from this source.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(&self) -> Result<ActionSettings> {
        match self.path() {
            Some(path) => {
                tracing::debug!("Loading settings from {}", path.display());
                ActionSettings::from_file(path)
                    .with_context(|| format!("Failed to load settings: {}", path.display()))
            }
            None => Ok(ActionSettings::default()),
        }
    }
}

/// Resolves the settings file path.
///
/// See module-level docs for resolution order.
#[must_use]
pub fn resolve(explicit: Option<&Path>) -> SettingsSource {
    resolve_inner(explicit, std::env::var_os(SETTINGS_ENV).map(PathBuf::from))
}

/// Testable core: accepts the environment value as parameter to avoid env var races.
fn resolve_inner(explicit: Option<&Path>, from_env: Option<PathBuf>) -> SettingsSource {
    if let Some(path) = explicit {
        return SettingsSource::Explicit(path.to_path_buf());
    }

    match from_env {
        Some(path) if !path.as_os_str().is_empty() => SettingsSource::Environment(path),
        _ => SettingsSource::Default,
    }
}
