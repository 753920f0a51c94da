//! Core types for one lint action invocation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Engine exit code for a clean run.
pub const EXIT_SUCCESS: i32 = 0;
/// Engine exit code when findings were reported.
pub const EXIT_FINDINGS: i32 = 1;
/// Engine exit code when a new baseline file was written.
pub const EXIT_CREATED_BASELINE: i32 = 6;

/// Language settings forwarded to the project descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageLevels {
    /// Compile SDK version (e.g., `"34"`).
    pub compile_sdk_version: Option<String>,
    /// Java language level (e.g., `"17"`).
    pub java: Option<String>,
    /// Kotlin language level (e.g., `"1.9"`).
    pub kotlin: Option<String>,
}

/// Immutable inputs of a single invocation.
///
/// Built once from parsed flags and only ever borrowed afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionConfiguration {
    /// Target label; names the module and the files staged for it.
    pub label: String,
    /// Tool artifact the engine is loaded from.
    pub tool: PathBuf,
    /// Source files, in caller order.
    pub sources: Vec<PathBuf>,
    /// Resource files.
    pub resources: Vec<PathBuf>,
    /// Module manifest.
    pub manifest: Option<PathBuf>,
    /// Dependencies, archives and libraries mixed.
    pub classpath: Vec<PathBuf>,
    /// Custom rule jars supplied by the caller.
    pub custom_rules: Vec<PathBuf>,
    /// Existing baseline to stage.
    pub baseline: Option<PathBuf>,
    /// Engine rule configuration file.
    pub lint_config: Option<PathBuf>,
    /// Apply suggested fixes.
    pub autofix: bool,
    /// Ignore the existing baseline and let the engine write a fresh one.
    pub regenerate_baseline: bool,
    /// Treat warnings as errors.
    pub warnings_as_errors: bool,
    /// Let the engine analyze dependencies too.
    pub enable_check_dependencies: bool,
    /// Check names to enable.
    pub enabled_checks: Vec<String>,
    /// Check names to disable.
    pub disabled_checks: Vec<String>,
    /// Machine-readable result file.
    pub xml_output: PathBuf,
    /// Human-readable report file.
    pub html_output: PathBuf,
    /// SDK home, relative to the execution root unless absolute.
    pub sdk_home: Option<PathBuf>,
    /// Language settings.
    pub language: LanguageLevels,
}

/// Simplified result of an engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// No findings.
    Clean,
    /// A fresh baseline was written.
    BaselineCreated,
    /// Findings were reported (engine exit code).
    Findings(i32),
    /// The engine failed (engine exit code).
    ToolError(i32),
}

impl Outcome {
    /// Classifies a raw engine exit code.
    #[must_use]
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            EXIT_SUCCESS => Self::Clean,
            EXIT_CREATED_BASELINE => Self::BaselineCreated,
            EXIT_FINDINGS => Self::Findings(code),
            other => Self::ToolError(other),
        }
    }

    /// Returns the invocation status for this outcome.
    ///
    /// Success outcomes map to `0`; everything else keeps the engine's code.
    #[must_use]
    pub fn status(self) -> i32 {
        match self {
            Self::Clean | Self::BaselineCreated => 0,
            Self::Findings(code) | Self::ToolError(code) => code,
        }
    }

    /// Returns true if this outcome maps to a zero status.
    #[must_use]
    pub fn is_success(self) -> bool {
        self.status() == 0
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::BaselineCreated => write!(f, "baseline created"),
            Self::Findings(code) => write!(f, "findings (exit {code})"),
            Self::ToolError(code) => write!(f, "tool error (exit {code})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_codes_map_to_zero() {
        assert_eq!(Outcome::from_exit_code(EXIT_SUCCESS).status(), 0);
        assert_eq!(Outcome::from_exit_code(EXIT_CREATED_BASELINE).status(), 0);
        assert_eq!(
            Outcome::from_exit_code(EXIT_CREATED_BASELINE),
            Outcome::BaselineCreated
        );
    }

    #[test]
    fn other_codes_pass_through() {
        for code in [1, 2, 3, 5, 7, 100, -1, 255] {
            assert_eq!(Outcome::from_exit_code(code).status(), code);
            assert!(!Outcome::from_exit_code(code).is_success());
        }
    }

    #[test]
    fn findings_are_distinguished_from_tool_errors() {
        assert_eq!(Outcome::from_exit_code(1), Outcome::Findings(1));
        assert_eq!(Outcome::from_exit_code(2), Outcome::ToolError(2));
    }
}
