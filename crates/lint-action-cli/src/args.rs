//! Flag grammar of the lint action.

use anyhow::{Context, Result};
use clap::Parser;
use lint_action_core::{ActionConfiguration, LanguageLevels};
use std::path::PathBuf;

/// Program name used when parsing argument lists that carry none.
const PROGRAM: &str = "lint-action";

/// Runs Android Lint as a hermetic build action
#[derive(Debug, Parser)]
#[command(name = PROGRAM)]
#[command(author, version, about, long_about = None)]
pub struct ActionArgs {
    /// Target label; names the lint module
    #[arg(long)]
    pub label: String,

    /// Lint tool artifact (a runnable jar or executable)
    #[arg(long = "android-lint-cli-tool")]
    pub tool: PathBuf,

    /// Source file (repeatable)
    #[arg(long = "src")]
    pub sources: Vec<PathBuf>,

    /// Resource file (repeatable)
    #[arg(long = "resource")]
    pub resources: Vec<PathBuf>,

    /// Module manifest
    #[arg(long = "android-manifest")]
    pub manifest: Option<PathBuf>,

    /// Dependency, .aar or .jar (repeatable)
    #[arg(long)]
    pub classpath: Vec<PathBuf>,

    /// Custom rule jar (repeatable)
    #[arg(long = "custom-rule")]
    pub custom_rules: Vec<PathBuf>,

    /// Existing baseline file
    #[arg(long = "baseline-file")]
    pub baseline: Option<PathBuf>,

    /// Lint rule configuration file
    #[arg(long = "config-file")]
    pub config_file: Option<PathBuf>,

    /// Machine-readable result file
    #[arg(long)]
    pub xml_output: PathBuf,

    /// Human-readable report file
    #[arg(long)]
    pub html_output: PathBuf,

    /// Apply suggested fixes
    #[arg(long)]
    pub autofix: bool,

    /// Ignore the existing baseline and write a fresh one
    #[arg(long = "regenerate-baseline-files")]
    pub regenerate_baseline: bool,

    /// Treat warnings as errors
    #[arg(long)]
    pub warnings_as_errors: bool,

    /// Analyze dependencies too
    #[arg(long)]
    pub enable_check_dependencies: bool,

    /// Check to enable (repeatable)
    #[arg(long = "enable-check")]
    pub enabled_checks: Vec<String>,

    /// Check to disable (repeatable)
    #[arg(long = "disable-check")]
    pub disabled_checks: Vec<String>,

    /// Compile SDK version
    #[arg(long)]
    pub compile_sdk_version: Option<String>,

    /// Java language level
    #[arg(long)]
    pub java_language_level: Option<String>,

    /// Kotlin language level
    #[arg(long)]
    pub kotlin_language_level: Option<String>,

    /// Android SDK home, relative to the execution root
    #[arg(long = "android-home")]
    pub android_home: Option<PathBuf>,

    /// Path to the action settings file
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl ActionArgs {
    /// Parses `arguments` (without program name), expanding `@argfile`s.
    ///
    /// # Errors
    ///
    /// Returns an error if an argfile cannot be read or the flags are invalid.
    pub fn from_arguments(arguments: &[String]) -> Result<Self> {
        let expanded = expand_arg_files(arguments)?;
        let args = Self::try_parse_from(std::iter::once(PROGRAM.to_string()).chain(expanded))?;
        Ok(args)
    }

    /// Converts the parsed flags into the invocation's configuration.
    #[must_use]
    pub fn into_configuration(self) -> ActionConfiguration {
        ActionConfiguration {
            label: self.label,
            tool: self.tool,
            sources: self.sources,
            resources: self.resources,
            manifest: self.manifest,
            classpath: self.classpath,
            custom_rules: self.custom_rules,
            baseline: self.baseline,
            lint_config: self.config_file,
            autofix: self.autofix,
            regenerate_baseline: self.regenerate_baseline,
            warnings_as_errors: self.warnings_as_errors,
            enable_check_dependencies: self.enable_check_dependencies,
            enabled_checks: self.enabled_checks,
            disabled_checks: self.disabled_checks,
            xml_output: self.xml_output,
            html_output: self.html_output,
            sdk_home: self.android_home,
            language: LanguageLevels {
                compile_sdk_version: self.compile_sdk_version,
                java: self.java_language_level,
                kotlin: self.kotlin_language_level,
            },
        }
    }
}

/// Replaces every `@file` argument with the lines of `file`.
///
/// Each non-empty line becomes one argument. Expansion is not recursive.
///
/// # Errors
///
/// Returns an error if an argfile cannot be read.
pub fn expand_arg_files(arguments: &[String]) -> Result<Vec<String>> {
    let mut expanded = Vec::with_capacity(arguments.len());
    for arg in arguments {
        match arg.strip_prefix('@').filter(|path| !path.is_empty()) {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read argument file: {path}"))?;
                expanded.extend(
                    content
                        .lines()
                        .filter(|line| !line.is_empty())
                        .map(str::to_string),
                );
            }
            None => expanded.push(arg.clone()),
        }
    }
    Ok(expanded)
}
