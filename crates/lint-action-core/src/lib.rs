//! # lint-action-core
//!
//! Core pipeline for running Android Lint as a hermetic build action.
//!
//! One invocation takes an [`ActionConfiguration`] and, inside a private
//! [`WorkingArea`]:
//!
//! - stages the baseline ([`stage_baseline`])
//! - splits the classpath into archives and libraries ([`partition`])
//! - extracts archive-packages concurrently ([`ArchiveUnpacker`])
//! - writes the project descriptor ([`ProjectDescriptor`])
//! - runs the engine ([`LintEngine`], [`invoke`])
//! - strips machine-specific paths from the results ([`OutputSanitizer`])
//!
//! [`RequestRunner`] drives these stages and maps the result to a status.
//!
//! ## Example
//!
//! ```ignore
//! use lint_action_core::{ActionSettings, CommandEngineLoader, RequestRunner};
//!
//! let settings = ActionSettings::from_file("lint-action.toml".as_ref())?;
//! let runner = RequestRunner::new(CommandEngineLoader::new(&settings.engine))
//!     .settings(settings);
//!
//! let status = runner.run(&config, &mut std::io::stderr()).await;
//! std::process::exit(status);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod baseline;
mod classpath;
mod config;
mod descriptor;
mod engine;
mod invocation;
mod runner;
mod sanitize;
mod types;
mod unpack;
mod workspace;

pub use baseline::{baseline_path, stage_baseline, BaselineError};
pub use classpath::{partition, Classpath, ClasspathError, ARCHIVE_EXTENSION, LIBRARY_EXTENSION};
pub use config::{ActionSettings, EngineSettings, SettingsError, UnpackSettings, WorkspaceSettings};
pub use descriptor::{descriptor_path, DescriptorError, ProjectDescriptor};
pub use engine::{
    CommandEngine, CommandEngineLoader, EngineEnvironment, EngineError, EngineLoader, LintEngine,
    ToolExit, CHECK_DEPENDENCIES_ENV, USER_HOME_ENV,
};
pub use invocation::{build_arguments, exec_root, invoke, resolve_sdk_home};
pub use runner::{
    ActionError, RequestRunner, RunFailure, Stage, ARCHIVES_DIR, CACHE_DIR, FAILURE_STATUS,
};
pub use sanitize::{OutputSanitizer, SanitizeError};
pub use types::{
    ActionConfiguration, LanguageLevels, Outcome, EXIT_CREATED_BASELINE, EXIT_FINDINGS,
    EXIT_SUCCESS,
};
pub use unpack::{
    discover_rule_bundles, extraction_dir, ArchiveUnpacker, UnpackError, UnpackedArchive,
    EXTRACTION_MARKER, RULE_BUNDLE_NAME,
};
pub use workspace::{WorkingArea, WORKING_AREA_PREFIX};
