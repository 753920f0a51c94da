//! Per-invocation orchestration.
//!
//! One invocation walks a fixed sequence of stages inside its own working
//! area:
//!
//! ```text
//! StagingBaseline -> PartitioningClasspath -> Unpacking -> BuildingDescriptor
//!     -> Invoking -> Sanitizing -> Done
//! ```
//!
//! The first failing stage ends the invocation. Whatever the result, the
//! working area is removed before [`RequestRunner::run`] returns.

use crate::baseline::{stage_baseline, BaselineError};
use crate::classpath::{self, ClasspathError};
use crate::config::ActionSettings;
use crate::descriptor::{descriptor_path, DescriptorError, ProjectDescriptor};
use crate::engine::{EngineEnvironment, EngineError, EngineLoader};
use crate::invocation::{self, build_arguments};
use crate::sanitize::{OutputSanitizer, SanitizeError};
use crate::types::{ActionConfiguration, Outcome};
use crate::unpack::{discover_rule_bundles, ArchiveUnpacker, UnpackError};
use crate::workspace::WorkingArea;

use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Status returned when the action itself fails.
pub const FAILURE_STATUS: i32 = 1;

/// Directory inside the working area that receives extracted archives.
pub const ARCHIVES_DIR: &str = "aars";

/// Directory inside the working area used as the engine's private cache.
pub const CACHE_DIR: &str = "android-cache";

/// Pipeline stage of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Copying or skipping the baseline.
    StagingBaseline,
    /// Splitting the classpath.
    PartitioningClasspath,
    /// Extracting archive-packages.
    Unpacking,
    /// Writing the project descriptor.
    BuildingDescriptor,
    /// Running the engine.
    Invoking,
    /// Rewriting the result file.
    Sanitizing,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::StagingBaseline => "staging baseline",
            Self::PartitioningClasspath => "partitioning classpath",
            Self::Unpacking => "unpacking archives",
            Self::BuildingDescriptor => "building project descriptor",
            Self::Invoking => "invoking lint",
            Self::Sanitizing => "sanitizing results",
        };
        f.write_str(name)
    }
}

/// Errors raised by pipeline stages.
#[derive(Debug, Error, Diagnostic)]
pub enum ActionError {
    /// Baseline staging failed.
    #[error(transparent)]
    #[diagnostic(code(lint_action::baseline))]
    Baseline(#[from] BaselineError),

    /// The classpath contains unsupported entries.
    #[error(transparent)]
    #[diagnostic(
        code(lint_action::classpath),
        help("only .aar archives and .jar libraries can be passed with --classpath")
    )]
    Classpath(#[from] ClasspathError),

    /// Archive extraction failed.
    #[error(transparent)]
    #[diagnostic(code(lint_action::unpack))]
    Unpack(#[from] UnpackError),

    /// The project descriptor could not be produced.
    #[error(transparent)]
    #[diagnostic(code(lint_action::descriptor))]
    Descriptor(#[from] DescriptorError),

    /// The engine could not be loaded or run.
    #[error(transparent)]
    #[diagnostic(code(lint_action::engine))]
    Engine(#[from] EngineError),

    /// The result file could not be sanitized.
    #[error(transparent)]
    #[diagnostic(code(lint_action::sanitize))]
    Sanitize(#[from] SanitizeError),

    /// A working area entry could not be prepared.
    #[error("Failed to prepare {path}: {source}")]
    #[diagnostic(code(lint_action::io))]
    Io {
        /// Path being prepared.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

/// A failed invocation and the stage it failed in.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct RunFailure {
    /// Stage that failed.
    pub stage: Stage,
    /// Cause.
    #[source]
    pub source: ActionError,
}

fn fail<E: Into<ActionError>>(stage: Stage) -> impl FnOnce(E) -> RunFailure {
    move |e| RunFailure {
        stage,
        source: e.into(),
    }
}

/// Runs lint action invocations, each in its own working area.
///
/// Cheap to share: it holds no per-invocation state, so one runner can serve
/// every request of a long-lived worker.
#[derive(Debug, Clone)]
pub struct RequestRunner<L> {
    loader: L,
    settings: ActionSettings,
    exec_root: Option<PathBuf>,
}

impl<L: EngineLoader> RequestRunner<L> {
    /// Creates a runner with default settings.
    #[must_use]
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            settings: ActionSettings::default(),
            exec_root: None,
        }
    }

    /// Sets the ambient settings.
    #[must_use]
    pub fn settings(mut self, settings: ActionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Pins the execution root instead of reading it from the environment.
    #[must_use]
    pub fn exec_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.exec_root = Some(path.into());
        self
    }

    /// Runs one invocation in a fresh working area and returns its status.
    ///
    /// Engine output and failure reports are written to `sink`.
    pub async fn run(&self, config: &ActionConfiguration, sink: &mut (dyn Write + Send)) -> i32 {
        let span = info_span!("invocation", label = %config.label);
        async {
            let area = match WorkingArea::create(self.settings.workspace.temp_root.as_deref()) {
                Ok(area) => area,
                Err(e) => {
                    error!("Failed to create working area: {e}");
                    report(sink, &format!("failed to create working area: {e}"));
                    return FAILURE_STATUS;
                }
            };

            let status = match self.execute(config, area.path(), sink).await {
                Ok(outcome) => {
                    info!("Invocation finished: {outcome}");
                    outcome.status()
                }
                Err(failure) => {
                    error!(stage = %failure.stage, "{}", failure.source);
                    report(sink, &render(&failure));
                    FAILURE_STATUS
                }
            };

            area.destroy();
            status
        }
        .instrument(span)
        .await
    }

    /// Runs every stage inside `working_dir`, which must be fresh and owned
    /// by this invocation.
    ///
    /// # Errors
    ///
    /// Returns the first failing stage and its cause.
    pub async fn execute(
        &self,
        config: &ActionConfiguration,
        working_dir: &Path,
        sink: &mut (dyn Write + Send),
    ) -> Result<Outcome, RunFailure> {
        let exec_root = self
            .exec_root
            .clone()
            .unwrap_or_else(invocation::exec_root);

        enter(Stage::StagingBaseline);
        let baseline = stage_baseline(
            working_dir,
            &config.label,
            config.baseline.as_deref(),
            config.regenerate_baseline,
        )
        .map_err(fail(Stage::StagingBaseline))?;

        enter(Stage::PartitioningClasspath);
        let classpath =
            classpath::partition(&config.classpath).map_err(fail(Stage::PartitioningClasspath))?;

        enter(Stage::Unpacking);
        let unpacked = ArchiveUnpacker::new(&self.settings.unpack)
            .unpack(&classpath.archives, &working_dir.join(ARCHIVES_DIR))
            .await
            .map_err(fail(Stage::Unpacking))?;
        let discovered = discover_rule_bundles(&unpacked);
        if !discovered.is_empty() {
            info!("Discovered {} rule bundle(s) in archives", discovered.len());
        }

        enter(Stage::BuildingDescriptor);
        let project_file = descriptor_path(working_dir, &config.label);
        ProjectDescriptor::builder(config.label.as_str())
            .sources(&config.sources)
            .resources(&config.resources)
            .manifest(config.manifest.as_deref())
            .libraries(&classpath.libraries)
            .extracted_archives(&unpacked)
            .custom_rules(config.custom_rules.iter().chain(&discovered))
            .baseline(Some(baseline.as_path()))
            .language(&config.language)
            .write_to(&project_file)
            .map_err(fail(Stage::BuildingDescriptor))?;

        enter(Stage::Invoking);
        let cache_dir = working_dir.join(CACHE_DIR);
        std::fs::create_dir(&cache_dir)
            .map_err(|e| ActionError::Io {
                path: cache_dir.clone(),
                source: e,
            })
            .map_err(fail(Stage::Invoking))?;
        let mut engine = self
            .loader
            .load(&config.tool)
            .map_err(fail(Stage::Invoking))?;
        let args = build_arguments(config, &project_file, &exec_root);
        let env = EngineEnvironment { cache_dir };
        let outcome = invocation::invoke(&mut engine, config, &args, &env, sink)
            .await
            .map_err(fail(Stage::Invoking))?;

        enter(Stage::Sanitizing);
        if matches!(outcome, Outcome::ToolError(_)) && !config.xml_output.exists() {
            warn!(
                "Lint wrote no result file at {}; skipping sanitizing",
                config.xml_output.display()
            );
        } else {
            let mut sanitizer = OutputSanitizer::new().root(&exec_root).root(working_dir);
            if let Ok(canonical) = std::fs::canonicalize(working_dir) {
                sanitizer = sanitizer.root(&canonical);
            }
            sanitizer
                .sanitize_file(&config.xml_output)
                .map_err(fail(Stage::Sanitizing))?;
        }

        Ok(outcome)
    }
}

fn enter(stage: Stage) {
    info!("Stage: {stage}");
}

/// Renders `failure` with its diagnostic code and help, falling back to the
/// plain message.
fn render(failure: &RunFailure) -> String {
    let handler = GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor())
        .with_break_words(false);
    let mut rendered = String::new();
    match handler.render_report(&mut rendered, &failure.source) {
        Ok(()) => format!("{} failed\n{}", failure.stage, rendered.trim_end()),
        Err(_) => failure.to_string(),
    }
}

fn report(sink: &mut (dyn Write + Send), message: &str) {
    if let Err(e) = writeln!(sink, "lint-action: {message}") {
        debug!("Dropped failure report: {e}");
    }
}
