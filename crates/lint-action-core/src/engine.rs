//! External lint engine abstraction.
//!
//! The engine is a black box: arguments in, integer status and files out.
//! [`EngineLoader`] turns the tool artifact named by the configuration into a
//! [`LintEngine`]; [`CommandEngineLoader`] runs the artifact as a child process.

use crate::config::EngineSettings;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tracing::debug;

/// Environment variable carrying the check-dependencies toggle to the tool.
pub const CHECK_DEPENDENCIES_ENV: &str = "LINT_CHECK_DEPENDENCIES";

/// Environment variable pointing the tool at its per-invocation cache.
pub const USER_HOME_ENV: &str = "ANDROID_USER_HOME";

/// Errors loading or running the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The tool artifact does not exist.
    #[error("Lint tool not found: {0}")]
    MissingTool(PathBuf),

    /// The tool could not be started or awaited.
    #[error("Failed to run lint tool {program}: {source}")]
    Spawn {
        /// Program that was launched.
        program: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The tool ended without an exit code (e.g., killed by a signal).
    #[error("Lint tool {0} terminated without an exit code")]
    Terminated(PathBuf),
}

/// Out-of-band context handed to the engine for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEnvironment {
    /// Per-invocation cache directory inside the working area.
    pub cache_dir: PathBuf,
}

/// Raw result of one engine run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolExit {
    /// Raw exit code.
    pub code: i32,
    /// Console output the engine produced during this run.
    pub output: Vec<u8>,
}

/// An invocable lint engine.
pub trait LintEngine: Send + Sync {
    /// Configures whether dependencies are analyzed too.
    fn set_check_dependencies(&mut self, enabled: bool);

    /// Runs the engine with `args` and returns its exit code and output.
    fn invoke(
        &self,
        args: &[String],
        env: &EngineEnvironment,
    ) -> impl Future<Output = Result<ToolExit, EngineError>> + Send;
}

/// Creates engines from tool artifacts.
pub trait EngineLoader: Send + Sync {
    /// Engine type produced by this loader.
    type Engine: LintEngine;

    /// Loads a fresh engine from `tool`.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact cannot be used.
    fn load(&self, tool: &Path) -> Result<Self::Engine, EngineError>;
}

/// Loads tool artifacts as child processes.
#[derive(Debug, Clone)]
pub struct CommandEngineLoader {
    java: PathBuf,
}

impl CommandEngineLoader {
    /// Creates a loader from engine settings.
    #[must_use]
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            java: settings.java.clone(),
        }
    }
}

impl Default for CommandEngineLoader {
    fn default() -> Self {
        Self::new(&EngineSettings::default())
    }
}

impl EngineLoader for CommandEngineLoader {
    type Engine = CommandEngine;

    fn load(&self, tool: &Path) -> Result<CommandEngine, EngineError> {
        if !tool.exists() {
            return Err(EngineError::MissingTool(tool.to_path_buf()));
        }

        let engine = if tool.extension().is_some_and(|e| e == "jar") {
            CommandEngine {
                program: self.java.clone(),
                prefix: vec!["-jar".to_string(), tool.to_string_lossy().into_owned()],
                check_dependencies: false,
            }
        } else {
            CommandEngine {
                program: tool.to_path_buf(),
                prefix: Vec::new(),
                check_dependencies: false,
            }
        };
        Ok(engine)
    }
}

/// Runs the lint tool as a child process with captured output.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: PathBuf,
    prefix: Vec<String>,
    check_dependencies: bool,
}

impl CommandEngine {
    /// Returns the full command line for `args`.
    #[must_use]
    pub fn command_line(&self, args: &[String]) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.prefix.iter().cloned())
            .chain(args.iter().cloned())
            .collect()
    }
}

impl LintEngine for CommandEngine {
    fn set_check_dependencies(&mut self, enabled: bool) {
        self.check_dependencies = enabled;
    }

    async fn invoke(
        &self,
        args: &[String],
        env: &EngineEnvironment,
    ) -> Result<ToolExit, EngineError> {
        debug!("Running {}", self.command_line(args).join(" "));

        let output = tokio::process::Command::new(&self.program)
            .args(&self.prefix)
            .args(args)
            .env(CHECK_DEPENDENCIES_ENV, self.check_dependencies.to_string())
            .env(USER_HOME_ENV, &env.cache_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| EngineError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        let code = output
            .status
            .code()
            .ok_or_else(|| EngineError::Terminated(self.program.clone()))?;

        let mut captured = output.stdout;
        captured.extend_from_slice(&output.stderr);
        Ok(ToolExit {
            code,
            output: captured,
        })
    }
}
