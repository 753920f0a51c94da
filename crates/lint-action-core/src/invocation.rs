//! Translation of an [`ActionConfiguration`] into an engine run.

use crate::engine::{EngineEnvironment, EngineError, LintEngine};
use crate::types::{ActionConfiguration, Outcome};

use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Resolves the SDK home against the execution root.
#[must_use]
pub fn resolve_sdk_home(sdk_home: &Path, exec_root: &Path) -> PathBuf {
    exec_root.join(sdk_home)
}

/// Returns the execution root for this process.
///
/// Prefers `$PWD`, which preserves the build's logical path, and falls back
/// to the process working directory.
#[must_use]
pub fn exec_root() -> PathBuf {
    std::env::var_os("PWD")
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("/"))
}

/// Builds the engine argument vector.
#[must_use]
pub fn build_arguments(
    config: &ActionConfiguration,
    project_file: &Path,
    exec_root: &Path,
) -> Vec<String> {
    let mut args = vec![
        "--project".to_string(),
        path_arg(project_file),
        "--xml".to_string(),
        path_arg(&config.xml_output),
        "--html".to_string(),
        path_arg(&config.html_output),
        "--exitcode".to_string(),
        "--fullpath".to_string(),
    ];

    if config.warnings_as_errors {
        args.push("-Werror".to_string());
    } else {
        args.push("--nowarn".to_string());
    }

    if let Some(lint_config) = &config.lint_config {
        args.push("--config".to_string());
        args.push(path_arg(lint_config));
    }

    if !config.enabled_checks.is_empty() {
        args.push("--enable".to_string());
        args.push(config.enabled_checks.join(","));
    }

    if !config.disabled_checks.is_empty() {
        args.push("--disable".to_string());
        args.push(config.disabled_checks.join(","));
    }

    if let Some(sdk_home) = config.sdk_home.as_deref().filter(|p| !p.as_os_str().is_empty()) {
        args.push("--sdk-home".to_string());
        args.push(path_arg(&resolve_sdk_home(sdk_home, exec_root)));
    }

    args
}

/// Configures `engine`, runs it, forwards its output to `sink` and
/// classifies the exit code.
///
/// # Errors
///
/// Returns an error if the engine could not be run at all.
pub async fn invoke<E: LintEngine>(
    engine: &mut E,
    config: &ActionConfiguration,
    args: &[String],
    env: &EngineEnvironment,
    sink: &mut (dyn Write + Send),
) -> Result<Outcome, EngineError> {
    engine.set_check_dependencies(config.enable_check_dependencies);
    if config.autofix {
        debug!("Autofix requested; the engine flag grammar has no autofix flag");
    }

    let exit = engine.invoke(args, env).await?;

    if !exit.output.is_empty() {
        // The sink is diagnostic only; a closed sink must not fail the run
        if let Err(e) = sink.write_all(&exit.output).and_then(|()| sink.flush()) {
            debug!("Dropped engine output: {e}");
        }
    }

    let outcome = Outcome::from_exit_code(exit.code);
    info!("Lint engine finished: {outcome}");
    Ok(outcome)
}
