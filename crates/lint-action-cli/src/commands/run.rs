//! One-shot invocation.

use lint_action_core::{CommandEngineLoader, RequestRunner, FAILURE_STATUS};
use std::io::Write;

use crate::args::ActionArgs;
use crate::settings_resolver;

/// Runs one invocation and returns its status.
///
/// Engine output and failure reports go to `sink`.
pub async fn invoke(args: ActionArgs, sink: &mut (dyn Write + Send)) -> i32 {
    let source = settings_resolver::resolve(args.settings.as_deref());
    let settings = match source.load() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("{e:#}");
            if let Err(write_error) = writeln!(sink, "lint-action: {e:#}") {
                tracing::debug!("Dropped failure report: {write_error}");
            }
            return FAILURE_STATUS;
        }
    };

    let runner = RequestRunner::new(CommandEngineLoader::new(&settings.engine)).settings(settings);
    runner.run(&args.into_configuration(), sink).await
}

/// Runs one invocation with engine output on stderr.
pub async fn run(args: ActionArgs) -> i32 {
    let mut stderr = std::io::stderr();
    invoke(args, &mut stderr).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_tool_fails_with_report() {
        let tmp = TempDir::new().unwrap();
        let arguments: Vec<String> = [
            "--label",
            "lib",
            "--android-lint-cli-tool",
            "/nonexistent/lint-cli.jar",
            "--xml-output",
        ]
        .iter()
        .map(|s| (*s).to_string())
        .chain([
            tmp.path().join("out.xml").display().to_string(),
            "--html-output".to_string(),
            tmp.path().join("out.html").display().to_string(),
        ])
        .collect();
        let args = ActionArgs::from_arguments(&arguments).unwrap();

        let mut sink = Vec::new();
        let status = invoke(args, &mut sink).await;

        assert_eq!(status, FAILURE_STATUS);
        let report = String::from_utf8(sink).unwrap();
        assert!(report.contains("invoking lint failed"), "{report}");
        assert!(report.contains("/nonexistent/lint-cli.jar"), "{report}");
    }

    #[tokio::test]
    async fn unreadable_settings_fail_before_running() {
        let arguments: Vec<String> = [
            "--label",
            "lib",
            "--android-lint-cli-tool",
            "lint-cli.jar",
            "--xml-output",
            "out.xml",
            "--html-output",
            "out.html",
            "--settings",
            "/nonexistent/lint-action.toml",
        ]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
        let args = ActionArgs::from_arguments(&arguments).unwrap();

        let mut sink = Vec::new();
        assert_eq!(invoke(args, &mut sink).await, FAILURE_STATUS);
        assert!(String::from_utf8(sink)
            .unwrap()
            .contains("Failed to load settings"));
    }
}
