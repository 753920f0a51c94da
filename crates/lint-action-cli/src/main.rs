//! lint-action CLI tool.
//!
//! Usage:
//! ```bash
//! lint-action --label //app:lib --android-lint-cli-tool lint.jar \
//!     --xml-output lint_results.xml --html-output lint_results.html [OPTIONS]
//! lint-action @lint.params
//! lint-action --persistent_worker
//! ```

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod commands;
mod settings_resolver;

use args::ActionArgs;
use commands::worker::WORKER_FLAG;

#[tokio::main]
async fn main() -> Result<()> {
    let arguments: Vec<String> = std::env::args().skip(1).collect();

    if arguments.iter().any(|a| a == WORKER_FLAG) {
        init_tracing(false);
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        return commands::worker::serve(stdin, tokio::io::stdout()).await;
    }

    let expanded = args::expand_arg_files(&arguments)?;
    let args = ActionArgs::parse_from(std::iter::once("lint-action".to_string()).chain(expanded));
    init_tracing(args.verbose);

    let status = commands::run::run(args).await;
    std::process::exit(status);
}

/// Installs the stderr subscriber; stdout belongs to the worker protocol.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
