//! Persistent worker loop.
//!
//! Requests arrive one JSON object per line on the reader and are answered
//! one JSON object per line on the writer, strictly in order:
//!
//! ```text
//! -> {"arguments": ["--label", "lib", ...], "requestId": 3}
//! <- {"exitCode": 0, "output": "...", "requestId": 3}
//! ```

use anyhow::{Context, Result};
use lint_action_core::FAILURE_STATUS;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::args::ActionArgs;
use crate::commands::run;

/// Flag that switches the binary into worker mode.
pub const WORKER_FLAG: &str = "--persistent_worker";

/// One unit of work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRequest {
    /// Action arguments, `@argfile`s allowed.
    #[serde(default)]
    pub arguments: Vec<String>,
    /// Request identifier echoed in the response.
    #[serde(default)]
    pub request_id: i64,
}

/// Answer to one [`WorkRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkResponse {
    /// Invocation status.
    pub exit_code: i32,
    /// Engine output and failure reports of this request only.
    pub output: String,
    /// Identifier of the request being answered.
    pub request_id: i64,
}

/// Serves requests until the reader is exhausted.
///
/// # Errors
///
/// Returns an error if the transport itself fails.
pub async fn serve<R, W>(reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    tracing::info!("Worker started");
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await.context("Failed to read work request")? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<WorkRequest>(&line) {
            Ok(request) => handle(request).await,
            Err(e) => {
                tracing::error!("Malformed work request: {e}");
                WorkResponse {
                    exit_code: FAILURE_STATUS,
                    output: format!("lint-action: malformed work request: {e}\n"),
                    request_id: 0,
                }
            }
        };

        let mut encoded =
            serde_json::to_string(&response).context("Failed to encode work response")?;
        encoded.push('\n');
        writer
            .write_all(encoded.as_bytes())
            .await
            .context("Failed to write work response")?;
        writer.flush().await.context("Failed to flush work response")?;
    }

    tracing::info!("Worker input closed, shutting down");
    Ok(())
}

/// Runs one request with its own output buffer.
async fn handle(request: WorkRequest) -> WorkResponse {
    let mut output = Vec::new();
    let exit_code = match ActionArgs::from_arguments(&request.arguments) {
        Ok(args) => run::invoke(args, &mut output).await,
        Err(e) => {
            tracing::error!("Invalid work request arguments: {e}");
            output.extend_from_slice(format!("lint-action: {e}\n").as_bytes());
            FAILURE_STATUS
        }
    };

    tracing::debug!(request_id = request.request_id, exit_code, "Work request done");
    WorkResponse {
        exit_code,
        output: String::from_utf8_lossy(&output).into_owned(),
        request_id: request.request_id,
    }
}
