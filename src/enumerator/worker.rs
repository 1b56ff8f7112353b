//! Process-isolation boundary for enumeration
//!
//! The host spawns its own executable with a hidden subcommand; the child
//! reads one `EnumerateRequest` line from stdin, performs the enumeration
//! in-process, and writes one `WorkerReply` line to stdout. Communication
//! is message-passing only - a misbehaving target can take down its worker
//! but never the orchestrator or a sibling scan.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

use crate::errors::EnumerateError;

use super::{enumerate, EnumerateRequest, ScanSession, WorkerReply};

/// Hidden CLI subcommand that runs the worker loop
pub const WORKER_SUBCOMMAND: &str = "enum-worker";

/// Grace period added on top of the request timeout before the worker is
/// considered hung and killed
const WORKER_GRACE_SECS: u64 = 5;

/// Spawn a worker for `request` and wait for its reply.
pub async fn spawn_and_wait(request: &EnumerateRequest) -> Result<ScanSession, EnumerateError> {
    let exe = std::env::current_exe()
        .map_err(|e| EnumerateError::unreachable(format!("cannot locate own executable: {}", e)))?;

    let mut child = Command::new(exe)
        .arg(WORKER_SUBCOMMAND)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| EnumerateError::unreachable(format!("failed to spawn worker: {}", e)))?;

    let request_line = serde_json::to_string(request)
        .map_err(|e| EnumerateError::unreachable(format!("failed to encode request: {}", e)))?;

    {
        let stdin = child
            .stdin
            .as_mut()
            .ok_or_else(|| EnumerateError::unreachable("worker stdin unavailable"))?;
        stdin
            .write_all(request_line.as_bytes())
            .await
            .map_err(|e| EnumerateError::unreachable(format!("failed to write request: {}", e)))?;
        stdin
            .write_all(b"\n")
            .await
            .map_err(|e| EnumerateError::unreachable(format!("failed to write request: {}", e)))?;
    }
    drop(child.stdin.take());

    let deadline = Duration::from_secs(request.timeout_secs + WORKER_GRACE_SECS);

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| EnumerateError::unreachable("worker stdout unavailable"))?;
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();

    let read = tokio::time::timeout(deadline, reader.read_line(&mut line)).await;

    match read {
        Err(_) => {
            // Timed out. Kill the worker; partial data is discarded so a
            // half-enumerated session is never scored as complete.
            tracing::warn!(
                "enumeration worker for {} exceeded {}s, killing",
                request.target,
                deadline.as_secs()
            );
            let _ = child.kill().await;
            Err(EnumerateError::unreachable(format!(
                "enumeration timed out after {}s",
                request.timeout_secs
            )))
        }
        Ok(Err(e)) => {
            let _ = child.kill().await;
            Err(EnumerateError::unreachable(format!(
                "failed to read worker reply: {}",
                e
            )))
        }
        Ok(Ok(0)) => {
            let _ = child.wait().await;
            Err(EnumerateError::unreachable(
                "worker exited without producing a reply",
            ))
        }
        Ok(Ok(_)) => {
            let _ = child.wait().await;
            let reply: WorkerReply = serde_json::from_str(line.trim()).map_err(|e| {
                EnumerateError::unreachable(format!("malformed worker reply: {}", e))
            })?;
            reply.into_result()
        }
    }
}

/// Worker-side entry point: one request in, one reply out, exit.
pub async fn run_worker() -> std::io::Result<()> {
    let mut input = String::new();
    let mut reader = BufReader::new(tokio::io::stdin());
    reader.read_line(&mut input).await?;

    let reply = match serde_json::from_str::<EnumerateRequest>(input.trim()) {
        Ok(request) => WorkerReply::from_result(enumerate(&request).await),
        Err(e) => WorkerReply::Unreachable {
            message: format!("malformed enumeration request: {}", e),
        },
    };

    let mut stdout = tokio::io::stdout();
    let line = serde_json::to_string(&reply).unwrap_or_else(|e| {
        format!(
            r#"{{"outcome":"unreachable","message":"failed to encode reply: {}"}}"#,
            e
        )
    });
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}
