//! Async command execution with timeout support
//!
//! Backs the bootstrap operations that need a wall-clock limit (repository
//! clones) or captured output (package manager queries, `git rev-parse`).
//! The child is killed when the limit expires.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::time::timeout;

use crate::error::BuildError;

use super::traits::CommandSpec;

/// How a [`CommandSpec`] is waited on
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Wall-clock limit (None = wait forever)
    pub timeout: Option<Duration>,
    /// Pipe stdout/stderr back instead of sharing our terminal
    pub capture_output: bool,
}

/// Outcome of a finished command
#[derive(Debug)]
pub struct ExecResult {
    /// Exit code was 0
    pub success: bool,
    /// Exit code, None when killed by a signal
    pub exit_code: Option<i32>,
    /// Captured stdout (empty when not captured)
    pub stdout: String,
    /// Captured stderr (empty when not captured)
    pub stderr: String,
}

/// Run `spec` to completion
///
/// # Errors
/// * `BuildError::SpawnFailed` - the program could not be started
/// * `BuildError::Timeout` - the limit expired; the child was killed
pub async fn exec_command(
    spec: &CommandSpec,
    options: &ExecOptions,
) -> Result<ExecResult, BuildError> {
    let command_str = spec.display();

    let mut cmd = Command::from(spec.to_command());
    let stdio = || {
        if options.capture_output {
            Stdio::piped()
        } else {
            Stdio::inherit()
        }
    };
    cmd.stdout(stdio()).stderr(stdio()).kill_on_drop(true);

    tracing::debug!("Executing async: {}", command_str);

    let child = cmd.spawn().map_err(|e| BuildError::SpawnFailed {
        command: command_str.clone(),
        error: e.to_string(),
    })?;

    match options.timeout {
        Some(limit) => match timeout(limit, collect(child)).await {
            Ok(result) => result,
            Err(_) => {
                // The dropped future drops the child, which kills it
                tracing::warn!("Timeout on {}", command_str);
                Err(BuildError::Timeout {
                    command: command_str,
                    timeout_secs: limit.as_secs(),
                })
            }
        },
        None => collect(child).await,
    }
}

/// Wait for `child`, draining whichever streams were piped
async fn collect(mut child: Child) -> Result<ExecResult, BuildError> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (stdout, stderr, status) = tokio::join!(drain(stdout), drain(stderr), child.wait());
    let status = status?;

    Ok(ExecResult {
        success: status.success(),
        exit_code: status.code(),
        stdout: stdout?,
        stderr: stderr?,
    })
}

/// Read a piped stream to EOF; lossy so odd bytes never fail a query
async fn drain<S: AsyncRead + Unpin>(stream: Option<S>) -> std::io::Result<String> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Blocking wrapper over [`exec_command`]
///
/// Builds a current-thread runtime per call; btbuild never runs more than one
/// external process at a time.
pub fn exec_command_sync(
    spec: &CommandSpec,
    options: &ExecOptions,
) -> Result<ExecResult, BuildError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| std::io::Error::other(format!("Failed to create runtime: {}", e)))?;

    rt.block_on(exec_command(spec, options))
}
