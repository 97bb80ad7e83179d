// Helper functions shared by the catalog, fetcher and merger

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

/// Longest title kept in a file name, in characters
pub const MAX_TITLE_CHARS: usize = 150;

/// Longest title in UTF-8 bytes. Common filesystems allow 255 bytes per name,
/// and the title still needs room for the longest suffix.
pub const MAX_TITLE_BYTES: usize = 255 - LONGEST_NAME_SUFFIX.len();

const LONGEST_NAME_SUFFIX: &str = "_video.mp4";

/// Characters rejected by at least one mainstream filesystem
const ILLEGAL_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Strip characters that cannot appear in a file name.
///
/// Idempotent: `sanitize_title(&sanitize_title(s)) == sanitize_title(s)`.
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !c.is_control() && !ILLEGAL_FILENAME_CHARS.contains(c))
        .collect();

    let mut truncated = String::with_capacity(MAX_TITLE_BYTES);
    for c in cleaned.trim().chars().take(MAX_TITLE_CHARS) {
        if truncated.len() + c.len_utf8() > MAX_TITLE_BYTES {
            break;
        }
        truncated.push(c);
    }
    truncated.trim().to_string()
}

/// Remove a file, treating "already gone" as success
pub async fn remove_if_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Best-effort removal; failures are logged, never returned
pub async fn discard_file(path: &Path) {
    if let Err(e) = remove_if_exists(path).await {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove file");
    }
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start: {0}")]
    Spawn(#[source] io::Error),

    #[error("failed while waiting: {0}")]
    Wait(#[source] io::Error),

    #[error("timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
}

/// Run a program with an argument vector and collect its output.
///
/// stdin is closed. The child is always either waited on or killed before
/// this returns.
pub async fn run_output_with_timeout(
    program: &Path,
    args: &[OsString],
    limit: Option<Duration>,
) -> Result<Output, ProcessError> {
    tracing::debug!(program = %program.display(), ?args, "spawning");

    let mut child = TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(ProcessError::Spawn)?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| ProcessError::Wait(io::Error::other("stdout not captured")))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| ProcessError::Wait(io::Error::other("stderr not captured")))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    let waited = match limit {
        Some(limit) => timeout(limit, child.wait()).await,
        None => Ok(child.wait().await),
    };

    match waited {
        Ok(status_res) => {
            let status = status_res.map_err(ProcessError::Wait)?;
            let stdout = join_pipe(stdout_task).await?;
            let stderr = join_pipe(stderr_task).await?;
            Ok(Output {
                status,
                stdout,
                stderr,
            })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(ProcessError::TimedOut(limit.unwrap_or_default()))
        }
    }
}

async fn join_pipe(
    task: tokio::task::JoinHandle<io::Result<Vec<u8>>>,
) -> Result<Vec<u8>, ProcessError> {
    task.await
        .map_err(|e| ProcessError::Wait(io::Error::other(e)))?
        .map_err(ProcessError::Wait)
}
