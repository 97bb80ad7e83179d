// Error types for each stage of a download request

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use super::models::StreamRole;

/// Input did not match any known YouTube URL shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a recognised YouTube URL or video id: {input}")]
pub struct ParseError {
    pub input: String,
}

/// Failures of the remote catalog (yt-dlp metadata or stream HTTP request)
#[derive(Debug, Error)]
pub enum CatalogError {
    /// yt-dlp binary not found or not runnable
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Video deleted, private or otherwise gone
    #[error("video unavailable: {0}")]
    VideoUnavailable(String),

    /// YouTube refused the request (403, 429, bot check)
    #[error("request blocked by YouTube: {0}")]
    Blocked(String),

    /// Network timeout while talking to YouTube
    #[error("network timeout: {0}")]
    Timeout(String),

    /// HTTP-level failure when opening a stream
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// yt-dlp output could not be understood
    #[error("could not parse catalog: {0}")]
    Parse(String),

    /// Anything else yt-dlp reported
    #[error("{0}")]
    Other(String),
}

/// Failure while copying one stream to disk
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("could not open stream: {0}")]
    Open(#[from] CatalogError),

    #[error("I/O error writing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("stream stalled: no data received for {timeout:?}")]
    Stalled { timeout: Duration },
}

/// Failure of the external multiplexer
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("lost track of {program} while it was running: {source}")]
    Interrupted {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with status {code:?}: {stderr}")]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{program} did not finish within {}s", .timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },

    #[error("merge reported success but {} was not written", .0.display())]
    MissingOutput(PathBuf),
}

/// Coarse failure classification, stable enough to assert on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidInput,
    Parse,
    CatalogUnavailable,
    SelectionUnavailable,
    OutputDir,
    Fetch,
    Merge,
}

/// Everything that can end a request early
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Invalid URL")]
    InvalidInput,

    #[error("Invalid video URL")]
    Parse(#[from] ParseError),

    #[error("Could not load video details: {0}")]
    CatalogUnavailable(#[from] CatalogError),

    #[error("Video or audio stream not available for this video.")]
    SelectionUnavailable,

    #[error("Error: could not create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error: failed to download {role} stream: {source}")]
    Fetch {
        role: StreamRole,
        #[source]
        source: FetchError,
    },

    #[error("Error: {0}")]
    Merge(#[from] MergeError),
}

impl DownloadError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidInput => FailureKind::InvalidInput,
            Self::Parse(_) => FailureKind::Parse,
            Self::CatalogUnavailable(_) => FailureKind::CatalogUnavailable,
            Self::SelectionUnavailable => FailureKind::SelectionUnavailable,
            Self::OutputDir { .. } => FailureKind::OutputDir,
            Self::Fetch { .. } => FailureKind::Fetch,
            Self::Merge(_) => FailureKind::Merge,
        }
    }

    /// Message shown to the user; identical to `Display`
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

impl CatalogError {
    /// Classify yt-dlp stderr into a catalog error
    pub fn from_stderr(stderr: &str) -> Self {
        let lower = stderr.to_lowercase();
        let detail = first_error_line(stderr);

        if lower.contains("timed out") || lower.contains("timeout") {
            return Self::Timeout(detail);
        }

        if lower.contains("429")
            || lower.contains("403")
            || lower.contains("sign in to confirm")
            || lower.contains("not a bot")
        {
            return Self::Blocked(detail);
        }

        if lower.contains("video unavailable")
            || lower.contains("private video")
            || lower.contains("has been removed")
            || lower.contains("does not exist")
        {
            return Self::VideoUnavailable(detail);
        }

        if lower.contains("command not found") || lower.contains("no such file") {
            return Self::ToolNotFound(detail);
        }

        Self::Other(detail)
    }
}

/// yt-dlp prints warnings before the real error; prefer the `ERROR:` line
fn first_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| stderr.lines().find(|l| !l.trim().is_empty()))
        .map(|l| l.trim_start_matches("ERROR:").trim().to_string())
        .unwrap_or_else(|| "yt-dlp failed without output".to_string())
}
