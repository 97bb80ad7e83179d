// Common data models for the download pipeline

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{DownloadError, FailureKind};

/// Container extension used for every file written to the output directory
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Parsed YouTube video id (always 11 characters of `[A-Za-z0-9_-]`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoReference {
    pub(crate) id: String,
}

impl VideoReference {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Canonical watch URL, the only form handed to external tools
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }
}

impl fmt::Display for VideoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// What a stream variant carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// Audio and video in one file
    Combined,
    VideoOnly,
    AudioOnly,
}

/// Opaque handle the catalog uses to open the byte stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamHandle {
    /// Direct media URL
    pub url: String,
    /// Headers yt-dlp says the URL must be requested with
    pub headers: Vec<(String, String)>,
}

/// One downloadable variant of a video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    /// Format ID (e.g., "18", "137", "140")
    pub format_id: String,
    pub kind: StreamKind,
    /// Height in pixels for video-bearing kinds, bitrate in bit/s for audio-only
    pub quality: u64,
    /// File extension reported by the catalog (mp4, webm, m4a)
    pub container: String,
    /// Codec string, informational only
    pub codec: Option<String>,
    pub handle: StreamHandle,
}

impl StreamDescriptor {
    /// Human-readable quality (e.g., "1080p" or "128 kbps")
    pub fn quality_label(&self) -> String {
        match self.kind {
            StreamKind::AudioOnly => format!("{} kbps", self.quality / 1000),
            StreamKind::Combined | StreamKind::VideoOnly => format!("{}p", self.quality),
        }
    }
}

/// Title plus stream variants, as returned by one catalog lookup
#[derive(Debug, Clone)]
pub struct VideoManifest {
    pub title: String,
    pub streams: Vec<StreamDescriptor>,
}

/// Outcome of stream selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionResult {
    Combined(StreamDescriptor),
    Pair {
        video: StreamDescriptor,
        audio: StreamDescriptor,
    },
    Unavailable,
}

/// Which file a stream is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamRole {
    Combined,
    Video,
    Audio,
}

impl StreamRole {
    /// File name suffix placed between the title and the extension
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Combined => "",
            Self::Video => "_video",
            Self::Audio => "_audio",
        }
    }
}

impl fmt::Display for StreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Combined => write!(f, "combined"),
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// Request state machine stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validating,
    Resolving,
    Selecting,
    Fetching,
    Merging,
    Done,
    Failed,
}

/// How a successful request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Downloaded,
    Merged,
}

impl Completion {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Downloaded => "Video downloaded successfully.",
            Self::Merged => "Video downloaded and merged successfully.",
        }
    }
}

/// Working state of a single request
#[derive(Debug)]
pub struct DownloadJob {
    stage: Stage,
    output_dir: PathBuf,
    title: Option<String>,
    temp_files: Vec<PathBuf>,
    output_path: Option<PathBuf>,
}

impl DownloadJob {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            stage: Stage::Validating,
            output_dir: output_dir.into(),
            title: None,
            temp_files: Vec::new(),
            output_path: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn advance(&mut self, next: Stage) {
        tracing::debug!(from = ?self.stage, to = ?next, "stage transition");
        self.stage = next;
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Set the already-sanitized base file name
    pub fn set_title(&mut self, title: String) {
        self.title = Some(title);
    }

    /// `<output_dir>/<title><suffix>.mp4`
    pub fn path_for(&self, role: StreamRole) -> PathBuf {
        let title = self.title.as_deref().unwrap_or("video");
        self.output_dir
            .join(format!("{}{}.{}", title, role.suffix(), OUTPUT_EXTENSION))
    }

    pub fn track_temp(&mut self, path: PathBuf) {
        self.temp_files.push(path);
    }

    /// Stop tracking temp files once they were deleted
    pub fn clear_temp(&mut self) {
        self.temp_files.clear();
    }

    pub fn set_output(&mut self, path: PathBuf) {
        self.output_path = Some(path);
    }

    /// Consume the job and produce the single user-facing outcome
    pub fn finish(mut self, result: Result<Completion, DownloadError>) -> DownloadOutcome {
        match result {
            Ok(completion) => {
                self.advance(Stage::Done);
                tracing::info!(
                    output = ?self.output_path,
                    "{}",
                    completion.message()
                );
                DownloadOutcome {
                    stage: Stage::Done,
                    message: completion.message().to_string(),
                    output_path: self.output_path,
                    failure: None,
                    retained_files: Vec::new(),
                }
            }
            Err(err) => {
                let failed_in = self.stage;
                self.advance(Stage::Failed);
                tracing::warn!(stage = ?failed_in, error = %err, "download failed");
                DownloadOutcome {
                    stage: Stage::Failed,
                    message: err.user_message(),
                    output_path: None,
                    failure: Some(err.kind()),
                    retained_files: self.temp_files,
                }
            }
        }
    }
}

/// The single result of a request: status message and, on success, the file
#[derive(Debug, Clone, Serialize)]
pub struct DownloadOutcome {
    pub stage: Stage,
    pub message: String,
    pub output_path: Option<PathBuf>,
    pub failure: Option<FailureKind>,
    /// Intermediates kept for inspection after a failed merge
    pub retained_files: Vec<PathBuf>,
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        self.stage == Stage::Done
    }

    /// File name of the output, relative to the served directory
    pub fn file_name(&self) -> Option<String> {
        self.output_path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }
}
