// Merger - multiplexes separately downloaded video and audio
//
// Intermediate file policy:
// - success: both inputs deleted, only the merged output remains
// - failure: inputs kept for inspection, partial merged output deleted

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::errors::MergeError;
use super::utils::{discard_file, run_output_with_timeout, ProcessError};

/// External tool that combines one video and one audio file
#[async_trait]
pub trait Muxer: Send + Sync {
    /// Name of the muxer (for logging)
    fn name(&self) -> &'static str;

    /// Write `output` from `video` and `audio`, copying video unmodified
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), MergeError>;
}

/// Audio is always re-encoded to this codec (mp4 wants AAC)
const AUDIO_CODEC: &str = "aac";

/// ffmpeg invoked with an argument vector
#[derive(Debug, Clone)]
pub struct FfmpegMuxer {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl FfmpegMuxer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// ffmpeg arguments. Paths get a `file:` prefix so a name starting with
    /// `-` is never taken for an option.
    pub fn build_args(&self, video: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-loglevel", "error", "-y"]
            .iter()
            .map(OsString::from)
            .collect();

        args.push("-i".into());
        args.push(file_url(video));
        args.push("-i".into());
        args.push(file_url(audio));

        for arg in ["-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a", AUDIO_CODEC] {
            args.push(arg.into());
        }
        args.push(file_url(output));
        args
    }

    fn program(&self) -> String {
        self.binary.display().to_string()
    }
}

fn file_url(path: &Path) -> OsString {
    let mut arg = OsString::from("file:");
    arg.push(path.as_os_str());
    arg
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), MergeError> {
        let args = self.build_args(video, audio, output);

        let result = run_output_with_timeout(&self.binary, &args, self.timeout)
            .await
            .map_err(|e| match e {
                ProcessError::Spawn(source) => MergeError::Launch {
                    program: self.program(),
                    source,
                },
                ProcessError::Wait(source) => MergeError::Interrupted {
                    program: self.program(),
                    source,
                },
                ProcessError::TimedOut(timeout) => MergeError::TimedOut {
                    program: self.program(),
                    timeout,
                },
            })?;

        if !result.status.success() {
            return Err(MergeError::NonZeroExit {
                program: self.program(),
                code: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

/// Applies the intermediate-file policy around a `Muxer`
pub struct Merger {
    muxer: Arc<dyn Muxer>,
}

impl Merger {
    pub fn new(muxer: Arc<dyn Muxer>) -> Self {
        Self { muxer }
    }

    pub async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), MergeError> {
        tracing::info!(
            muxer = self.muxer.name(),
            output = %output.display(),
            "merging video and audio"
        );

        let muxed = match self.muxer.mux(video, audio, output).await {
            Ok(()) if tokio::fs::try_exists(output).await.unwrap_or(false) => Ok(()),
            Ok(()) => Err(MergeError::MissingOutput(output.to_path_buf())),
            Err(e) => Err(e),
        };

        match muxed {
            Ok(()) => {
                discard_file(video).await;
                discard_file(audio).await;
                Ok(())
            }
            Err(e) => {
                // a muxer that never started wrote nothing; a file at `output`
                // belongs to an earlier request
                if !matches!(e, MergeError::Launch { .. }) {
                    discard_file(output).await;
                }
                tracing::warn!(
                    video = %video.display(),
                    audio = %audio.display(),
                    error = %e,
                    "merge failed, keeping intermediate files"
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::test_support::{FakeMuxer, MuxBehavior};

    fn write_parts(dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
        let video = dir.join("clip_video.mp4");
        let audio = dir.join("clip_audio.mp4");
        std::fs::write(&video, b"video").unwrap();
        std::fs::write(&audio, b"audio").unwrap();
        (video, audio, dir.join("clip.mp4"))
    }

    #[test]
    fn paths_with_spaces_stay_single_arguments() {
        let muxer = FfmpegMuxer::new("ffmpeg");
        let args = muxer.build_args(
            Path::new("/v/My Clip; rm -rf _video.mp4"),
            Path::new("/v/My Clip_audio.mp4"),
            Path::new("/v/-My Clip.mp4"),
        );

        assert!(args.contains(&OsString::from("file:/v/My Clip; rm -rf _video.mp4")));
        assert!(args.contains(&OsString::from("file:/v/My Clip_audio.mp4")));
        assert_eq!(args.last().unwrap(), &OsString::from("file:/v/-My Clip.mp4"));

        let codec_at = args.iter().position(|a| a == "-c:v").unwrap();
        assert_eq!(args[codec_at + 1], "copy");
        let audio_at = args.iter().position(|a| a == "-c:a").unwrap();
        assert_eq!(args[audio_at + 1], "aac");
    }

    #[tokio::test]
    async fn success_removes_intermediates() {
        let dir = tempfile::tempdir().unwrap();
        let (video, audio, output) = write_parts(dir.path());

        let merger = Merger::new(Arc::new(FakeMuxer::new(MuxBehavior::WriteOutput)));
        merger.merge(&video, &audio, &output).await.unwrap();

        assert!(output.exists());
        assert!(!video.exists());
        assert!(!audio.exists());
        assert_eq!(std::fs::read(&output).unwrap(), b"videoaudio");
    }

    #[tokio::test]
    async fn failure_keeps_intermediates_and_drops_output() {
        let dir = tempfile::tempdir().unwrap();
        let (video, audio, output) = write_parts(dir.path());

        let merger = Merger::new(Arc::new(FakeMuxer::new(MuxBehavior::Fail)));
        let err = merger.merge(&video, &audio, &output).await.unwrap_err();

        assert!(matches!(err, MergeError::NonZeroExit { code: Some(1), .. }));
        assert!(video.exists());
        assert!(audio.exists());
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn success_without_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (video, audio, output) = write_parts(dir.path());

        let merger = Merger::new(Arc::new(FakeMuxer::new(MuxBehavior::SucceedWithoutOutput)));
        let err = merger.merge(&video, &audio, &output).await.unwrap_err();

        assert!(matches!(err, MergeError::MissingOutput(_)));
        assert!(video.exists());
        assert!(audio.exists());
    }

    #[tokio::test]
    async fn missing_ffmpeg_is_a_launch_error() {
        let dir = tempfile::tempdir().unwrap();
        let (video, audio, output) = write_parts(dir.path());

        let merger = Merger::new(Arc::new(FfmpegMuxer::new("/nonexistent/ffmpeg")));
        let err = merger.merge(&video, &audio, &output).await.unwrap_err();

        assert!(matches!(err, MergeError::Launch { .. }));
        assert!(video.exists());
        assert!(audio.exists());
    }

    #[tokio::test]
    async fn launch_failure_keeps_earlier_output() {
        let dir = tempfile::tempdir().unwrap();
        let (video, audio, output) = write_parts(dir.path());
        std::fs::write(&output, b"earlier download").unwrap();

        let merger = Merger::new(Arc::new(FfmpegMuxer::new("/nonexistent/ffmpeg")));
        let err = merger.merge(&video, &audio, &output).await.unwrap_err();

        assert!(matches!(err, MergeError::Launch { .. }));
        assert_eq!(std::fs::read(&output).unwrap(), b"earlier download");
        assert!(video.exists());
        assert!(audio.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (video, audio, output) = write_parts(dir.path());

        // `false` ignores its arguments and exits 1
        let merger = Merger::new(Arc::new(FfmpegMuxer::new("false")));
        let err = merger.merge(&video, &audio, &output).await.unwrap_err();

        assert!(matches!(err, MergeError::NonZeroExit { code: Some(1), .. }));
        assert!(video.exists());
    }
}
