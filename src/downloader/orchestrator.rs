// Orchestrator - one request from URL to saved file
//
// Validating -> Resolving -> Selecting -> Fetching -> (Merging) -> Done | Failed
//
// Every stage returns its own error type; they meet in `DownloadError` and are
// turned into exactly one user-facing message by `DownloadJob::finish`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use super::catalog::StreamCatalog;
use super::errors::DownloadError;
use super::fetcher::Fetcher;
use super::merger::{Merger, Muxer};
use super::models::{
    Completion, DownloadJob, DownloadOutcome, SelectionResult, Stage, StreamDescriptor, StreamRole,
};
use super::stream_selector::select;
use super::utils::{discard_file, sanitize_title};

pub struct DownloadOrchestrator {
    catalog: Arc<dyn StreamCatalog>,
    fetcher: Fetcher,
    merger: Merger,
    output_dir: PathBuf,
    parallel_fetch: bool,
}

impl DownloadOrchestrator {
    pub fn new(
        catalog: Arc<dyn StreamCatalog>,
        muxer: Arc<dyn Muxer>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher: Fetcher::new(Arc::clone(&catalog)),
            merger: Merger::new(muxer),
            catalog,
            output_dir: output_dir.into(),
            parallel_fetch: true,
        }
    }

    /// Fetch the video and audio parts of a pair concurrently (default) or one after the other
    pub fn with_parallel_fetch(mut self, enabled: bool) -> Self {
        self.parallel_fetch = enabled;
        self
    }

    /// Fail a part download when its stream sends nothing for this long
    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.fetcher = self.fetcher.with_read_timeout(read_timeout);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Run one request to completion. Never fails: every error becomes the
    /// outcome's status message.
    pub async fn download(&self, input: &str) -> DownloadOutcome {
        let span = tracing::info_span!("download", catalog = self.catalog.name(), input = %input.trim());

        async {
            let mut job = DownloadJob::new(self.output_dir.clone());
            let result = self.drive(input, &mut job).await;
            job.finish(result)
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, input: &str, job: &mut DownloadJob) -> Result<Completion, DownloadError> {
        let url = validate_input(input)?;

        job.advance(Stage::Resolving);
        let video = self.catalog.resolve(url)?;

        job.advance(Stage::Selecting);
        let manifest = self.catalog.get_catalog(&video).await?;

        let title = sanitize_title(&manifest.title);
        job.set_title(if title.is_empty() {
            video.id().to_string()
        } else {
            title
        });

        match select(&manifest.streams) {
            SelectionResult::Unavailable => Err(DownloadError::SelectionUnavailable),

            SelectionResult::Combined(stream) => {
                tracing::info!(
                    format_id = %stream.format_id,
                    quality = %stream.quality_label(),
                    container = %stream.container,
                    "selected combined stream"
                );
                self.enter_fetching(job).await?;

                let output = job.path_for(StreamRole::Combined);
                self.fetch_one(&stream, &output, StreamRole::Combined).await?;
                job.set_output(output);
                Ok(Completion::Downloaded)
            }

            SelectionResult::Pair { video, audio } => {
                tracing::info!(
                    video = %video.format_id,
                    video_quality = %video.quality_label(),
                    video_container = %video.container,
                    audio = %audio.format_id,
                    audio_quality = %audio.quality_label(),
                    audio_container = %audio.container,
                    "selected separate video and audio"
                );
                self.enter_fetching(job).await?;

                let video_path = job.path_for(StreamRole::Video);
                let audio_path = job.path_for(StreamRole::Audio);
                job.track_temp(video_path.clone());
                job.track_temp(audio_path.clone());

                if let Err(e) = self.fetch_pair(&video, &video_path, &audio, &audio_path).await {
                    // both parts or neither
                    discard_file(&video_path).await;
                    discard_file(&audio_path).await;
                    job.clear_temp();
                    return Err(e);
                }

                job.advance(Stage::Merging);
                let output = job.path_for(StreamRole::Combined);
                self.merger.merge(&video_path, &audio_path, &output).await?;
                job.clear_temp();
                job.set_output(output);
                Ok(Completion::Merged)
            }
        }
    }

    async fn enter_fetching(&self, job: &mut DownloadJob) -> Result<(), DownloadError> {
        job.advance(Stage::Fetching);
        tokio::fs::create_dir_all(job.output_dir())
            .await
            .map_err(|source| DownloadError::OutputDir {
                path: job.output_dir().to_path_buf(),
                source,
            })
    }

    async fn fetch_one(
        &self,
        stream: &StreamDescriptor,
        destination: &Path,
        role: StreamRole,
    ) -> Result<u64, DownloadError> {
        self.fetcher
            .fetch(stream, destination)
            .await
            .map_err(|source| DownloadError::Fetch { role, source })
    }

    async fn fetch_pair(
        &self,
        video: &StreamDescriptor,
        video_path: &Path,
        audio: &StreamDescriptor,
        audio_path: &Path,
    ) -> Result<(), DownloadError> {
        if self.parallel_fetch {
            tokio::try_join!(
                self.fetch_one(video, video_path, StreamRole::Video),
                self.fetch_one(audio, audio_path, StreamRole::Audio),
            )?;
        } else {
            self.fetch_one(video, video_path, StreamRole::Video).await?;
            self.fetch_one(audio, audio_path, StreamRole::Audio).await?;
        }
        Ok(())
    }
}

fn validate_input(input: &str) -> Result<&str, DownloadError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DownloadError::InvalidInput);
    }
    Ok(trimmed)
}
