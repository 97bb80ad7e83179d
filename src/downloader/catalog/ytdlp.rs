// yt-dlp backed catalog
//
// Metadata comes from `yt-dlp --dump-json --no-playlist <watch url>`; only
// formats with a direct http(s) URL are kept, so every descriptor can be
// fetched with a single GET. Fragmented protocols (m3u8, dash) are skipped.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use tokio_util::io::StreamReader;

use super::traits::{ByteStream, StreamCatalog};
use crate::downloader::errors::CatalogError;
use crate::downloader::models::{
    StreamDescriptor, StreamHandle, StreamKind, VideoManifest, VideoReference,
};
use crate::downloader::utils::{run_output_with_timeout, ProcessError};

/// Settings for the yt-dlp catalog
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// yt-dlp binary
    pub ytdlp_path: PathBuf,
    /// SOCKS5/HTTP proxy URL, used by yt-dlp and by stream requests
    pub proxy: Option<String>,
    /// Socket/connect timeout
    pub socket_timeout: Duration,
    /// Upper bound for one metadata lookup (None = no limit)
    pub metadata_timeout: Option<Duration>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: PathBuf::from("yt-dlp"),
            proxy: None,
            socket_timeout: Duration::from_secs(30),
            metadata_timeout: Some(Duration::from_secs(120)),
        }
    }
}

pub struct YtDlpCatalog {
    config: CatalogConfig,
    http: reqwest::Client,
}

impl YtDlpCatalog {
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
        let mut builder = reqwest::Client::builder().connect_timeout(config.socket_timeout);

        if let Some(proxy_url) = config.proxy.as_deref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        Ok(Self {
            http: builder.build()?,
            config,
        })
    }

    /// Build yt-dlp arguments; the URL is always the canonical watch URL
    fn build_args(&self, video: &VideoReference) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--dump-json".into(),
            "--no-playlist".into(),
            "--no-warnings".into(),
            "--socket-timeout".into(),
            self.config.socket_timeout.as_secs().to_string().into(),
        ];

        if let Some(proxy) = &self.config.proxy {
            args.push("--proxy".into());
            args.push(proxy.into());
        }

        args.push(video.watch_url().into());
        args
    }

    /// Parse `--dump-json` output into a manifest
    pub(crate) fn parse_manifest(stdout: &[u8]) -> Result<VideoManifest, CatalogError> {
        let json: serde_json::Value = serde_json::from_slice(stdout)
            .map_err(|e| CatalogError::Parse(format!("Invalid JSON: {}", e)))?;

        let formats_array = json["formats"]
            .as_array()
            .ok_or_else(|| CatalogError::Parse("No formats array in JSON".to_string()))?;

        let streams = formats_array.iter().filter_map(parse_format).collect();

        Ok(VideoManifest {
            title: json["title"].as_str().unwrap_or("video").to_string(),
            streams,
        })
    }
}

/// One entry of the `formats` array, or None if it cannot be fetched directly
fn parse_format(f: &serde_json::Value) -> Option<StreamDescriptor> {
    let protocol = f["protocol"].as_str().unwrap_or("https");
    if protocol != "https" && protocol != "http" {
        return None;
    }

    let url = f["url"].as_str()?.to_string();
    let vcodec = f["vcodec"].as_str().filter(|v| *v != "none" && !v.is_empty());
    let acodec = f["acodec"].as_str().filter(|a| *a != "none" && !a.is_empty());

    let (kind, quality, codec) = match (vcodec, acodec) {
        (Some(v), Some(_)) => (StreamKind::Combined, f["height"].as_u64()?, v),
        (Some(v), None) => (StreamKind::VideoOnly, f["height"].as_u64()?, v),
        (None, Some(a)) => {
            let kbps = f["abr"].as_f64().or_else(|| f["tbr"].as_f64())?;
            (StreamKind::AudioOnly, (kbps * 1000.0).round() as u64, a)
        }
        // storyboards and other non-media entries
        (None, None) => return None,
    };

    let headers = f["http_headers"]
        .as_object()
        .map(|h| {
            h.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default();

    Some(StreamDescriptor {
        format_id: f["format_id"].as_str().unwrap_or("").to_string(),
        kind,
        quality,
        container: f["ext"].as_str().unwrap_or("mp4").to_string(),
        codec: Some(codec.to_string()),
        handle: StreamHandle { url, headers },
    })
}

#[async_trait]
impl StreamCatalog for YtDlpCatalog {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn get_catalog(&self, video: &VideoReference) -> Result<VideoManifest, CatalogError> {
        let args = self.build_args(video);
        tracing::info!(video = %video, "fetching stream catalog");

        let output =
            run_output_with_timeout(&self.config.ytdlp_path, &args, self.config.metadata_timeout)
                .await
                .map_err(|e| match e {
                    ProcessError::Spawn(source) => CatalogError::ToolNotFound(format!(
                        "{}: {}",
                        self.config.ytdlp_path.display(),
                        source
                    )),
                    timed_out @ ProcessError::TimedOut(_) => {
                        CatalogError::Timeout(timed_out.to_string())
                    }
                    other => CatalogError::Other(other.to_string()),
                })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(video = %video, stderr = %stderr.trim(), "yt-dlp failed");
            return Err(CatalogError::from_stderr(&stderr));
        }

        let manifest = Self::parse_manifest(&output.stdout)?;
        tracing::debug!(
            video = %video,
            title = %manifest.title,
            streams = manifest.streams.len(),
            "catalog loaded"
        );
        Ok(manifest)
    }

    async fn open_stream(&self, descriptor: &StreamDescriptor) -> Result<ByteStream, CatalogError> {
        let mut request = self.http.get(&descriptor.handle.url);
        for (name, value) in &descriptor.handle.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?.error_for_status()?;
        tracing::debug!(
            format_id = %descriptor.format_id,
            length = ?response.content_length(),
            "stream opened"
        );

        let body = response.bytes_stream().map_err(io::Error::other);
        Ok(Box::pin(StreamReader::new(body)))
    }
}
