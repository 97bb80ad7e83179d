//! Command-line and environment configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use crate::downloader::{
    CatalogConfig, CatalogError, DownloadOrchestrator, FfmpegMuxer, ToolManager, ToolType,
    YtDlpCatalog,
};
use crate::logging::LogLevel;

#[derive(Debug, Clone, Parser)]
#[command(name = "youtube-downloader-web")]
#[command(about = "Save YouTube videos through a small web page", version)]
pub struct Config {
    /// Address the HTTP server listens on
    #[arg(long, env = "YTDL_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Directory downloads are written to and served from
    /// [default: <Downloads>/youtube-downloader]
    #[arg(long, env = "YTDL_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// ffmpeg binary (auto-detected when omitted)
    #[arg(long, env = "YTDL_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    /// yt-dlp binary (auto-detected when omitted)
    #[arg(long = "yt-dlp", env = "YTDL_YTDLP")]
    pub ytdlp: Option<PathBuf>,

    /// SOCKS5/HTTP proxy for metadata and stream requests
    #[arg(long, env = "YTDL_PROXY")]
    pub proxy: Option<String>,

    /// Connect timeout for YouTube requests, and the longest wait for the
    /// next chunk of a stream download, in seconds (0 = no stall limit)
    #[arg(long, default_value_t = 30)]
    pub socket_timeout: u64,

    /// Limit for one metadata lookup, in seconds (0 = no limit)
    #[arg(long, default_value_t = 120)]
    pub metadata_timeout: u64,

    /// Kill ffmpeg after this many seconds
    #[arg(long)]
    pub merge_timeout: Option<u64>,

    /// Download video and audio parts one after the other
    #[arg(long)]
    pub sequential_fetch: bool,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Also write debug logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(default_output_dir)
    }

    pub fn catalog_config(&self, tools: &ToolManager) -> CatalogConfig {
        CatalogConfig {
            ytdlp_path: tools.resolve_binary(ToolType::YtDlp, self.ytdlp.as_deref()),
            proxy: self.proxy.clone(),
            socket_timeout: Duration::from_secs(self.socket_timeout),
            metadata_timeout: (self.metadata_timeout > 0)
                .then(|| Duration::from_secs(self.metadata_timeout)),
        }
    }

    pub fn ffmpeg_muxer(&self, tools: &ToolManager) -> FfmpegMuxer {
        FfmpegMuxer::new(tools.resolve_binary(ToolType::Ffmpeg, self.ffmpeg.as_deref()))
            .with_timeout(self.merge_timeout.map(Duration::from_secs))
    }

    /// Wire the production catalog and muxer into an orchestrator
    pub fn build_orchestrator(&self, tools: &ToolManager) -> Result<DownloadOrchestrator, CatalogError> {
        let catalog = YtDlpCatalog::new(self.catalog_config(tools))?;

        Ok(DownloadOrchestrator::new(
            Arc::new(catalog),
            Arc::new(self.ffmpeg_muxer(tools)),
            self.output_dir(),
        )
        .with_parallel_fetch(!self.sequential_fetch)
        .with_read_timeout(self.read_timeout()))
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        (self.socket_timeout > 0).then(|| Duration::from_secs(self.socket_timeout))
    }
}

fn default_output_dir() -> PathBuf {
    dirs::download_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("youtube-downloader")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["youtube-downloader-web"]).unwrap();
        assert_eq!(config.bind, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.socket_timeout, 30);
        assert_eq!(config.read_timeout(), Some(Duration::from_secs(30)));
        assert!(!config.sequential_fetch);
        assert!(config.output_dir().ends_with("youtube-downloader"));
    }

    #[test]
    fn explicit_values() {
        let config = Config::try_parse_from([
            "youtube-downloader-web",
            "--output-dir",
            "/srv/videos",
            "--ffmpeg",
            "/opt/ffmpeg/bin/ffmpeg",
            "--yt-dlp",
            "/opt/yt-dlp",
            "--metadata-timeout",
            "0",
            "--merge-timeout",
            "600",
            "--sequential-fetch",
            "--log-level",
            "debug",
        ])
        .unwrap();

        let tools = ToolManager::new();
        assert_eq!(config.output_dir(), PathBuf::from("/srv/videos"));
        assert_eq!(config.log_level, LogLevel::Debug);

        let catalog = config.catalog_config(&tools);
        assert_eq!(catalog.ytdlp_path, PathBuf::from("/opt/yt-dlp"));
        assert!(catalog.metadata_timeout.is_none());
        assert!(config.sequential_fetch);
    }

    #[test]
    fn zero_socket_timeout_disables_stall_limit() {
        let config =
            Config::try_parse_from(["youtube-downloader-web", "--socket-timeout", "0"]).unwrap();
        assert!(config.read_timeout().is_none());
    }
}
