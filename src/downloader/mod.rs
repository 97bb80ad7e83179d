// Downloader module - stream selection, fetching and merging

pub mod catalog;
pub mod errors;
pub mod fetcher;
pub mod merger;
pub mod models;
pub mod orchestrator;
pub mod stream_selector;
pub mod tools;
pub mod utils;
pub mod video_id;

#[cfg(test)]
pub(crate) mod test_support;

pub use catalog::{ByteStream, CatalogConfig, StreamCatalog, YtDlpCatalog};
pub use errors::{CatalogError, DownloadError, FailureKind, FetchError, MergeError, ParseError};
pub use fetcher::Fetcher;
pub use merger::{FfmpegMuxer, Merger, Muxer};
pub use models::{
    DownloadJob, DownloadOutcome, SelectionResult, Stage, StreamDescriptor, StreamKind,
    VideoManifest, VideoReference,
};
pub use orchestrator::DownloadOrchestrator;
pub use stream_selector::select;
pub use tools::{ToolInfo, ToolManager, ToolType};
pub use video_id::parse_video_reference;
