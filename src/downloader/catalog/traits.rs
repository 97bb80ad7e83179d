// StreamCatalog trait and byte stream type

use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::downloader::errors::{CatalogError, ParseError};
use crate::downloader::models::{StreamDescriptor, VideoManifest, VideoReference};
use crate::downloader::video_id::parse_video_reference;

/// Byte content of one stream, read to completion by the fetcher
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Source of stream variants for a video
#[async_trait]
pub trait StreamCatalog: Send + Sync {
    /// Name of the catalog (for logging)
    fn name(&self) -> &'static str;

    /// Parse user input into a video reference
    fn resolve(&self, url: &str) -> Result<VideoReference, ParseError> {
        parse_video_reference(url)
    }

    /// Title and available stream variants, in catalog order
    async fn get_catalog(&self, video: &VideoReference) -> Result<VideoManifest, CatalogError>;

    /// Open the byte content of a descriptor
    async fn open_stream(&self, descriptor: &StreamDescriptor) -> Result<ByteStream, CatalogError>;
}
