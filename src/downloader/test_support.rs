//! In-memory catalog and muxer used by the unit tests

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio_util::io::StreamReader;

use super::catalog::{ByteStream, StreamCatalog};
use super::errors::{CatalogError, MergeError};
use super::merger::Muxer;
use super::models::{StreamDescriptor, StreamHandle, StreamKind, VideoManifest, VideoReference};

pub fn descriptor(id: &str, kind: StreamKind, quality: u64) -> StreamDescriptor {
    StreamDescriptor {
        format_id: id.to_string(),
        kind,
        quality,
        container: "mp4".to_string(),
        codec: None,
        handle: StreamHandle {
            url: format!("https://media.invalid/{}", id),
            headers: Vec::new(),
        },
    }
}

/// What `open_stream` does for one format id
#[derive(Debug, Clone)]
pub enum StreamBehavior {
    Bytes(Vec<u8>),
    /// Yields the bytes, then a connection error
    BreakAfter(Vec<u8>),
    /// Yields the bytes, then never sends anything again
    StallAfter(Vec<u8>),
    RefuseOpen,
}

pub struct FakeCatalog {
    title: String,
    streams: Vec<StreamDescriptor>,
    behaviors: HashMap<String, StreamBehavior>,
    catalog_offline: bool,
    opened: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn new(title: &str, streams: Vec<StreamDescriptor>) -> Self {
        Self {
            title: title.to_string(),
            streams,
            behaviors: HashMap::new(),
            catalog_offline: false,
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn with_stream(mut self, format_id: &str, behavior: StreamBehavior) -> Self {
        self.behaviors.insert(format_id.to_string(), behavior);
        self
    }

    pub fn offline(mut self) -> Self {
        self.catalog_offline = true;
        self
    }

    /// Format ids passed to `open_stream`, in call order
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl StreamCatalog for FakeCatalog {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn get_catalog(&self, _video: &VideoReference) -> Result<VideoManifest, CatalogError> {
        if self.catalog_offline {
            return Err(CatalogError::Other("catalog offline".to_string()));
        }
        Ok(VideoManifest {
            title: self.title.clone(),
            streams: self.streams.clone(),
        })
    }

    async fn open_stream(&self, descriptor: &StreamDescriptor) -> Result<ByteStream, CatalogError> {
        self.opened.lock().unwrap().push(descriptor.format_id.clone());

        let behavior = self
            .behaviors
            .get(&descriptor.format_id)
            .cloned()
            .unwrap_or_else(|| {
                StreamBehavior::Bytes(format!("{}-payload", descriptor.format_id).into_bytes())
            });

        let chunks: Vec<io::Result<Bytes>> = match behavior {
            StreamBehavior::Bytes(data) => vec![Ok(Bytes::from(data))],
            StreamBehavior::BreakAfter(data) => vec![
                Ok(Bytes::from(data)),
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
            ],
            StreamBehavior::StallAfter(data) => {
                let head = futures::stream::iter(vec![Ok::<Bytes, io::Error>(Bytes::from(data))]);
                return Ok(Box::pin(StreamReader::new(head.chain(futures::stream::pending()))));
            }
            StreamBehavior::RefuseOpen => {
                return Err(CatalogError::Other("stream refused".to_string()));
            }
        };

        Ok(Box::pin(StreamReader::new(futures::stream::iter(chunks))))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum MuxBehavior {
    /// Output is the video bytes followed by the audio bytes
    WriteOutput,
    /// Writes a partial output, then fails like a non-zero ffmpeg exit
    Fail,
    SucceedWithoutOutput,
}

pub struct FakeMuxer {
    behavior: MuxBehavior,
    calls: Mutex<usize>,
}

impl FakeMuxer {
    pub fn new(behavior: MuxBehavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Muxer for FakeMuxer {
    fn name(&self) -> &'static str {
        "fake-ffmpeg"
    }

    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), MergeError> {
        *self.calls.lock().unwrap() += 1;

        match self.behavior {
            MuxBehavior::WriteOutput => {
                let mut merged = tokio::fs::read(video).await.map_err(launch_error)?;
                merged.extend(tokio::fs::read(audio).await.map_err(launch_error)?);
                tokio::fs::write(output, merged).await.map_err(launch_error)?;
                Ok(())
            }
            MuxBehavior::Fail => {
                tokio::fs::write(output, b"partial").await.map_err(launch_error)?;
                Err(MergeError::NonZeroExit {
                    program: "fake-ffmpeg".to_string(),
                    code: Some(1),
                    stderr: "Invalid data found when processing input".to_string(),
                })
            }
            MuxBehavior::SucceedWithoutOutput => Ok(()),
        }
    }
}

fn launch_error(source: io::Error) -> MergeError {
    MergeError::Launch {
        program: "fake-ffmpeg".to_string(),
        source,
    }
}
