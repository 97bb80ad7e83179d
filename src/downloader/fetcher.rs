// Fetcher - copies one stream to a local file
//
// A destination file exists only after a complete copy. The remote stream is
// opened before the destination is touched; once the file was created, any
// failure removes it again. A stream that sends nothing for `read_timeout`
// counts as failed.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

use super::catalog::{ByteStream, StreamCatalog};
use super::errors::FetchError;
use super::models::StreamDescriptor;
use super::utils::discard_file;

const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);
const COPY_BUFFER_SIZE: usize = 64 * 1024;

pub struct Fetcher {
    catalog: Arc<dyn StreamCatalog>,
    read_timeout: Option<Duration>,
}

impl Fetcher {
    pub fn new(catalog: Arc<dyn StreamCatalog>) -> Self {
        Self {
            catalog,
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
        }
    }

    /// Longest wait for the next chunk of a stream (None = wait forever)
    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Download `descriptor` to `destination`, returning the byte count
    pub async fn fetch(
        &self,
        descriptor: &StreamDescriptor,
        destination: &Path,
    ) -> Result<u64, FetchError> {
        let mut stream = self.catalog.open_stream(descriptor).await?;

        let io_err = |source: std::io::Error| FetchError::Io {
            path: destination.to_path_buf(),
            source,
        };

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(destination)
            .await
            .map_err(io_err)?;

        let copied = self.copy_to_file(&mut stream, &mut file, destination).await;

        match copied {
            Ok(bytes) => {
                tracing::info!(
                    format_id = %descriptor.format_id,
                    quality = %descriptor.quality_label(),
                    bytes,
                    path = %destination.display(),
                    "stream saved"
                );
                Ok(bytes)
            }
            Err(e) => {
                drop(file);
                discard_file(destination).await;
                Err(e)
            }
        }
    }

    async fn copy_to_file(
        &self,
        stream: &mut ByteStream,
        file: &mut File,
        destination: &Path,
    ) -> Result<u64, FetchError> {
        let io_err = |source: std::io::Error| FetchError::Io {
            path: destination.to_path_buf(),
            source,
        };

        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        let mut total = 0u64;

        loop {
            let read = match self.read_timeout {
                Some(limit) => timeout(limit, stream.read(&mut buf))
                    .await
                    .map_err(|_| FetchError::Stalled { timeout: limit })?,
                None => stream.read(&mut buf).await,
            };
            let n = read.map_err(io_err)?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).await.map_err(io_err)?;
            total += n as u64;
        }

        file.flush().await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;
        Ok(total)
    }
}
