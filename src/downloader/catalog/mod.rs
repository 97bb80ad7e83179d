// StreamCatalog module - where stream variants come from
//
// The trait is the seam between the pipeline and YouTube:
// - resolve: user text -> VideoReference (pure, URL grammar only)
// - get_catalog: VideoReference -> title + stream variants
// - open_stream: descriptor -> byte stream
//
// YtDlpCatalog drives `yt-dlp --dump-json` for metadata and fetches the
// chosen direct URL with reqwest.

mod traits;
mod ytdlp;

pub use traits::{ByteStream, StreamCatalog};
pub use ytdlp::{CatalogConfig, YtDlpCatalog};
