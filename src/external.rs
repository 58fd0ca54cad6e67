//! External collaborators the segmenter consumes but does not implement:
//! the upstream byte source and the downstream blob store. Both are kept
//! synchronous and runtime-agnostic; a caller embedding this in an async
//! server wraps blocking calls in its own executor's blocking-task pool.

use crate::error::SegmenterError;

/// Destination for init segments, media segments, and playlist text.
/// Single-writer per `stream_id` by convention; the segmenter never issues
/// overlapping writes for one stream.
pub trait BlobStore {
    /// Store the init segment, overwriting any prior one for this stream.
    fn store_init_segment(&mut self, stream_id: u64, bytes: &[u8]) -> Result<(), SegmenterError>;

    /// Store a media segment under `name`. Idempotent: storing the same
    /// name twice with the same bytes must not be treated as an error.
    fn store_segment(
        &mut self,
        stream_id: u64,
        name: &str,
        bytes: &[u8],
    ) -> Result<(), SegmenterError>;

    /// Overwrite the current playlist text for this stream.
    fn update_playlist(&mut self, stream_id: u64, text: &str) -> Result<(), SegmenterError>;
}

/// One event from the upstream byte source.
pub enum SourceEvent {
    /// An opaque chunk of the live MP4 byte stream.
    Data(bytes::Bytes),
    /// Graceful end of stream.
    End,
    /// Fatal upstream failure.
    Error(String),
}
