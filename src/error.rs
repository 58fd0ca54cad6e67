use thiserror::Error;

/// Top-level error type for the segmenter pipeline.
///
/// `MalformedBox` and `MalformedSampleFlags` from the box-parsing and
/// keyframe-analysis layers are deliberately absent here: both are handled
/// internally (byte-level resync, indeterminate classification) and never
/// escape as errors.
#[derive(Error, Debug)]
pub enum SegmenterError {
    /// The upstream byte source reported a fatal error. Terminal.
    #[error("upstream source error: {0}")]
    Upstream(String),

    /// The box parser raised an internal failure distinct from a benign
    /// resync (e.g. the box callback itself failed). Terminal.
    #[error("parse error: {0}")]
    Parse(String),

    /// A downstream store write (init segment, media segment, or playlist)
    /// failed. Terminal.
    #[error("callback error: {0}")]
    Callback(String),
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, SegmenterError>;
