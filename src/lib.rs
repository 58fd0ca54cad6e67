//! Streaming fragmented-MP4 to HLS segmenter.
//!
//! Consumes a live MP4 byte stream produced by an upstream capture,
//! restructures it into HLS Version 7 playlists with fMP4 media segments,
//! and exposes optional keyframe diagnostics from ISO/IEC 14496-12 sample
//! flags. Three layers, leaves first:
//!
//! - [`parser`]: a resyncing streaming box parser.
//! - [`keyframe`]: a pure function classifying a `moof`'s leading sample.
//! - [`segment`]: the stateful [`segment::Segmenter`] built on top of both.
//!
//! The upstream byte source, the downstream blob store, configuration
//! loading, and logging sinks are external collaborators (see
//! [`external`] and [`config`]) — this crate consumes those interfaces,
//! it does not implement them.

pub mod clock;
pub mod config;
pub mod error;
pub mod external;
pub mod keyframe;
pub mod parser;
pub mod segment;

pub use clock::{Clock, SystemClock};
pub use config::SegmenterConfig;
pub use error::SegmenterError;
pub use external::BlobStore;
pub use keyframe::KeyframeClassification;
pub use segment::Segmenter;
