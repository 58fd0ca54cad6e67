//! Segmenter module
//!
//! Owns the stateful consumer that turns parsed boxes into an init segment,
//! a sequence of media segments, and a rolling playlist.

pub mod playlist;
pub mod segmenter;

pub use segmenter::Segmenter;
