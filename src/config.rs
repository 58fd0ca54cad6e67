//! Segmenter configuration
//!
//! Loading these values from a file or environment is outside the core's
//! responsibility; callers construct a `SegmenterConfig` however suits their
//! deployment and hand it to a `Segmenter`.

use serde::{Deserialize, Serialize};

/// Tunables for a single segmenter instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Target media-segment duration, in seconds. Also the TARGETDURATION
    /// floor: the playlist never advertises a shorter target than this.
    pub segment_duration_secs: f64,

    /// Sliding playlist window size, in segments.
    pub max_segments: usize,

    /// Store partition this segmenter writes under.
    pub stream_id: u64,

    /// Segment index to start counting from (continuation after a hot
    /// restart). Defaults to 0.
    pub starting_segment_index: u64,

    /// Force a discontinuity marker before the first segment this instance
    /// emits.
    pub pending_discontinuity: bool,

    /// Enable keyframe classification and interval tallying. Off by
    /// default since it costs a `moof` child walk per fragment.
    pub keyframe_debug: bool,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            segment_duration_secs: 6.0,
            max_segments: 10,
            stream_id: 0,
            starting_segment_index: 0,
            pending_discontinuity: false,
            keyframe_debug: false,
        }
    }
}
