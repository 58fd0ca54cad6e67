//! Keyframe interval tallying (§4.5)
//!
//! Updated once per processed `moof` when keyframe-debug is enabled.

use super::KeyframeClassification;

/// Snapshot returned by `Segmenter::keyframe_stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KeyframeStats {
    pub keyframe_count: u64,
    pub non_keyframe_count: u64,
    pub indeterminate_count: u64,
    pub segments_without_leading_keyframe: u64,
    pub min_keyframe_interval_ms: u64,
    pub max_keyframe_interval_ms: u64,
    pub average_keyframe_interval_ms: f64,
}

/// Running accumulator behind a `KeyframeStats` snapshot.
#[derive(Debug, Default)]
pub struct KeyframeTally {
    keyframe_count: u64,
    non_keyframe_count: u64,
    indeterminate_count: u64,
    segments_without_leading_keyframe: u64,
    last_keyframe_time_ms: Option<u64>,
    interval_count: u64,
    min_interval_ms: u64,
    max_interval_ms: u64,
    total_interval_ms: u64,
}

impl KeyframeTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one classified `moof`. `first_moof_of_segment` gates the
    /// leading-keyframe tally and must be cleared by the caller once per
    /// segment (the segmenter resets it in `outputSegment`).
    pub fn record(
        &mut self,
        classification: KeyframeClassification,
        now_ms: u64,
        first_moof_of_segment: bool,
    ) {
        match classification {
            KeyframeClassification::Keyframe => {
                self.keyframe_count += 1;
                if let Some(last) = self.last_keyframe_time_ms {
                    let delta = now_ms.saturating_sub(last);
                    if self.interval_count == 0 {
                        self.min_interval_ms = delta;
                        self.max_interval_ms = delta;
                    } else {
                        self.min_interval_ms = self.min_interval_ms.min(delta);
                        self.max_interval_ms = self.max_interval_ms.max(delta);
                    }
                    self.total_interval_ms += delta;
                    self.interval_count += 1;
                }
                self.last_keyframe_time_ms = Some(now_ms);
            }
            KeyframeClassification::NonKeyframe => self.non_keyframe_count += 1,
            KeyframeClassification::Indeterminate => self.indeterminate_count += 1,
        }

        if first_moof_of_segment && classification != KeyframeClassification::Keyframe {
            self.segments_without_leading_keyframe += 1;
        }
    }

    pub fn snapshot(&self) -> KeyframeStats {
        let (min, max, avg) = if self.keyframe_count >= 2 {
            let avg = self.total_interval_ms as f64 / (self.keyframe_count - 1) as f64;
            (self.min_interval_ms, self.max_interval_ms, avg)
        } else {
            (0, 0, 0.0)
        };

        KeyframeStats {
            keyframe_count: self.keyframe_count,
            non_keyframe_count: self.non_keyframe_count,
            indeterminate_count: self.indeterminate_count,
            segments_without_leading_keyframe: self.segments_without_leading_keyframe,
            min_keyframe_interval_ms: min,
            max_keyframe_interval_ms: max,
            average_keyframe_interval_ms: avg,
        }
    }
}
