//! The segmenter state machine (§4.4)
//!
//! Consumes parsed boxes, assembles the init segment and media segments,
//! and drives the rolling playlist. One `Segmenter` owns one stream; it is
//! driven from a single task (§5) and is not internally synchronized.

use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;

use crate::clock::Clock;
use crate::config::SegmenterConfig;
use crate::error::SegmenterError;
use crate::external::{BlobStore, SourceEvent};
use crate::keyframe::stats::{KeyframeStats, KeyframeTally};
use crate::keyframe::{detect_moof_keyframe, KeyframeClassification};
use crate::parser::{BoxParser, Mp4Box};

use super::playlist;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    PreInit,
    Init,
    Stopped,
}

/// Streaming fMP4-to-HLS segmenter for one stream.
pub struct Segmenter<S: BlobStore, C: Clock> {
    config: SegmenterConfig,
    store: S,
    clock: C,
    parser: BoxParser,

    has_init: bool,
    init_boxes: Vec<Bytes>,
    fragment_buffer: Vec<Bytes>,
    first_segment_emitted: bool,
    segment_start_time_ms: u64,
    segment_index: u64,
    segment_durations: BTreeMap<u64, f64>,
    discontinuity_indices: BTreeSet<u64>,
    pending_discontinuity: bool,
    stopped: bool,
    segment_first_moof_checked: bool,
    keyframe_tally: KeyframeTally,

    on_stop: Option<Box<dyn FnMut() + Send>>,
    on_error: Option<Box<dyn FnMut(&SegmenterError) + Send>>,
}

impl<S: BlobStore, C: Clock> Segmenter<S, C> {
    pub fn new(config: SegmenterConfig, store: S, clock: C) -> Self {
        let segment_index = config.starting_segment_index;
        let pending_discontinuity = config.pending_discontinuity;
        let now = clock.now_ms();
        Self {
            config,
            store,
            clock,
            parser: BoxParser::new(),
            has_init: false,
            init_boxes: Vec::new(),
            fragment_buffer: Vec::new(),
            first_segment_emitted: false,
            segment_start_time_ms: now,
            segment_index,
            segment_durations: BTreeMap::new(),
            discontinuity_indices: BTreeSet::new(),
            pending_discontinuity,
            stopped: false,
            segment_first_moof_checked: false,
            keyframe_tally: KeyframeTally::new(),
            on_stop: None,
            on_error: None,
        }
    }

    pub fn on_stop<F: FnMut() + Send + 'static>(mut self, f: F) -> Self {
        self.on_stop = Some(Box::new(f));
        self
    }

    pub fn on_error<F: FnMut(&SegmenterError) + Send + 'static>(mut self, f: F) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    fn state(&self) -> State {
        if self.stopped {
            State::Stopped
        } else if self.has_init {
            State::Init
        } else {
            State::PreInit
        }
    }

    /// `onData`: push a chunk of upstream bytes into the parser and dispatch
    /// every box discovered. Boxes are collected before dispatch rather than
    /// dispatched from inside the parser's callback, since dispatch needs
    /// `&mut self` and the parser is itself a field of `self`.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), SegmenterError> {
        if self.state() == State::Stopped {
            return Ok(());
        }

        let mut boxes = Vec::new();
        self.parser.push(chunk, |b| {
            boxes.push(b);
            Ok(())
        })?;

        for b in boxes {
            if let Err(e) = self.dispatch_box(b) {
                return self.fail(e);
            }
        }
        Ok(())
    }

    /// The upstream source reported a fatal error.
    pub fn report_upstream_error(&mut self, message: impl Into<String>) -> Result<(), SegmenterError> {
        if self.state() == State::Stopped {
            return Ok(());
        }
        self.fail(SegmenterError::Upstream(message.into()))
    }

    /// `pipe(source)`: drive this segmenter from a single upstream event,
    /// dispatching to `feed`/`end`/`report_upstream_error` as appropriate.
    pub fn handle_event(&mut self, event: SourceEvent) -> Result<(), SegmenterError> {
        match event {
            SourceEvent::Data(bytes) => self.feed(&bytes),
            SourceEvent::End => self.end(),
            SourceEvent::Error(message) => self.report_upstream_error(message),
        }
    }

    /// `onEnd`: flush any buffered fragment as a final segment, mark
    /// stopped, and fire `onStop`. A failure while flushing the final
    /// segment is treated as `onError` instead, per the `CallbackError`
    /// taxonomy.
    pub fn end(&mut self) -> Result<(), SegmenterError> {
        if self.state() == State::Stopped {
            return Ok(());
        }
        if !self.fragment_buffer.is_empty() {
            if let Err(e) = self.output_segment() {
                return self.fail(e);
            }
        }
        self.stopped = true;
        self.parser.flush();
        if let Some(cb) = &mut self.on_stop {
            cb();
        }
        Ok(())
    }

    /// `stop()`: detach, discard the parser's incomplete tail, mark
    /// stopped. Idempotent; does not flush the fragment buffer.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.parser.flush();
    }

    /// Flush the current buffer as a short segment, then arm a
    /// discontinuity marker for the next segment emitted.
    pub fn mark_discontinuity(&mut self) -> Result<(), SegmenterError> {
        if self.state() == State::Stopped {
            return Ok(());
        }
        if let Err(e) = self.output_segment() {
            return self.fail(e);
        }
        self.pending_discontinuity = true;
        Ok(())
    }

    pub fn segment_index(&self) -> u64 {
        self.segment_index
    }

    pub fn keyframe_stats(&self) -> KeyframeStats {
        self.keyframe_tally.snapshot()
    }

    fn fail(&mut self, e: SegmenterError) -> Result<(), SegmenterError> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        self.parser.flush();
        tracing::error!(stream_id = self.config.stream_id, error = %e, "segmenter terminated");
        if let Some(cb) = &mut self.on_error {
            cb(&e);
        }
        Err(e)
    }

    fn dispatch_box(&mut self, b: Mp4Box) -> Result<(), SegmenterError> {
        if self.stopped {
            return Ok(());
        }

        if !self.has_init {
            match &b.box_type {
                b"ftyp" => {
                    self.init_boxes.push(b.bytes);
                }
                b"moov" => {
                    self.init_boxes.push(b.bytes);
                    self.complete_init()?;
                }
                _ => {} // discard anything else before init completes
            }
            return Ok(());
        }

        match &b.box_type {
            b"moof" => self.handle_moof(b)?,
            b"mdat" => self.fragment_buffer.push(b.bytes),
            // A moov/ftyp arriving after init is established is ignored:
            // see the design note on mid-stream codec-change moovs.
            b"ftyp" | b"moov" => {}
            _ => self.fragment_buffer.push(b.bytes), // pass-through: styp, sidx, ...
        }
        Ok(())
    }

    fn complete_init(&mut self) -> Result<(), SegmenterError> {
        let total: usize = self.init_boxes.iter().map(|b| b.len()).sum();
        let mut buf = Vec::with_capacity(total);
        for b in &self.init_boxes {
            buf.extend_from_slice(b);
        }
        self.store.store_init_segment(self.config.stream_id, &buf)?;
        self.has_init = true;
        tracing::debug!(stream_id = self.config.stream_id, bytes = buf.len(), "init segment stored");
        Ok(())
    }

    fn handle_moof(&mut self, b: Mp4Box) -> Result<(), SegmenterError> {
        if !self.fragment_buffer.is_empty() {
            let should_emit = if !self.first_segment_emitted {
                true // fast-first-segment: minimize time-to-first-frame
            } else {
                let now = self.clock.now_ms();
                let elapsed = now.saturating_sub(self.segment_start_time_ms) as f64;
                elapsed >= self.config.segment_duration_secs * 1000.0
            };
            if should_emit {
                self.output_segment()?;
            }
        }

        if self.config.keyframe_debug {
            let classification = std::panic::catch_unwind(|| detect_moof_keyframe(&b.bytes))
                .unwrap_or(KeyframeClassification::Indeterminate);
            let first_of_segment = !self.segment_first_moof_checked;
            self.segment_first_moof_checked = true;
            let now = self.clock.now_ms();
            self.keyframe_tally.record(classification, now, first_of_segment);
        }

        self.fragment_buffer.push(b.bytes);
        Ok(())
    }

    fn output_segment(&mut self) -> Result<(), SegmenterError> {
        if self.fragment_buffer.is_empty() {
            return Ok(());
        }

        if self.pending_discontinuity {
            self.discontinuity_indices.insert(self.segment_index);
            self.pending_discontinuity = false;
        }

        let now = self.clock.now_ms();
        let duration = ((now.saturating_sub(self.segment_start_time_ms)) as f64 / 1000.0).max(0.1);
        self.segment_durations.insert(self.segment_index, duration);

        let total: usize = self.fragment_buffer.iter().map(|b| b.len()).sum();
        let mut buf = Vec::with_capacity(total);
        for b in &self.fragment_buffer {
            buf.extend_from_slice(b);
        }
        let name = format!("segment{}.m4s", self.segment_index);
        self.store.store_segment(self.config.stream_id, &name, &buf)?;
        tracing::debug!(
            stream_id = self.config.stream_id,
            index = self.segment_index,
            duration,
            "segment emitted"
        );

        self.segment_index += 1;
        self.first_segment_emitted = true;

        let floor = self.segment_index.saturating_sub(self.config.max_segments as u64);
        self.segment_durations.retain(|&i, _| i >= floor && i < self.segment_index);
        self.discontinuity_indices.retain(|&i| i >= floor && i < self.segment_index);

        self.fragment_buffer.clear();
        self.segment_first_moof_checked = false;
        self.segment_start_time_ms = now;

        let text = playlist::generate_playlist(
            self.segment_index,
            self.config.max_segments,
            self.config.segment_duration_secs,
            &self.segment_durations,
            &self.discontinuity_indices,
        );
        self.store.update_playlist(self.config.stream_id, &text)?;

        Ok(())
    }
}
