//! Streaming box parser
//!
//! A resyncing parser that consumes arbitrary byte chunks and emits complete
//! top-level ISO/IEC 14496-12 boxes in source order, regardless of how the
//! input happens to be chunked.

pub mod children;

use crate::error::SegmenterError;
use bytes::{Buf, Bytes, BytesMut};

/// A complete top-level box: its 4-byte type tag, declared size, and the
/// header+payload bytes. `bytes` is an independently owned region — it does
/// not alias the parser's internal buffer, so it stays valid across later
/// `push` calls.
#[derive(Debug, Clone)]
pub struct Mp4Box {
    pub box_type: [u8; 4],
    pub size: u64,
    pub bytes: Bytes,
}

impl Mp4Box {
    pub fn type_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.box_type)
    }
}

/// Resync when the extended size's high 32 bits are non-zero (i.e. the box
/// claims to be 4 GiB or larger) rather than waiting on bytes that will
/// never arrive.
const MAX_EXTENDED_SIZE: u64 = 1 << 32;

/// Streaming, resyncing box parser. See [`BoxParser::push`].
#[derive(Debug, Default)]
pub struct BoxParser {
    buf: BytesMut,
}

impl BoxParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and emit every complete top-level box now discoverable,
    /// in source order, via `on_box`. If `on_box` returns an error it is
    /// propagated immediately, leaving any remaining buffered bytes in place.
    pub fn push<F>(&mut self, chunk: &[u8], mut on_box: F) -> Result<(), SegmenterError>
    where
        F: FnMut(Mp4Box) -> Result<(), SegmenterError>,
    {
        self.buf.extend_from_slice(chunk);

        loop {
            if self.buf.len() < 8 {
                return Ok(());
            }

            let size_field = u32::from_be_bytes(self.buf[0..4].try_into().unwrap());

            let (box_size, header_len): (u64, usize) = match size_field {
                1 => {
                    if self.buf.len() < 16 {
                        return Ok(());
                    }
                    let extended = u64::from_be_bytes(self.buf[8..16].try_into().unwrap());
                    if extended >= MAX_EXTENDED_SIZE {
                        tracing::trace!(extended, "resync: implausible extended box size");
                        self.resync();
                        continue;
                    }
                    (extended, 16)
                }
                0 => {
                    tracing::trace!("resync: size field 0 (to-end-of-file) unsupported in streaming mode");
                    self.resync();
                    continue;
                }
                n => (n as u64, 8),
            };

            if box_size < header_len as u64 {
                tracing::trace!(box_size, header_len, "resync: box size smaller than header");
                self.resync();
                continue;
            }

            if (self.buf.len() as u64) < box_size {
                return Ok(());
            }

            let mut box_type = [0u8; 4];
            box_type.copy_from_slice(&self.buf[4..8]);
            let bytes = self.buf.split_to(box_size as usize).freeze();

            on_box(Mp4Box {
                box_type,
                size: box_size,
                bytes,
            })?;
        }
    }

    /// Discard any buffered incomplete tail.
    pub fn flush(&mut self) {
        self.buf.clear();
    }

    fn resync(&mut self) {
        self.buf.advance(1);
    }
}
