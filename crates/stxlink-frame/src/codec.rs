use std::ops::Range;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::error::{FrameError, Result};
use crate::header::MessageHeader;

/// Marks the start of a frame (precedes the header text).
pub const START: u8 = 0x01;

/// Divides header text from body text.
pub const DIVIDER: u8 = 0x02;

/// Marks the end of a frame (follows the body text).
pub const END: u8 = 0x03;

/// An empty frame: what the keep-alive task sends and the peer probes with.
pub const KEEP_ALIVE: [u8; 3] = [START, DIVIDER, END];

/// Default ceiling for bytes buffered while waiting for a frame to complete: 16 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Default size of a single stream read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 4096;

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The decoded message header.
    pub header: MessageHeader,
    /// The body text exactly as received. Never interpreted by the codec.
    pub body: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(header: MessageHeader, body: impl Into<Bytes>) -> Self {
        Self {
            header,
            body: body.into(),
        }
    }

    /// The body as UTF-8 text, if it is valid UTF-8.
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// Byte positions of the three sentinels of one frame inside a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpan {
    pub start: usize,
    pub divider: usize,
    pub end: usize,
}

impl FrameSpan {
    /// Header text, strictly between start and divider.
    pub fn header_range(&self) -> Range<usize> {
        self.start + 1..self.divider
    }

    /// Body text, strictly between divider and end.
    pub fn body_range(&self) -> Range<usize> {
        self.divider + 1..self.end
    }

    /// Number of buffer bytes consumed by this frame, including any bytes
    /// that preceded the start sentinel.
    pub fn consumed(&self) -> usize {
        self.end + 1
    }
}

/// Encode header and body text into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬──────────────┬──────┬─────────────┬──────┐
/// │ 0x01 │ header text  │ 0x02 │ body text   │ 0x03 │
/// │ SOH  │ (JSON)       │ STX  │ (opaque)    │ ETX  │
/// └──────┴──────────────┴──────┴─────────────┴──────┘
/// ```
///
/// Neither text may contain a sentinel byte; such input is rejected before
/// anything is written to `dst`.
pub fn encode_frame(header: &[u8], body: &[u8], dst: &mut BytesMut) -> Result<()> {
    check_text("header", header)?;
    check_text("body", body)?;

    dst.reserve(header.len() + body.len() + 3);
    dst.put_u8(START);
    dst.put_slice(header);
    dst.put_u8(DIVIDER);
    dst.put_slice(body);
    dst.put_u8(END);
    Ok(())
}

fn check_text(section: &'static str, text: &[u8]) -> Result<()> {
    match text
        .iter()
        .position(|b| matches!(*b, START | DIVIDER | END))
    {
        Some(position) => Err(FrameError::SentinelInText {
            section,
            byte: text[position],
            position,
        }),
        None => Ok(()),
    }
}

/// Locate the first complete frame in `buf`.
///
/// Searches for the start sentinel, then the divider after it, then the end
/// after the divider. Returns `None` if any of the three is still missing,
/// i.e. the frame is incomplete and more data is needed.
pub fn find_frame(buf: &[u8]) -> Option<FrameSpan> {
    FrameScanner::new().scan(buf)
}

/// Resumable sentinel search over a growing buffer.
///
/// Remembers which sentinels of the pending frame were already found and how
/// far the buffer has been examined, so appending a chunk only costs a scan
/// of the new bytes. Must be reset whenever bytes are removed from the front
/// of the buffer other than through a returned span.
#[derive(Debug, Default, Clone)]
pub struct FrameScanner {
    start: Option<usize>,
    divider: Option<usize>,
    scanned: usize,
}

impl FrameScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue the search where the previous call stopped.
    ///
    /// On success the scanner resets itself, ready for the bytes after
    /// [`FrameSpan::consumed`].
    pub fn scan(&mut self, buf: &[u8]) -> Option<FrameSpan> {
        if self.scanned > buf.len() {
            self.reset();
        }
        let mut from = self.scanned;

        let start = match self.start {
            Some(start) => start,
            None => {
                let start = self.find(buf, from, START)?;
                self.start = Some(start);
                from = start + 1;
                start
            }
        };
        let divider = match self.divider {
            Some(divider) => divider,
            None => {
                let divider = self.find(buf, from, DIVIDER)?;
                self.divider = Some(divider);
                from = divider + 1;
                divider
            }
        };
        let end = self.find(buf, from, END)?;

        self.reset();
        Some(FrameSpan {
            start,
            divider,
            end,
        })
    }

    /// Forget all progress.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn find(&mut self, buf: &[u8], from: usize, byte: u8) -> Option<usize> {
        let found = buf
            .get(from..)
            .and_then(|rest| rest.iter().position(|&b| b == byte))
            .map(|offset| from + offset);
        if found.is_none() {
            self.scanned = buf.len();
        }
        found
    }
}

/// Decode the next frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet; the
/// buffer is then left untouched. Whenever a complete frame is found its bytes
/// are consumed from the buffer, even when the header fails to decode, so the
/// next call resumes after it. Empty frames are consumed and skipped.
pub fn decode_frame(src: &mut BytesMut, max_frame_size: usize) -> Result<Option<Frame>> {
    decode_frame_with(src, &mut FrameScanner::new(), max_frame_size)
}

/// [`decode_frame`] with a scanner that persists across calls on the same
/// buffer, so bytes already examined are not searched again.
pub fn decode_frame_with(
    src: &mut BytesMut,
    scanner: &mut FrameScanner,
    max_frame_size: usize,
) -> Result<Option<Frame>> {
    loop {
        let Some(span) = scanner.scan(src) else {
            if src.len() > max_frame_size {
                return Err(FrameError::FrameTooLarge {
                    size: src.len(),
                    max: max_frame_size,
                });
            }
            return Ok(None); // Need more data
        };

        if span.start > 0 {
            debug!(skipped = span.start, "discarding bytes before frame start");
        }

        let raw = src.split_to(span.consumed()).freeze();
        let header = &raw[span.header_range()];
        let body = raw.slice(span.body_range());

        if header.is_empty() && body.is_empty() {
            trace!("skipping empty frame");
            continue;
        }

        let header = MessageHeader::from_json(header)?;
        return Ok(Some(Frame { header, body }));
    }
}

/// Configuration for frame reading and writing.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum bytes buffered without completing a frame. Default: 16 MiB.
    pub max_frame_size: usize,
    /// Upper bound for a single stream read. Default: 4096.
    pub read_chunk_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}
