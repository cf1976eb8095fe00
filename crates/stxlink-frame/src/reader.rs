use std::io::ErrorKind;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};

use crate::codec::{decode_frame_with, Frame, FrameConfig, FrameScanner, KEEP_ALIVE};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Reads complete frames from any `AsyncRead` stream.
///
/// Owns the reassembly buffer: bytes that do not yet form a complete frame are
/// kept across reads, consumed bytes are dropped as soon as their frame is
/// extracted. Callers always get whole frames.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    scanner: FrameScanner,
    chunk: Vec<u8>,
    config: FrameConfig,
}

impl<T: AsyncRead + Unpin> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            scanner: FrameScanner::new(),
            chunk: vec![0u8; config.read_chunk_size.max(1)],
            config,
        }
    }

    /// Read the next complete frame.
    ///
    /// Returns `Ok(None)` once the peer has closed the stream; a partially
    /// received frame at that point is discarded, never returned.
    ///
    /// A read that delivers exactly `0x01 0x02 0x03` is taken as a keep-alive
    /// probe and dropped before it reaches the buffer. A real frame with an
    /// empty header and body is bit-identical and is dropped the same way.
    ///
    /// [`FrameError::Decode`] is not fatal: the undecodable frame has been
    /// consumed and the next call continues with the bytes after it.
    ///
    /// Cancel safe: dropping the future between reads loses no data.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some(frame) = decode_frame_with(
                &mut self.buf,
                &mut self.scanner,
                self.config.max_frame_size,
            )? {
                return Ok(Some(frame));
            }

            let read = match self.inner.read(&mut self.chunk).await {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                if !self.buf.is_empty() {
                    debug!(
                        pending = self.buf.len(),
                        "stream closed with an incomplete frame buffered"
                    );
                    self.buf.clear();
                    self.scanner.reset();
                }
                return Ok(None);
            }

            let chunk = &self.chunk[..read];
            if chunk == KEEP_ALIVE {
                trace!("keep-alive probe received");
                continue;
            }

            self.buf.extend_from_slice(chunk);
        }
    }

    /// Number of received bytes not yet consumed by a frame.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update the pending-data ceiling for subsequent reads.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.config.max_frame_size = max_frame_size;
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
