use std::io::ErrorKind;

use bytes::BytesMut;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::header::MessageHeader;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete frames to any `AsyncWrite` stream.
///
/// Each frame is encoded into one contiguous buffer and written until every
/// byte has been accepted. The writer is not synchronized: callers sharing a
/// stream must hold a lock across each `send*` call.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: AsyncWrite + Unpin> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete frame.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let header = frame.header.to_json()?;
        self.write_encoded(&header, frame.body.as_ref()).await
    }

    /// Encode and send a header with a pre-serialized text body.
    pub async fn send(&mut self, header: &MessageHeader, body: &str) -> Result<()> {
        let header = header.to_json()?;
        self.write_encoded(&header, body.as_bytes()).await
    }

    /// Encode and send a header with a structured body serialized as JSON.
    pub async fn send_json<B>(&mut self, header: &MessageHeader, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let header = header.to_json()?;
        let body = serde_json::to_vec(body).map_err(FrameError::Encode)?;
        self.write_encoded(&header, &body).await
    }

    /// Send the empty keep-alive frame `0x01 0x02 0x03`.
    pub async fn send_keep_alive(&mut self) -> Result<()> {
        self.write_encoded(b"", b"").await
    }

    async fn write_encoded(&mut self, header: &[u8], body: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(header, body, &mut self.buf)?;
        if self.buf.len() > self.config.max_frame_size {
            return Err(FrameError::OutgoingTooLarge {
                size: self.buf.len(),
                max: self.config.max_frame_size,
            });
        }

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]).await {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush().await
    }

    /// Flush the underlying stream.
    pub async fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush().await {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Shut down the write direction of the underlying stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await.map_err(FrameError::Io)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};

    use bytes::BytesMut;

    use super::*;
    use crate::codec::{decode_frame, KEEP_ALIVE};
    use crate::reader::FrameReader;

    fn production_header() -> MessageHeader {
        MessageHeader::new("u1", "getProduction")
            .with_data_type("JSON")
            .with_receiver("Demo")
            .with_type("subscribe")
    }

    #[tokio::test]
    async fn send_produces_exact_wire_bytes() {
        let mut writer = FrameWriter::new(Vec::<u8>::new());

        writer
            .send(&production_header(), r#"{"pos":0}"#)
            .await
            .unwrap();

        let wire = writer.into_inner();
        let expected = b"\x01{\"UID\":\"u1\",\"name\":\"getProduction\",\"dataType\":\"JSON\",\"receiver\":\"Demo\",\"type\":\"subscribe\",\"dataLen\":0,\"interval\":0}\x02{\"pos\":0}\x03";
        assert_eq!(wire.as_slice(), expected.as_slice());
    }

    #[tokio::test]
    async fn send_json_serializes_body() {
        #[derive(Serialize)]
        struct Position {
            pos: u32,
        }

        let mut writer = FrameWriter::new(Vec::<u8>::new());
        writer
            .send_json(&production_header(), &Position { pos: 7 })
            .await
            .unwrap();

        let mut wire = BytesMut::from(writer.into_inner().as_slice());
        let frame = decode_frame(&mut wire, usize::MAX).unwrap().unwrap();
        assert_eq!(frame.header, production_header());
        assert_eq!(frame.body_text(), Some(r#"{"pos":7}"#));
    }

    #[tokio::test]
    async fn keep_alive_is_three_bytes() {
        let mut writer = FrameWriter::new(Vec::<u8>::new());
        writer.send_keep_alive().await.unwrap();
        assert_eq!(writer.into_inner().as_slice(), &KEEP_ALIVE);
    }

    #[tokio::test]
    async fn write_multiple_frames() {
        let mut writer = FrameWriter::new(Vec::<u8>::new());

        writer.send(&MessageHeader::new("1", "one"), "a").await.unwrap();
        writer.send(&MessageHeader::new("2", "two"), "b").await.unwrap();
        writer
            .write_frame(&Frame::new(MessageHeader::new("3", "three"), "c"))
            .await
            .unwrap();

        let mut wire = BytesMut::from(writer.into_inner().as_slice());
        for (uid, body) in [("1", "a"), ("2", "b"), ("3", "c")] {
            let frame = decode_frame(&mut wire, usize::MAX).unwrap().unwrap();
            assert_eq!(frame.header.uid(), uid);
            assert_eq!(frame.body_text(), Some(body));
        }
        assert!(wire.is_empty());
    }

    #[tokio::test]
    async fn sentinel_in_body_writes_nothing() {
        let mut writer = FrameWriter::new(Vec::<u8>::new());

        let err = writer
            .send(&production_header(), "bad\u{2}body")
            .await
            .unwrap_err();

        assert!(matches!(err, FrameError::SentinelInText { section: "body", .. }));
        assert!(!err.is_fatal());
        assert!(writer.get_ref().is_empty());
    }

    #[tokio::test]
    async fn oversized_frame_writes_nothing() {
        let config = FrameConfig {
            max_frame_size: 64,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Vec::<u8>::new(), config);

        let err = writer
            .send(&production_header(), &"z".repeat(64))
            .await
            .unwrap_err();
        assert!(matches!(err, FrameError::OutgoingTooLarge { max: 64, .. }));
        assert!(!err.is_fatal());
        assert!(writer.get_ref().is_empty());

        writer.send_keep_alive().await.unwrap();
        assert_eq!(writer.get_ref().as_slice(), &KEEP_ALIVE);
    }

    #[tokio::test]
    async fn short_writes_are_completed() {
        let mut writer = FrameWriter::new(TrickleWriter {
            max_per_write: 3,
            data: Vec::new(),
        });

        writer.send(&production_header(), "trickle").await.unwrap();

        let mut reader = FrameReader::new(Cursor::new(writer.into_inner().data));
        let frame = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(frame.header, production_header());
        assert_eq!(frame.body.as_ref(), b"trickle");
    }

    #[tokio::test]
    async fn handles_interrupted_write() {
        let mut expected = BytesMut::new();
        encode_frame(b"", b"", &mut expected).unwrap();
        let mock = tokio_test::io::Builder::new()
            .write_error(std::io::Error::from(ErrorKind::Interrupted))
            .write(&expected)
            .build();

        let mut writer = FrameWriter::new(mock);
        writer.send_keep_alive().await.unwrap();
    }

    #[tokio::test]
    async fn write_error_propagates() {
        let mock = tokio_test::io::Builder::new()
            .write_error(std::io::Error::from(ErrorKind::BrokenPipe))
            .build();

        let mut writer = FrameWriter::new(mock);
        let err = writer.send_keep_alive().await.unwrap_err();
        assert!(matches!(err, FrameError::Io(ref e) if e.kind() == ErrorKind::BrokenPipe));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.send_keep_alive().await.unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[tokio::test]
    async fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink);

        writer.send(&production_header(), "x").await.unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn accessors_and_into_inner() {
        let mut writer = FrameWriter::new(Vec::<u8>::new());

        let _ = writer.get_ref();
        let _ = writer.get_mut();
        assert_eq!(writer.config().read_chunk_size, 4096);
        let _inner = writer.into_inner();
    }

    struct TrickleWriter {
        max_per_write: usize,
        data: Vec<u8>,
    }

    impl AsyncWrite for TrickleWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            let n = buf.len().min(self.max_per_write);
            self.data.extend_from_slice(&buf[..n]);
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl AsyncWrite for FlushTrackingWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            self.data.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            self.flushed.store(true, Ordering::SeqCst);
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    struct ZeroWriter;

    impl AsyncWrite for ZeroWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Ok(0))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }
}
