/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A complete frame arrived but its header is not a valid message header.
    ///
    /// The offending frame has already been consumed; reading can continue.
    #[error("undecodable frame header: {0}")]
    Decode(#[source] serde_json::Error),

    /// A header or structured body could not be serialized.
    #[error("frame encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Header or body text contains a reserved sentinel byte and would
    /// corrupt framing.
    #[error("{section} contains sentinel byte {byte:#04x} at offset {position}")]
    SentinelInText {
        section: &'static str,
        byte: u8,
        position: usize,
    },

    /// Buffered data exceeded the configured maximum without forming a frame.
    #[error("frame too large ({size} bytes pending, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// An outgoing frame would exceed the configured maximum; nothing was written.
    #[error("outgoing frame of {size} bytes exceeds max {max}")]
    OutgoingTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream stopped accepting bytes in the middle of a frame write.
    #[error("connection closed (incomplete frame write)")]
    ConnectionClosed,
}

impl FrameError {
    /// Whether the stream can no longer be read or written after this error.
    ///
    /// A header decode failure drops only the bad frame, and encode-side
    /// rejections happen before any byte is written.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FrameError::Io(_) | FrameError::ConnectionClosed | FrameError::FrameTooLarge { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
