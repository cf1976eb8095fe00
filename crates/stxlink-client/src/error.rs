/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The connection could not be established.
    #[error("connect failed: {0}")]
    Connect(#[from] stxlink_transport::TransportError),

    /// The client configuration is unusable.
    #[error("invalid client config: {0}")]
    InvalidConfig(String),

    /// The client is not (or no longer) connected.
    #[error("not connected")]
    NotConnected,

    /// The caller's cancellation token fired before the send completed.
    #[error("send cancelled")]
    Cancelled,

    /// Frame-level error while encoding or writing.
    #[error("frame error: {0}")]
    Frame(#[from] stxlink_frame::FrameError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
