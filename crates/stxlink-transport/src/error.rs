use std::time::Duration;

/// Errors that can occur while establishing or using a TCP transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The host/port pair cannot be turned into a socket address.
    #[error("invalid address {addr}: {reason}")]
    InvalidAddress { addr: String, reason: String },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// The connect attempt did not finish in time.
    #[error("connect to {addr} timed out after {timeout:?}")]
    Timeout { addr: String, timeout: Duration },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
