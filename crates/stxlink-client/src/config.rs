use std::time::Duration;

use stxlink_frame::FrameConfig;

use crate::error::{ClientError, Result};

/// Period between keep-alive probes.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);

/// Upper bound for resolving and connecting.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime configuration for a client connection.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Period between keep-alive frames. Must be non-zero.
    pub keepalive_interval: Duration,
    /// Connect deadline. `None` waits for the OS connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Framing limits for both directions.
    pub frame: FrameConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            frame: FrameConfig::default(),
        }
    }
}

impl ClientConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.keepalive_interval.is_zero() {
            return Err(ClientError::InvalidConfig(
                "keepalive_interval must be greater than zero".to_string(),
            ));
        }
        if self.frame.read_chunk_size == 0 {
            return Err(ClientError::InvalidConfig(
                "frame.read_chunk_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
