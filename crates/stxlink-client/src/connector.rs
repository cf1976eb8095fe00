use std::sync::Arc;

use crate::client::Client;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::handler::{FrameHandler, LogHandler};

/// Connect to a service with default configuration; received frames are logged.
pub async fn connect(host: &str, port: u16) -> Result<Client> {
    connect_with_config(host, port, ClientConfig::default(), LogHandler).await
}

/// Connect with explicit configuration and frame handler.
///
/// Must be called from within a Tokio runtime: the receive loop and the
/// keep-alive loop are spawned onto it before this returns.
pub async fn connect_with_config<H: FrameHandler>(
    host: &str,
    port: u16,
    config: ClientConfig,
    handler: H,
) -> Result<Client> {
    config.validate()?;

    let link = match config.connect_timeout {
        Some(timeout) => stxlink_transport::connect_timeout(host, port, timeout).await?,
        None => stxlink_transport::connect(host, port).await?,
    };

    Ok(Client::start(link, config, Arc::new(handler)))
}
