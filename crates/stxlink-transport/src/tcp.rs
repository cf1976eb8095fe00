use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{lookup_host, TcpStream};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::LinkStream;

/// Connect to `host:port` without a deadline.
pub async fn connect(host: &str, port: u16) -> Result<LinkStream> {
    connect_inner(host, port).await
}

/// Connect to `host:port`, failing with [`TransportError::Timeout`] if the
/// whole resolve-and-connect sequence takes longer than `timeout`.
pub async fn connect_timeout(host: &str, port: u16, timeout: Duration) -> Result<LinkStream> {
    match tokio::time::timeout(timeout, connect_inner(host, port)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout {
            addr: display_addr(host, port),
            timeout,
        }),
    }
}

async fn connect_inner(host: &str, port: u16) -> Result<LinkStream> {
    let candidates = resolve(host, port).await?;
    let addr = display_addr(host, port);

    let mut last_err = None;
    for candidate in candidates {
        match TcpStream::connect(candidate).await {
            Ok(stream) => {
                let link = LinkStream::from_tcp(stream)?;
                link.set_nodelay(true)?;
                info!(peer = %link.peer_addr(), "connected");
                return Ok(link);
            }
            Err(err) => {
                debug!(%candidate, error = %err, "connect attempt failed");
                last_err = Some(err);
            }
        }
    }

    Err(TransportError::Connect {
        addr,
        source: last_err.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "no address to connect to")
        }),
    })
}

async fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let host = host.trim();
    if host.is_empty() {
        return Err(TransportError::InvalidAddress {
            addr: display_addr(host, port),
            reason: "host must not be empty".to_string(),
        });
    }
    if port == 0 {
        return Err(TransportError::InvalidAddress {
            addr: display_addr(host, port),
            reason: "port must be greater than zero".to_string(),
        });
    }

    let resolved: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|err| TransportError::InvalidAddress {
            addr: display_addr(host, port),
            reason: err.to_string(),
        })?
        .collect();

    if resolved.is_empty() {
        return Err(TransportError::InvalidAddress {
            addr: display_addr(host, port),
            reason: "host resolved to no addresses".to_string(),
        });
    }
    Ok(resolved)
}

fn display_addr(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
