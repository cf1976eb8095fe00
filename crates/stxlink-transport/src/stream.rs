use std::net::SocketAddr;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::error::Result;

/// Read half of a connected link. Owned by exactly one reader.
pub type LinkReadHalf = OwnedReadHalf;

/// Write half of a connected link. Shared writers must guard it with a lock.
pub type LinkWriteHalf = OwnedWriteHalf;

/// A connected stream to the remote service.
///
/// Wraps a TCP stream; the framing layer consumes it through
/// [`LinkStream::into_split`] so the receive loop and the writers never
/// contend for the same handle.
pub struct LinkStream {
    inner: TcpStream,
    peer: SocketAddr,
}

impl LinkStream {
    /// Wrap an already connected TCP stream.
    pub fn from_tcp(inner: TcpStream) -> Result<Self> {
        let peer = inner.peer_addr()?;
        Ok(Self { inner, peer })
    }

    /// Address of the remote end.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Local address of the connection.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.inner.local_addr().map_err(Into::into)
    }

    /// Enable or disable Nagle's algorithm on the underlying socket.
    pub fn set_nodelay(&self, nodelay: bool) -> Result<()> {
        self.inner.set_nodelay(nodelay).map_err(Into::into)
    }

    /// Split into owned read and write halves.
    ///
    /// The socket is closed once both halves are dropped.
    pub fn into_split(self) -> (LinkReadHalf, LinkWriteHalf) {
        self.inner.into_split()
    }

    /// Consume and return the raw TCP stream.
    pub fn into_inner(self) -> TcpStream {
        self.inner
    }
}

impl std::fmt::Debug for LinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkStream")
            .field("type", &"tcp")
            .field("peer", &self.peer)
            .finish()
    }
}
