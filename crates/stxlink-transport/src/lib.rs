//! TCP transport for stxlink.
//!
//! This is the lowest layer of stxlink. It resolves a `host:port` pair,
//! connects with an optional timeout, and hands back a [`LinkStream`] that
//! the framing layer splits into independent read and write halves.

pub mod error;
pub mod stream;
pub mod tcp;

pub use error::{Result, TransportError};
pub use stream::{LinkReadHalf, LinkStream, LinkWriteHalf};
pub use tcp::{connect, connect_timeout};
