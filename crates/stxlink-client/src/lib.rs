//! Client connection management for stxlink.
//!
//! This is the "just works" layer. Connect to a service, send header/body
//! messages, and receive decoded frames through a [`FrameHandler`] while a
//! background keep-alive holds the connection open.

pub mod client;
pub mod config;
pub mod connector;
pub mod error;
pub mod handler;
mod keepalive;
mod receive;

pub use client::{Client, ConnectionState};
pub use config::{ClientConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_KEEPALIVE_INTERVAL};
pub use connector::{connect, connect_with_config};
pub use error::{ClientError, Result};
pub use handler::{FrameHandler, LogHandler};
pub use tokio_util::sync::CancellationToken;
