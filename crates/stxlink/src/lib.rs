//! Async client for a sentinel-delimited header/body framing protocol.
//!
//! Every message is `0x01 <JSON header> 0x02 <body text> 0x03` over TCP, and
//! a bare `0x01 0x02 0x03` doubles as the keep-alive probe.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP connect with address validation and timeouts
//! - [`frame`]: header model, frame codec, stream reader and writer
//! - [`client`]: connection manager with receive and keep-alive loops (behind `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use stxlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use stxlink_frame::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use stxlink_client::*;
}
