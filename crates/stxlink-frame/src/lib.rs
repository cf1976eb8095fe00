//! Sentinel-delimited message framing.
//!
//! Every message on the wire is bracketed by three reserved bytes:
//! - `0x01` marks the start of the JSON header
//! - `0x02` divides the header from the body
//! - `0x03` marks the end of the body
//!
//! [`FrameReader`] turns an arbitrarily chunked byte stream back into whole
//! frames; [`FrameWriter`] emits each frame with a single buffered write.

pub mod codec;
pub mod error;
pub mod header;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_frame, decode_frame_with, encode_frame, find_frame, Frame, FrameConfig, FrameScanner,
    FrameSpan, DEFAULT_MAX_FRAME_SIZE, DEFAULT_READ_CHUNK_SIZE, DIVIDER, END, KEEP_ALIVE, START,
};
pub use error::{FrameError, Result};
pub use header::MessageHeader;
pub use reader::FrameReader;
pub use writer::FrameWriter;

use stxlink_transport::LinkStream;

/// Split a connected link into a frame reader and a frame writer.
pub fn split_link(
    link: LinkStream,
    config: FrameConfig,
) -> (
    FrameReader<stxlink_transport::LinkReadHalf>,
    FrameWriter<stxlink_transport::LinkWriteHalf>,
) {
    let (read_half, write_half) = link.into_split();
    (
        FrameReader::with_config(read_half, config.clone()),
        FrameWriter::with_config(write_half, config),
    )
}
