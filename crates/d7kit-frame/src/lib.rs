//! Serial interface framing for D7 modems.
//!
//! Every message exchanged with the modem over its serial interface is
//! framed with:
//! - A sync byte (`0xC0`) for stream synchronization
//! - A protocol version byte
//! - A rolling frame counter
//! - A message type (ALP data, ping, logging, ...)
//! - A 1-byte payload length
//!
//! Garbage on the line before a sync byte is skipped; callers always get
//! complete frames.

pub mod codec;
pub mod error;
pub mod message_type;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE, SYNC_BYTE,
    VERSION,
};
pub use error::{FrameError, Result};
pub use message_type::{ALP_DATA, LOGGING, PING_REQUEST, PING_RESPONSE, REBOOTED};
pub use reader::FrameReader;
pub use writer::FrameWriter;
