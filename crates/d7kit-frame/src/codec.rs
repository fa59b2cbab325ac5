use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::error::{FrameError, Result};

/// Frame header: sync (1) + version (1) + counter (1) + type (1) + length (1).
pub const HEADER_SIZE: usize = 5;

/// Start-of-frame marker.
pub const SYNC_BYTE: u8 = 0xC0;

/// Serial interface protocol version spoken by this codec.
pub const VERSION: u8 = 0x00;

/// Largest payload a 1-byte length field can describe.
pub const DEFAULT_MAX_PAYLOAD: usize = u8::MAX as usize;

/// A framed modem message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message type (see [`crate::message_type`]).
    pub msg_type: u8,
    /// Sender's rolling frame counter.
    pub counter: u8,
    /// The message payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame with a zero counter.
    pub fn new(msg_type: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            msg_type,
            counter: 0,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬─────────┬─────────┬──────────┬────────┬─────────────────┐
/// │ Sync │ Version │ Counter │ Msg type │ Length │ Payload         │
/// │ 0xC0 │ 0x00    │ (1B)    │ (1B)     │ (1B)   │ (Length bytes)  │
/// └──────┴─────────┴─────────┴──────────┴────────┴─────────────────┘
/// ```
pub fn encode_frame(msg_type: u8, counter: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > DEFAULT_MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: DEFAULT_MAX_PAYLOAD,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u8(SYNC_BYTE);
    dst.put_u8(VERSION);
    dst.put_u8(counter);
    dst.put_u8(msg_type);
    dst.put_u8(payload.len() as u8);
    dst.put_slice(payload);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Bytes before the first sync byte are discarded. Returns `Ok(None)` if the
/// buffer doesn't contain a complete frame yet. On success, consumes the
/// frame bytes from the buffer. On an unsupported version or an oversized
/// length only the sync byte is consumed, so a later call resynchronizes on
/// the next one.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    match src.iter().position(|&b| b == SYNC_BYTE) {
        Some(0) => {}
        Some(skip) => {
            debug!(skipped = skip, "discarding bytes before sync");
            src.advance(skip);
        }
        None => {
            if !src.is_empty() {
                debug!(skipped = src.len(), "discarding bytes without sync");
                src.clear();
            }
            return Ok(None);
        }
    }

    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    if src[1] != VERSION {
        let version = src[1];
        src.advance(1);
        return Err(FrameError::UnsupportedVersion(version));
    }

    let counter = src[2];
    let msg_type = src[3];
    let payload_len = src[4] as usize;

    if payload_len > max_payload {
        src.advance(1);
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Frame {
        msg_type,
        counter,
        payload,
    }))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 255.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
