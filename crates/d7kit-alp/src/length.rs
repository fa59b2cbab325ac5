//! Variable-width length operand.
//!
//! The two most significant bits of the first byte give the number of
//! additional bytes (0-3); the remaining 6 + 8·n bits hold the value,
//! most significant byte first.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{ensure_remaining, AlpError, Result};

/// Largest value a length operand can carry.
pub const MAX_LENGTH: u32 = (1 << 30) - 1;

/// Number of bytes `value` occupies when encoded.
pub fn encoded_len(value: u32) -> Result<usize> {
    match value {
        0..=0x3F => Ok(1),
        0x40..=0x3FFF => Ok(2),
        0x4000..=0x3F_FFFF => Ok(3),
        0x40_0000..=MAX_LENGTH => Ok(4),
        _ => Err(AlpError::LengthOutOfRange(value as u64)),
    }
}

/// Append the length operand for `value`.
pub fn encode_length(value: u32, dst: &mut BytesMut) -> Result<()> {
    let size = encoded_len(value)?;
    let extra = (size - 1) as u32;
    let first = ((extra << 6) as u8) | ((value >> (8 * extra)) as u8 & 0x3F);
    dst.put_u8(first);
    for shift in (0..extra).rev() {
        dst.put_u8((value >> (8 * shift)) as u8);
    }
    Ok(())
}

/// Read a length operand from the front of `src`.
pub fn decode_length(src: &mut impl Buf) -> Result<u32> {
    ensure_remaining(src, 1)?;
    let first = src.get_u8();
    let extra = (first >> 6) as usize;
    ensure_remaining(src, extra)?;

    let mut value = (first & 0x3F) as u32;
    for _ in 0..extra {
        value = (value << 8) | src.get_u8() as u32;
    }
    Ok(value)
}
