/// Errors produced while building or decoding ALP data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlpError {
    /// A field value violates its wire constraints.
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// The input ended before a complete structure was read.
    #[error("truncated input ({actual} bytes available, {expected} required)")]
    Truncated { expected: usize, actual: usize },

    /// A length does not fit the compact length operand.
    #[error("length {0} does not fit a length operand")]
    LengthOutOfRange(u64),

    /// The action opcode is outside the supported subset.
    #[error("unsupported ALP operation {0:#04x}")]
    UnsupportedOperation(u8),

    /// The interface id is outside the supported subset.
    #[error("unsupported interface {0:#04x}")]
    UnsupportedInterface(u8),

    /// An enumerated field carries an undefined value.
    #[error("invalid {field} value {value:#04x}")]
    InvalidValue { field: &'static str, value: u8 },
}

pub type Result<T> = std::result::Result<T, AlpError>;

/// Fail with [`AlpError::Truncated`] unless `needed` more bytes are available.
pub(crate) fn ensure_remaining(buf: &impl bytes::Buf, needed: usize) -> Result<()> {
    if buf.remaining() < needed {
        return Err(AlpError::Truncated {
            expected: needed,
            actual: buf.remaining(),
        });
    }
    Ok(())
}
