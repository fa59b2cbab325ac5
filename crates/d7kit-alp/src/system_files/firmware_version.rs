use std::fmt;

use bytes::{BufMut, BytesMut};
use serde::Serialize;

use super::{SystemFile, SystemFileId};
use crate::error::{AlpError, Result};

/// Width of the application name field on the wire.
pub const APPLICATION_NAME_LEN: usize = 6;
/// Width of the short git commit hash field on the wire.
pub const GIT_SHA1_LEN: usize = 7;
/// Fill byte written after fields shorter than their wire width.
///
/// What the firmware itself puts in the unused bytes is not known, so this
/// is a placeholder: parse never interprets it and hands it back verbatim.
pub const PADDING: u8 = 0x00;

/// The firmware version system file.
///
/// ```text
/// ┌───────────────────────┬──────────────────────────┐
/// │ application_name (6B) │ git_sha1 (7B)            │
/// │ ASCII, unterminated   │ ASCII, unterminated      │
/// └───────────────────────┴──────────────────────────┘
/// ```
///
/// Parse always takes six bytes as the name and seven as the hash, with no
/// trimming. Serialize fills short fields with [`PADDING`], so a short name
/// does not survive a round trip unchanged: `"app"` comes back as
/// `"app\0\0\0"`. Full-width fields round-trip exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FirmwareVersionFile {
    application_name: String,
    git_sha1: String,
}

impl FirmwareVersionFile {
    /// Build a record, validating both fields against their wire widths.
    ///
    /// Fails with [`AlpError::InvalidField`] if either field is longer than
    /// its width or is not ASCII. Names are never truncated.
    pub fn new(application_name: impl Into<String>, git_sha1: impl Into<String>) -> Result<Self> {
        let application_name = application_name.into();
        let git_sha1 = git_sha1.into();
        validate_field("application_name", &application_name, APPLICATION_NAME_LEN)?;
        validate_field("git_sha1", &git_sha1, GIT_SHA1_LEN)?;
        Ok(Self {
            application_name,
            git_sha1,
        })
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    pub fn git_sha1(&self) -> &str {
        &self.git_sha1
    }
}

impl SystemFile for FirmwareVersionFile {
    const FILE_ID: SystemFileId = SystemFileId::FirmwareVersion;
    const LENGTH: usize = APPLICATION_NAME_LEN + GIT_SHA1_LEN;

    fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(Self::LENGTH);
        put_padded(dst, &self.application_name, APPLICATION_NAME_LEN);
        put_padded(dst, &self.git_sha1, GIT_SHA1_LEN);
    }

    fn parse(src: &[u8]) -> Result<Self> {
        if src.len() < Self::LENGTH {
            return Err(AlpError::Truncated {
                expected: Self::LENGTH,
                actual: src.len(),
            });
        }
        let (name, rest) = src.split_at(APPLICATION_NAME_LEN);
        Ok(Self {
            application_name: read_field("application_name", name)?,
            git_sha1: read_field("git_sha1", &rest[..GIT_SHA1_LEN])?,
        })
    }
}

impl fmt::Display for FirmwareVersionFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.application_name, self.git_sha1)
    }
}

fn validate_field(field: &'static str, value: &str, width: usize) -> Result<()> {
    let invalid = |reason: String| AlpError::InvalidField { field, reason };
    if !value.is_ascii() {
        return Err(invalid("must be ASCII".to_string()));
    }
    if value.len() > width {
        return Err(invalid(format!(
            "{} bytes exceeds the {width}-byte field",
            value.len()
        )));
    }
    Ok(())
}

fn put_padded(dst: &mut BytesMut, value: &str, width: usize) {
    dst.put_slice(value.as_bytes());
    dst.put_bytes(PADDING, width - value.len());
}

fn read_field(field: &'static str, raw: &[u8]) -> Result<String> {
    if !raw.is_ascii() {
        return Err(AlpError::InvalidField {
            field,
            reason: "contains non-ASCII bytes".to_string(),
        });
    }
    Ok(raw.iter().map(|&b| b as char).collect())
}
