use bytes::{BufMut, BytesMut};
use serde::Serialize;

use super::{SystemFile, SystemFileId};
use crate::error::{AlpError, Result};

/// VID value meaning "no virtual id assigned".
pub const VID_UNASSIGNED: u16 = 0xFFFF;

/// The DLL configuration system file: access class the modem scans on,
/// plus its virtual id (big-endian).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DllConfigFile {
    pub active_access_class: u8,
    pub vid: u16,
}

impl DllConfigFile {
    pub fn with_active_access_class(active_access_class: u8) -> Self {
        Self {
            active_access_class,
            ..Self::default()
        }
    }
}

impl Default for DllConfigFile {
    fn default() -> Self {
        Self {
            active_access_class: 0,
            vid: VID_UNASSIGNED,
        }
    }
}

impl SystemFile for DllConfigFile {
    const FILE_ID: SystemFileId = SystemFileId::DllConfig;
    const LENGTH: usize = 3;

    fn encode(&self, dst: &mut BytesMut) {
        dst.put_u8(self.active_access_class);
        dst.put_u16(self.vid);
    }

    fn parse(src: &[u8]) -> Result<Self> {
        if src.len() < Self::LENGTH {
            return Err(AlpError::Truncated {
                expected: Self::LENGTH,
                actual: src.len(),
            });
        }
        Ok(Self {
            active_access_class: src[0],
            vid: u16::from_be_bytes([src[1], src[2]]),
        })
    }
}
