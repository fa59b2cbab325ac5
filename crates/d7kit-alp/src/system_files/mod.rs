//! Fixed-layout records stored in modem system files.

use bytes::BytesMut;

use crate::error::Result;

pub mod dll_config;
pub mod firmware_version;

pub use dll_config::DllConfigFile;
pub use firmware_version::FirmwareVersionFile;

/// Length of the device UID stored in [`SystemFileId::Uid`].
pub const UID_LENGTH: usize = 8;

/// Identifiers of the system files d7kit knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SystemFileId {
    Uid = 0x00,
    FirmwareVersion = 0x02,
    DllConfig = 0x0A,
}

impl SystemFileId {
    /// The file id byte.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Look up a known system file by id byte.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0x00 => Some(Self::Uid),
            0x02 => Some(Self::FirmwareVersion),
            0x0A => Some(Self::DllConfig),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Uid => "UID",
            Self::FirmwareVersion => "FIRMWARE_VERSION",
            Self::DllConfig => "DLL_CONFIG",
        }
    }
}

/// A system file with a fixed on-device layout.
pub trait SystemFile: Sized {
    /// Which system file this record lives in.
    const FILE_ID: SystemFileId;
    /// Exact serialized length in bytes.
    const LENGTH: usize;

    /// Append exactly [`Self::LENGTH`] bytes to `dst`.
    fn encode(&self, dst: &mut BytesMut);

    /// Decode from the first [`Self::LENGTH`] bytes of `src`.
    fn parse(src: &[u8]) -> Result<Self>;

    /// Serialize into a fresh buffer.
    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::LENGTH);
        self.encode(&mut buf);
        buf.to_vec()
    }
}
