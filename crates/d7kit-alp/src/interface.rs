//! Interface configuration carried by a forward action.
//!
//! Only the byte layout is modelled here. What an access class or response
//! mode means on air is the modem's business.

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{ensure_remaining, AlpError, Result};
use crate::system_files::UID_LENGTH;

/// Interfaces an ALP command can be forwarded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InterfaceType {
    Host = 0x00,
    Serial = 0x01,
    D7asp = 0xD7,
}

impl InterfaceType {
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0x00 => Ok(Self::Host),
            0x01 => Ok(Self::Serial),
            0xD7 => Ok(Self::D7asp),
            other => Err(AlpError::UnsupportedInterface(other)),
        }
    }
}

/// D7ASP response mode (low three bits of the QoS byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseMode {
    No = 0,
    All = 1,
    Any = 2,
    NoRepeat = 4,
    OnError = 5,
    Preferred = 6,
}

impl ResponseMode {
    fn from_bits(bits: u8) -> Result<Self> {
        match bits {
            0 => Ok(Self::No),
            1 => Ok(Self::All),
            2 => Ok(Self::Any),
            4 => Ok(Self::NoRepeat),
            5 => Ok(Self::OnError),
            6 => Ok(Self::Preferred),
            value => Err(AlpError::InvalidValue {
                field: "response_mode",
                value,
            }),
        }
    }
}

/// Quality-of-service byte of a D7ASP configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QoS {
    pub response_mode: ResponseMode,
    /// Retry mode (bits 3-5). Only the default, 0, is defined.
    pub retry_mode: u8,
    pub record: bool,
    pub stop_on_error: bool,
}

impl QoS {
    pub fn new(response_mode: ResponseMode) -> Self {
        Self {
            response_mode,
            retry_mode: 0,
            record: false,
            stop_on_error: false,
        }
    }

    fn to_byte(self) -> u8 {
        (u8::from(self.stop_on_error) << 7)
            | (u8::from(self.record) << 6)
            | ((self.retry_mode & 0x07) << 3)
            | self.response_mode as u8
    }

    fn from_byte(byte: u8) -> Result<Self> {
        Ok(Self {
            response_mode: ResponseMode::from_bits(byte & 0x07)?,
            retry_mode: (byte >> 3) & 0x07,
            record: byte & 0x40 != 0,
            stop_on_error: byte & 0x80 != 0,
        })
    }
}

/// How the addressee is identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IdType {
    /// Number of broadcast ids: the id is a 1-byte estimate of responders.
    Nbid = 0,
    /// No id: plain broadcast.
    Noid = 1,
    /// 8-byte device UID.
    Uid = 2,
    /// 2-byte virtual id.
    Vid = 3,
}

impl IdType {
    /// Number of id bytes following the access class.
    pub fn id_length(self) -> usize {
        match self {
            IdType::Nbid => 1,
            IdType::Noid => 0,
            IdType::Uid => UID_LENGTH,
            IdType::Vid => 2,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => IdType::Nbid,
            1 => IdType::Noid,
            2 => IdType::Uid,
            _ => IdType::Vid,
        }
    }
}

/// Target of a D7ASP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addressee {
    pub access_class: u8,
    pub id_type: IdType,
    id: Vec<u8>,
}

impl Addressee {
    /// Build an addressee; `id` must match the length `id_type` implies.
    pub fn new(access_class: u8, id_type: IdType, id: impl Into<Vec<u8>>) -> Result<Self> {
        let id = id.into();
        if id.len() != id_type.id_length() {
            return Err(AlpError::InvalidField {
                field: "addressee id",
                reason: format!(
                    "{:?} requires {} bytes, got {}",
                    id_type,
                    id_type.id_length(),
                    id.len()
                ),
            });
        }
        Ok(Self {
            access_class,
            id_type,
            id,
        })
    }

    /// Everyone listening on `access_class`.
    pub fn broadcast(access_class: u8) -> Self {
        Self {
            access_class,
            id_type: IdType::Noid,
            id: Vec::new(),
        }
    }

    /// A single device by UID.
    pub fn unicast(access_class: u8, uid: [u8; UID_LENGTH]) -> Self {
        Self {
            access_class,
            id_type: IdType::Uid,
            id: uid.to_vec(),
        }
    }

    pub fn id(&self) -> &[u8] {
        &self.id
    }

    fn encode(&self, dst: &mut BytesMut) {
        // Low nibble is the NLS method; security is not supported.
        dst.put_u8((self.id_type as u8) << 4);
        dst.put_u8(self.access_class);
        dst.put_slice(&self.id);
    }

    fn parse(src: &mut impl Buf) -> Result<Self> {
        ensure_remaining(src, 2)?;
        let control = src.get_u8();
        let access_class = src.get_u8();
        let id_type = IdType::from_bits(control >> 4);
        let nls_method = control & 0x0F;
        if nls_method != 0 {
            return Err(AlpError::InvalidValue {
                field: "nls_method",
                value: nls_method,
            });
        }
        ensure_remaining(src, id_type.id_length())?;
        let mut id = vec![0u8; id_type.id_length()];
        src.copy_to_slice(&mut id);
        Ok(Self {
            access_class,
            id_type,
            id,
        })
    }
}

/// Session configuration for the D7ASP interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct D7aspConfiguration {
    pub qos: QoS,
    /// Compressed-time dormant session timeout; 0 for none.
    pub dormant_timeout: u8,
    pub addressee: Addressee,
}

impl D7aspConfiguration {
    pub fn new(qos: QoS, addressee: Addressee) -> Self {
        Self {
            qos,
            dormant_timeout: 0,
            addressee,
        }
    }
}

impl fmt::Display for D7aspConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "qos={:?} access_class={} id_type={:?}",
            self.qos.response_mode, self.addressee.access_class, self.addressee.id_type
        )?;
        if !self.addressee.id.is_empty() {
            write!(f, " id=")?;
            for b in &self.addressee.id {
                write!(f, "{b:02x}")?;
            }
        }
        Ok(())
    }
}

/// Operand of a forward action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceConfiguration {
    Host,
    Serial,
    D7asp(D7aspConfiguration),
}

impl InterfaceConfiguration {
    pub fn interface_type(&self) -> InterfaceType {
        match self {
            Self::Host => InterfaceType::Host,
            Self::Serial => InterfaceType::Serial,
            Self::D7asp(_) => InterfaceType::D7asp,
        }
    }

    pub(crate) fn encode(&self, dst: &mut BytesMut) {
        dst.put_u8(self.interface_type() as u8);
        if let Self::D7asp(config) = self {
            dst.put_u8(config.qos.to_byte());
            dst.put_u8(config.dormant_timeout);
            config.addressee.encode(dst);
        }
    }

    pub(crate) fn parse(src: &mut impl Buf) -> Result<Self> {
        ensure_remaining(src, 1)?;
        match InterfaceType::from_id(src.get_u8())? {
            InterfaceType::Host => Ok(Self::Host),
            InterfaceType::Serial => Ok(Self::Serial),
            InterfaceType::D7asp => {
                ensure_remaining(src, 2)?;
                let qos = QoS::from_byte(src.get_u8())?;
                let dormant_timeout = src.get_u8();
                let addressee = Addressee::parse(src)?;
                Ok(Self::D7asp(D7aspConfiguration {
                    qos,
                    dormant_timeout,
                    addressee,
                }))
            }
        }
    }
}

impl fmt::Display for InterfaceConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Serial => write!(f, "serial"),
            Self::D7asp(config) => write!(f, "d7asp({config})"),
        }
    }
}
