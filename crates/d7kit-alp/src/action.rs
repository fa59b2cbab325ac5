use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{ensure_remaining, AlpError, Result};
use crate::interface::InterfaceConfiguration;
use crate::length::{decode_length, encode_length};

pub const OP_READ_FILE_DATA: u8 = 0x01;
pub const OP_WRITE_FILE_DATA: u8 = 0x04;
pub const OP_RETURN_FILE_DATA: u8 = 0x20;
pub const OP_STATUS: u8 = 0x22;
pub const OP_FORWARD: u8 = 0x32;

const OPCODE_MASK: u8 = 0x3F;
const FLAG_RESPONSE: u8 = 0x40;
const STATUS_ACTION: u8 = 0;
const STATUS_INTERFACE: u8 = 1;

/// A region of a file, with its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileData {
    pub file_id: u8,
    pub offset: u32,
    pub data: Bytes,
}

impl FileData {
    pub fn new(file_id: u8, offset: u32, data: impl Into<Bytes>) -> Self {
        Self {
            file_id,
            offset,
            data: data.into(),
        }
    }
}

/// A region of a file to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDataRequest {
    pub file_id: u8,
    pub offset: u32,
    pub length: u32,
}

/// One action of an ALP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ReadFileData(FileDataRequest),
    WriteFileData(FileData),
    ReturnFileData(FileData),
    /// Completion status of an earlier action in the same command.
    ActionStatus { action_index: u8, status: u8 },
    /// Reception metadata from an interface, kept opaque.
    InterfaceStatus { interface_id: u8, status: Bytes },
    Forward(InterfaceConfiguration),
}

impl Action {
    pub fn opcode(&self) -> u8 {
        match self {
            Action::ReadFileData(_) => OP_READ_FILE_DATA,
            Action::WriteFileData(_) => OP_WRITE_FILE_DATA,
            Action::ReturnFileData(_) => OP_RETURN_FILE_DATA,
            Action::ActionStatus { .. } | Action::InterfaceStatus { .. } => OP_STATUS,
            Action::Forward(_) => OP_FORWARD,
        }
    }

    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        match self {
            Action::ReadFileData(request) => {
                dst.put_u8(OP_READ_FILE_DATA | FLAG_RESPONSE);
                dst.put_u8(request.file_id);
                encode_length(request.offset, dst)?;
                encode_length(request.length, dst)?;
            }
            Action::WriteFileData(file) | Action::ReturnFileData(file) => {
                dst.put_u8(self.opcode());
                encode_file_data(file, dst)?;
            }
            Action::ActionStatus {
                action_index,
                status,
            } => {
                dst.put_u8((STATUS_ACTION << 6) | OP_STATUS);
                dst.put_u8(*action_index);
                dst.put_u8(*status);
            }
            Action::InterfaceStatus {
                interface_id,
                status,
            } => {
                dst.put_u8((STATUS_INTERFACE << 6) | OP_STATUS);
                dst.put_u8(*interface_id);
                encode_length(checked_len(status.len())?, dst)?;
                dst.put_slice(status);
            }
            Action::Forward(config) => {
                dst.put_u8(OP_FORWARD);
                config.encode(dst);
            }
        }
        Ok(())
    }

    pub(crate) fn parse(src: &mut impl Buf) -> Result<Self> {
        ensure_remaining(src, 1)?;
        let header = src.get_u8();
        match header & OPCODE_MASK {
            OP_READ_FILE_DATA => {
                ensure_remaining(src, 1)?;
                let file_id = src.get_u8();
                let offset = decode_length(src)?;
                let length = decode_length(src)?;
                Ok(Action::ReadFileData(FileDataRequest {
                    file_id,
                    offset,
                    length,
                }))
            }
            OP_WRITE_FILE_DATA => Ok(Action::WriteFileData(parse_file_data(src)?)),
            OP_RETURN_FILE_DATA => Ok(Action::ReturnFileData(parse_file_data(src)?)),
            OP_STATUS => match header >> 6 {
                STATUS_ACTION => {
                    ensure_remaining(src, 2)?;
                    Ok(Action::ActionStatus {
                        action_index: src.get_u8(),
                        status: src.get_u8(),
                    })
                }
                STATUS_INTERFACE => {
                    ensure_remaining(src, 1)?;
                    let interface_id = src.get_u8();
                    let len = decode_length(src)? as usize;
                    ensure_remaining(src, len)?;
                    Ok(Action::InterfaceStatus {
                        interface_id,
                        status: src.copy_to_bytes(len),
                    })
                }
                value => Err(AlpError::InvalidValue {
                    field: "status extension",
                    value,
                }),
            },
            OP_FORWARD => Ok(Action::Forward(InterfaceConfiguration::parse(src)?)),
            other => Err(AlpError::UnsupportedOperation(other)),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::ReadFileData(r) => write!(
                f,
                "ReadFileData(file={:#04x}, offset={}, length={})",
                r.file_id, r.offset, r.length
            ),
            Action::WriteFileData(d) => write!(
                f,
                "WriteFileData(file={:#04x}, offset={}, {} bytes)",
                d.file_id,
                d.offset,
                d.data.len()
            ),
            Action::ReturnFileData(d) => write!(
                f,
                "ReturnFileData(file={:#04x}, offset={}, {} bytes)",
                d.file_id,
                d.offset,
                d.data.len()
            ),
            Action::ActionStatus {
                action_index,
                status,
            } => write!(f, "ActionStatus(action={action_index}, status={status:#04x})"),
            Action::InterfaceStatus {
                interface_id,
                status,
            } => write!(
                f,
                "InterfaceStatus(interface={interface_id:#04x}, {} bytes)",
                status.len()
            ),
            Action::Forward(config) => write!(f, "Forward({config})"),
        }
    }
}

fn checked_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| AlpError::LengthOutOfRange(len as u64))
}

fn encode_file_data(file: &FileData, dst: &mut BytesMut) -> Result<()> {
    dst.put_u8(file.file_id);
    encode_length(file.offset, dst)?;
    encode_length(checked_len(file.data.len())?, dst)?;
    dst.put_slice(&file.data);
    Ok(())
}

fn parse_file_data(src: &mut impl Buf) -> Result<FileData> {
    ensure_remaining(src, 1)?;
    let file_id = src.get_u8();
    let offset = decode_length(src)?;
    let len = decode_length(src)? as usize;
    ensure_remaining(src, len)?;
    Ok(FileData {
        file_id,
        offset,
        data: src.copy_to_bytes(len),
    })
}
