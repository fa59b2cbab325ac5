use std::fmt;

use bytes::{Buf, Bytes, BytesMut};
use tracing::trace;

use crate::action::{Action, FileData, FileDataRequest};
use crate::error::Result;
use crate::interface::InterfaceConfiguration;
use crate::system_files::{SystemFile, SystemFileId};

/// An ALP command: an ordered list of actions carried in one modem frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    pub actions: Vec<Action>,
}

impl Command {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    /// Write a system file record on the local modem.
    pub fn write_system_file<F: SystemFile>(file: &F) -> Self {
        Self::new(vec![Action::WriteFileData(FileData::new(
            F::FILE_ID.id(),
            0,
            file.to_bytes(),
        ))])
    }

    /// Read a region of a file on the local modem.
    pub fn read_file_data(file_id: u8, offset: u32, length: u32) -> Self {
        Self::new(vec![Action::ReadFileData(FileDataRequest {
            file_id,
            offset,
            length,
        })])
    }

    /// Read a whole system file on the local modem.
    pub fn read_system_file(file: SystemFileId, length: u32) -> Self {
        Self::read_file_data(file.id(), 0, length)
    }

    /// Return `data` as the contents of `file_id`, optionally forwarded over
    /// an interface first (the usual way to push data to a remote modem).
    pub fn return_file_data(
        file_id: u8,
        data: impl Into<Bytes>,
        interface: Option<InterfaceConfiguration>,
    ) -> Self {
        let mut actions = Vec::with_capacity(2);
        if let Some(config) = interface {
            actions.push(Action::Forward(config));
        }
        actions.push(Action::ReturnFileData(FileData::new(file_id, 0, data)));
        Self::new(actions)
    }

    /// The first returned file region in this command, if any.
    pub fn return_file_payload(&self) -> Option<&FileData> {
        self.actions.iter().find_map(|action| match action {
            Action::ReturnFileData(data) => Some(data),
            _ => None,
        })
    }

    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        for action in &self.actions {
            action.encode(dst)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode every action in `src`.
    pub fn parse(mut src: &[u8]) -> Result<Self> {
        let mut actions = Vec::new();
        while src.has_remaining() {
            let action = Action::parse(&mut src)?;
            trace!(opcode = action.opcode(), remaining = src.len(), "decoded action");
            actions.push(action);
        }
        Ok(Self { actions })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command[")?;
        for (i, action) in self.actions.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{action}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AlpError;
    use crate::interface::{Addressee, D7aspConfiguration, QoS, ResponseMode};
    use crate::system_files::{DllConfigFile, FirmwareVersionFile};

    #[test]
    fn write_dll_config() {
        let cmd = Command::write_system_file(&DllConfigFile::with_active_access_class(2));
        assert_eq!(
            cmd.to_bytes().unwrap().as_ref(),
            &[0x04, 0x0A, 0x00, 0x03, 0x02, 0xFF, 0xFF]
        );
    }

    #[test]
    fn write_firmware_version_carries_thirteen_bytes() {
        let record = FirmwareVersionFile::new("throug", "9aabfaa").unwrap();
        let cmd = Command::write_system_file(&record);
        let bytes = cmd.to_bytes().unwrap();
        assert_eq!(&bytes[..4], &[0x04, 0x02, 0x00, 0x0D]);
        assert_eq!(&bytes[4..], b"throug9aabfaa");
    }

    #[test]
    fn forwarded_return_file_data_parses_back() {
        let payload: Vec<u8> = (0..50).collect();
        let config = InterfaceConfiguration::D7asp(D7aspConfiguration::new(
            QoS::new(ResponseMode::No),
            Addressee::broadcast(2),
        ));
        let cmd = Command::return_file_data(0x40, payload.clone(), Some(config));

        let parsed = Command::parse(&cmd.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, cmd);
        assert_eq!(parsed.actions.len(), 2);
        assert_eq!(
            parsed.return_file_payload().unwrap().data.as_ref(),
            payload.as_slice()
        );
    }

    #[test]
    fn received_command_with_interface_status() {
        let wire = [
            0x62, 0xD7, 0x01, 0x55, // interface status, 1 opaque byte
            0x20, 0x40, 0x00, 0x02, 0xAB, 0xCD, // return file data
        ];
        let cmd = Command::parse(&wire).unwrap();
        assert_eq!(cmd.actions.len(), 2);
        assert_eq!(
            cmd.return_file_payload().unwrap().data.as_ref(),
            &[0xAB, 0xCD]
        );
        assert!(cmd.to_string().contains("ReturnFileData(file=0x40"));
    }

    #[test]
    fn command_without_return_file_data() {
        let cmd = Command::read_system_file(SystemFileId::Uid, 8);
        assert!(cmd.return_file_payload().is_none());
    }

    #[test]
    fn empty_input_is_empty_command() {
        assert_eq!(Command::parse(&[]).unwrap(), Command::default());
    }

    #[test]
    fn trailing_garbage_fails() {
        let err = Command::parse(&[0x20, 0x40, 0x00, 0x00, 0x3F]).unwrap_err();
        assert_eq!(err, AlpError::UnsupportedOperation(0x3F));
    }
}
