//! System file records and the ALP command subset spoken by d7kit.
//!
//! - [`system_files`]: fixed-layout binary records stored in modem system
//!   files (firmware version, DLL configuration)
//! - [`command`] / [`action`]: the ALP actions needed to write a system
//!   file, read a file, and return file data over a D7 session
//! - [`interface`]: the D7ASP interface configuration carried by a
//!   forward action (encoded only, not interpreted)
//! - [`length`]: the variable-width length operand

pub mod action;
pub mod command;
pub mod error;
pub mod interface;
pub mod length;
pub mod system_files;

pub use action::{Action, FileData, FileDataRequest};
pub use command::Command;
pub use error::{AlpError, Result};
pub use interface::{
    Addressee, D7aspConfiguration, IdType, InterfaceConfiguration, InterfaceType, QoS,
    ResponseMode,
};
pub use system_files::{DllConfigFile, FirmwareVersionFile, SystemFile, SystemFileId};
