//! Byte transport to a D7 modem.
//!
//! Provides a unified stream over the two ways a modem is reached from a host:
//! - A serial TTY (USB-UART bridge), configured raw at a fixed baud rate
//! - A Unix domain socket (modem emulators, serial-over-socket bridges)
//!
//! This is the lowest layer of d7kit. Everything else builds on top of
//! the [`ModemStream`] type provided here.

pub mod endpoint;
pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod serial;
#[cfg(unix)]
pub mod uds;

pub use endpoint::open_endpoint;
pub use error::{Result, TransportError};
pub use traits::ModemStream;

#[cfg(unix)]
pub use serial::SerialPort;
#[cfg(unix)]
pub use uds::UnixDomainSocket;
