//! Blocking handle to a D7 modem.
//!
//! A [`Modem`] owns one endpoint (serial TTY or Unix socket), sends ALP
//! commands over the modem's serial framing and reads its UID. Incoming
//! commands are consumed through a [`CommandReceiver`], which polls the
//! line and gives up promptly when its cancellation token fires.

pub mod error;
pub mod modem;
pub mod receiver;

pub use error::{ModemError, Result};
pub use modem::{
    Modem, ModemConfig, DEFAULT_POLL_INTERVAL, DEFAULT_RATE, DEFAULT_RESPONSE_TIMEOUT,
};
pub use receiver::CommandReceiver;
