use std::fmt;
use std::io;

use d7kit::alp::AlpError;
use d7kit::frame::FrameError;
use d7kit::harness::HarnessError;
use d7kit::modem::ModemError;
use d7kit::transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const TRIAL_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::UnsupportedRate(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn alp_error(context: &str, err: AlpError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn modem_error(context: &str, err: ModemError) -> CliError {
    match err {
        ModemError::Transport(err) => transport_error(context, err),
        ModemError::Frame(err) => frame_error(context, err),
        ModemError::Alp(err) => alp_error(context, err),
        ModemError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        ModemError::Disconnected(_) => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn harness_error(context: &str, err: HarnessError) -> CliError {
    match err {
        HarnessError::InvalidConfig(_) => CliError::new(USAGE, format!("{context}: {err}")),
        HarnessError::Send { index, source } => match source.downcast::<ModemError>() {
            Ok(err) => modem_error(&format!("{context}: send {index} failed"), *err),
            Err(source) => CliError::new(
                FAILURE,
                format!("{context}: send {index} failed: {source}"),
            ),
        },
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}
