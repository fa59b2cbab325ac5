use std::path::PathBuf;

/// Errors that can occur while talking to a modem.
#[derive(Debug, thiserror::Error)]
pub enum ModemError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] d7kit_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] d7kit_frame::FrameError),

    /// A command could not be encoded.
    #[error("alp error: {0}")]
    Alp(#[from] d7kit_alp::AlpError),

    /// The modem went away.
    #[error("modem disconnected: {}", .0.display())]
    Disconnected(PathBuf),

    /// The modem did not answer in time.
    #[error("no response from modem after {0:?}")]
    Timeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, ModemError>;
