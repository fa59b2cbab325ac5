/// Errors that abort a trial before it can be judged.
///
/// Timeouts and payload mismatches are not errors; they are recorded in the
/// [`crate::TrialReport`].
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The harness configuration cannot describe a trial.
    #[error("invalid harness configuration: {0}")]
    InvalidConfig(String),

    /// The receive thread could not be started.
    #[error("failed to start receive loop: {0}")]
    Spawn(#[source] std::io::Error),

    /// The send callback failed; the receive loop has been stopped.
    #[error("send {index} failed: {source}")]
    Send {
        index: usize,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The receive thread panicked; nothing it collected is recoverable.
    #[error("receive loop panicked")]
    ReceiveLoopPanicked,
}

pub type Result<T> = std::result::Result<T, HarnessError>;
