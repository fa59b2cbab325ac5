use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::gate::CompletionGate;
use crate::source::FrameSource;

/// Why a receive loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The target count was reached and the gate was signalled.
    Completed,
    /// The token was cancelled by someone else before the target was reached.
    Cancelled,
    /// The frame source returned an error. The gate is signalled anyway so
    /// the waiting side does not sit out its full timeout.
    SourceFailed(String),
}

/// Everything a receive loop collected, handed back when it terminates.
#[derive(Debug)]
pub struct ReceiveOutcome<F> {
    pub frames: Vec<F>,
    pub stop: StopReason,
}

/// Continuous consumer feeding one trial.
///
/// Owns the received frames for as long as it runs; the only way to read
/// them is to take the [`ReceiveOutcome`] after the loop has stopped.
pub struct ReceiveLoop<S> {
    source: S,
    target_count: usize,
    cancel: CancellationToken,
    gate: Arc<CompletionGate>,
}

impl<S: FrameSource> ReceiveLoop<S> {
    pub fn new(
        source: S,
        target_count: usize,
        cancel: CancellationToken,
        gate: Arc<CompletionGate>,
    ) -> Self {
        Self {
            source,
            target_count,
            cancel,
            gate,
        }
    }

    /// Run on the current thread until the target is reached, the token is
    /// cancelled, or the source fails.
    pub fn run(mut self) -> ReceiveOutcome<S::Frame> {
        let mut frames = Vec::with_capacity(self.target_count);

        if self.target_count == 0 {
            self.finish();
            return ReceiveOutcome {
                frames,
                stop: StopReason::Completed,
            };
        }

        let stop = loop {
            if self.cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            let next = self.source.next_frame(&self.cancel);

            // Checked before looking at the result: a frame that raced with
            // cancellation is dropped, not appended.
            if self.cancel.is_cancelled() {
                if matches!(next, Ok(Some(_))) {
                    debug!(received = frames.len(), "dropping frame received after cancel");
                }
                break StopReason::Cancelled;
            }

            match next {
                Ok(Some(frame)) => {
                    frames.push(frame);
                    trace!(received = frames.len(), target = self.target_count, "frame received");
                    if frames.len() == self.target_count {
                        self.finish();
                        break StopReason::Completed;
                    }
                }
                Ok(None) => continue,
                Err(err) => {
                    warn!(error = %err, received = frames.len(), "frame source failed");
                    // Nothing more will arrive; release the waiter now.
                    self.gate.signal();
                    break StopReason::SourceFailed(err.to_string());
                }
            }
        };

        debug!(received = frames.len(), ?stop, "receive loop stopped");
        ReceiveOutcome { frames, stop }
    }

    /// Run on a dedicated thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<ReceiveOutcome<S::Frame>>>
    where
        S: Send + 'static,
        S::Frame: Send + 'static,
    {
        thread::Builder::new()
            .name("d7kit-receive".to_string())
            .spawn(move || self.run())
    }

    // Cancel first so a source blocked elsewhere on the same token wakes,
    // then release the waiter.
    fn finish(&self) {
        self.cancel.cancel();
        self.gate.signal();
    }
}
