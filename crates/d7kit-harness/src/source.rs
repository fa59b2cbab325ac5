use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Where the receive loop pulls frames from.
///
/// `next_frame` is the receive flow's only suspension point. It gets the
/// trial's cancellation token and must return `Ok(None)` promptly once the
/// token is cancelled, which bounds cancellation latency to one receive
/// poll.
pub trait FrameSource {
    type Frame;
    type Error: std::fmt::Display;

    /// Block until the next frame arrives or `cancel` fires.
    fn next_frame(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<Self::Frame>, Self::Error>;
}

/// A received frame the harness can judge against the expected payload.
pub trait ReceivedFrame {
    fn matches_payload(&self, expected: &[u8]) -> bool;

    /// Short human-readable form, used when reporting a mismatch.
    fn describe(&self) -> String {
        String::from("<frame>")
    }
}

impl ReceivedFrame for Vec<u8> {
    fn matches_payload(&self, expected: &[u8]) -> bool {
        self.as_slice() == expected
    }

    fn describe(&self) -> String {
        format!("{} bytes: {:02x?}", self.len(), self)
    }
}

/// [`FrameSource`] over an in-process channel.
///
/// Polls the channel every `poll_interval` so cancellation is observed even
/// when nothing arrives. A closed channel is a source error.
#[derive(Debug)]
pub struct ChannelSource<F> {
    rx: Receiver<F>,
    poll_interval: Duration,
}

impl<F> ChannelSource<F> {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

    pub fn new(rx: Receiver<F>) -> Self {
        Self::with_poll_interval(rx, Self::DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(rx: Receiver<F>, poll_interval: Duration) -> Self {
        Self { rx, poll_interval }
    }
}

impl<F> FrameSource for ChannelSource<F> {
    type Frame = F;
    type Error = RecvError;

    fn next_frame(&mut self, cancel: &CancellationToken) -> Result<Option<F>, RecvError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            match self.rx.recv_timeout(self.poll_interval) {
                Ok(frame) => return Ok(Some(frame)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(RecvError),
            }
        }
    }
}
