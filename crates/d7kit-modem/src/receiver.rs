use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use d7kit_alp::Command;
use d7kit_frame::{
    Frame, FrameConfig, FrameError, FrameReader, ALP_DATA, LOGGING, PING_RESPONSE, REBOOTED,
};
use d7kit_transport::ModemStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::{ModemError, Result};

/// Receiving half of a modem connection.
///
/// Reads are bounded by the modem's poll interval, so [`recv`](Self::recv)
/// notices cancellation within one interval even on a silent line.
pub struct CommandReceiver {
    reader: FrameReader<ModemStream>,
    endpoint: PathBuf,
}

impl CommandReceiver {
    pub(crate) fn new(stream: ModemStream, endpoint: &Path, config: FrameConfig) -> Result<Self> {
        Ok(Self {
            reader: FrameReader::with_config_stream(stream, config)?,
            endpoint: endpoint.to_path_buf(),
        })
    }

    /// Block until the next ALP command arrives.
    ///
    /// Returns `Ok(None)` once `cancel` fires. Frames that carry no ALP
    /// command (logging, reboot notices, ping responses) are consumed and
    /// skipped.
    pub fn recv(&mut self, cancel: &CancellationToken) -> Result<Option<Command>> {
        loop {
            if cancel.is_cancelled() {
                trace!(endpoint = %self.endpoint.display(), "receive cancelled");
                return Ok(None);
            }
            if let Some(command) = self.poll()? {
                return Ok(Some(command));
            }
        }
    }

    /// Wait at most one poll interval for a command.
    pub fn poll(&mut self) -> Result<Option<Command>> {
        match self.reader.read_frame() {
            Ok(frame) => Ok(self.handle_frame(frame)),
            Err(err) if err.is_timeout() => Ok(None),
            Err(FrameError::UnsupportedVersion(version)) => {
                warn!(
                    endpoint = %self.endpoint.display(),
                    version,
                    "skipping frame with unsupported version"
                );
                Ok(None)
            }
            Err(FrameError::ConnectionClosed) => {
                Err(ModemError::Disconnected(self.endpoint.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Discard everything already queued on the line.
    ///
    /// Reads until one poll interval passes with no frame, or until `limit`
    /// runs out on a line that never goes quiet. Returns how many ALP
    /// commands were thrown away.
    pub fn drain(&mut self, limit: Duration) -> Result<usize> {
        let deadline = Instant::now() + limit;
        let mut discarded = 0;
        while Instant::now() < deadline {
            match self.reader.read_frame() {
                Ok(frame) => {
                    if self.handle_frame(frame).is_some() {
                        discarded += 1;
                    }
                }
                Err(err) if err.is_timeout() => break,
                Err(FrameError::UnsupportedVersion(_)) => {}
                Err(FrameError::ConnectionClosed) => {
                    return Err(ModemError::Disconnected(self.endpoint.clone()))
                }
                Err(err) => return Err(err.into()),
            }
        }
        if discarded > 0 {
            warn!(
                endpoint = %self.endpoint.display(),
                discarded,
                "discarded stale commands"
            );
        }
        Ok(discarded)
    }

    /// Endpoint this receiver reads from.
    pub fn endpoint(&self) -> &Path {
        &self.endpoint
    }

    fn handle_frame(&self, frame: Frame) -> Option<Command> {
        let endpoint = self.endpoint.display();
        match frame.msg_type {
            ALP_DATA => match Command::parse(&frame.payload) {
                Ok(command) => {
                    debug!(%endpoint, counter = frame.counter, %command, "command received");
                    Some(command)
                }
                Err(err) => {
                    warn!(%endpoint, counter = frame.counter, error = %err, "undecodable ALP payload");
                    None
                }
            },
            LOGGING => {
                debug!(%endpoint, message = %String::from_utf8_lossy(&frame.payload), "modem log");
                None
            }
            REBOOTED => {
                warn!(%endpoint, "modem rebooted");
                None
            }
            PING_RESPONSE => {
                trace!(%endpoint, "ping response");
                None
            }
            other => {
                trace!(%endpoint, msg_type = other, "skipping frame");
                None
            }
        }
    }
}

impl std::fmt::Debug for CommandReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandReceiver")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
