use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{HarnessError, Result};
use crate::gate::CompletionGate;
use crate::receive::{ReceiveLoop, ReceiveOutcome, StopReason};
use crate::source::{FrameSource, ReceivedFrame};

/// How long the sending side waits for the receive side after the last send.
pub const DEFAULT_GATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Shape of one trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Number of sends, and number of matching receives needed to pass.
    pub target_count: usize,
    /// Upper bound on the wait after the last send.
    pub gate_timeout: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            target_count: 10,
            gate_timeout: DEFAULT_GATE_TIMEOUT,
        }
    }
}

/// One received frame whose content differed from what was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Position in receive order.
    pub index: usize,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "OK",
            Self::Fail => "NOK",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a completed trial.
#[derive(Debug, Clone)]
pub struct TrialReport {
    pub target_count: usize,
    pub payload_len: usize,
    pub received_count: usize,
    pub mismatches: Vec<Mismatch>,
    /// The completion gate was not signalled within the configured timeout.
    pub timed_out: bool,
    /// Set when the frame source failed before the trial completed.
    pub receive_error: Option<String>,
    /// Time spent in the send phase.
    pub send_elapsed: Duration,
    /// Time from the first send until the receive loop was joined.
    pub total_elapsed: Duration,
}

impl TrialReport {
    pub fn is_complete(&self) -> bool {
        self.received_count == self.target_count
    }

    pub fn verdict(&self) -> Verdict {
        if self.is_complete() && self.mismatches.is_empty() {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    pub fn is_pass(&self) -> bool {
        self.verdict() == Verdict::Pass
    }

    /// Writer throughput: payload bits of every message sent, over the time
    /// the send phase took.
    ///
    /// `None` if no measurable time elapsed.
    pub fn throughput_bps(&self) -> Option<f64> {
        let secs = self.send_elapsed.as_secs_f64();
        if secs <= 0.0 {
            return None;
        }
        let bits = (self.target_count * self.payload_len * 8) as f64;
        Some(bits / secs)
    }
}

impl fmt::Display for TrialReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pass() {
            write!(
                f,
                "OK: received {} messages with correct payload",
                self.received_count
            )
        } else {
            write!(
                f,
                "NOK: received {} of {} messages",
                self.received_count, self.target_count
            )?;
            if !self.mismatches.is_empty() {
                write!(f, ", {} with wrong payload", self.mismatches.len())?;
            }
            if self.timed_out {
                f.write_str(", timed out")?;
            }
            if let Some(err) = &self.receive_error {
                write!(f, ", receive failed: {err}")?;
            }
            Ok(())
        }
    }
}

type ProgressFn = Box<dyn FnMut(usize, usize) + Send>;

/// Runs writer/reader trials.
pub struct ThroughputHarness {
    config: HarnessConfig,
    progress: Option<ProgressFn>,
}

impl fmt::Debug for ThroughputHarness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThroughputHarness")
            .field("config", &self.config)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl ThroughputHarness {
    /// Create a harness.
    ///
    /// # Errors
    ///
    /// `HarnessError::InvalidConfig` if `target_count` is zero.
    pub fn new(config: HarnessConfig) -> Result<Self> {
        if config.target_count == 0 {
            return Err(HarnessError::InvalidConfig(
                "target count must be positive".to_string(),
            ));
        }
        Ok(Self {
            config,
            progress: None,
        })
    }

    /// Report `(sent, total)` after every send.
    pub fn with_progress(mut self, progress: impl FnMut(usize, usize) + Send + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run one trial.
    ///
    /// `source` is moved onto the receive thread and dropped there. `send` is
    /// called `target_count` times on the current thread with `payload`.
    ///
    /// # Errors
    ///
    /// Fails only when the trial could not be carried out: the receive
    /// thread could not start or panicked, or `send` failed. Lost or wrong
    /// frames are reported in the [`TrialReport`].
    pub fn run<S, F, E>(&mut self, payload: &[u8], source: S, mut send: F) -> Result<TrialReport>
    where
        S: FrameSource + Send + 'static,
        S::Frame: ReceivedFrame + Send + 'static,
        F: FnMut(&[u8]) -> std::result::Result<(), E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let target = self.config.target_count;
        let gate = Arc::new(CompletionGate::new());
        let cancel = CancellationToken::new();

        let handle = ReceiveLoop::new(source, target, cancel.clone(), Arc::clone(&gate))
            .spawn()
            .map_err(HarnessError::Spawn)?;

        info!(target_count = target, payload_len = payload.len(), "trial started");
        let started = Instant::now();

        for index in 0..target {
            if let Err(err) = send(payload) {
                cancel.cancel();
                // The trial is already lost; the outcome is only joined so the
                // thread does not outlive the harness.
                if let Err(join_err) = join(handle) {
                    warn!(error = %join_err, "receive loop failed while aborting trial");
                }
                warn!(index, "send failed, trial aborted");
                return Err(HarnessError::Send {
                    index,
                    source: err.into(),
                });
            }
            let sent = index + 1;
            debug!(sent, total = target, "sent");
            if let Some(progress) = self.progress.as_mut() {
                progress(sent, target);
            }
        }
        let send_elapsed = started.elapsed();
        debug!(elapsed_ms = send_elapsed.as_millis() as u64, "send phase done");

        let timed_out = !gate.wait(self.config.gate_timeout);
        if timed_out {
            cancel.cancel();
            warn!(
                timeout_ms = self.config.gate_timeout.as_millis() as u64,
                "timed out waiting for receive loop"
            );
        }

        let outcome = join(handle)?;
        let total_elapsed = started.elapsed();

        let mismatches: Vec<Mismatch> = outcome
            .frames
            .iter()
            .enumerate()
            .filter(|(_, frame)| !frame.matches_payload(payload))
            .map(|(index, frame)| Mismatch {
                index,
                description: frame.describe(),
            })
            .collect();
        for mismatch in &mismatches {
            warn!(
                index = mismatch.index,
                frame = %mismatch.description,
                "received unexpected payload"
            );
        }

        let receive_error = match outcome.stop {
            StopReason::SourceFailed(err) => Some(err),
            StopReason::Completed | StopReason::Cancelled => None,
        };

        let report = TrialReport {
            target_count: target,
            payload_len: payload.len(),
            received_count: outcome.frames.len(),
            mismatches,
            timed_out,
            receive_error,
            send_elapsed,
            total_elapsed,
        };
        info!(
            verdict = %report.verdict(),
            received = report.received_count,
            target = target,
            "trial finished"
        );
        Ok(report)
    }
}

fn join<F>(handle: JoinHandle<ReceiveOutcome<F>>) -> Result<ReceiveOutcome<F>> {
    handle.join().map_err(|_| HarnessError::ReceiveLoopPanicked)
}
