//! Throughput verification for a writer/reader modem pair.
//!
//! A trial runs two flows: the caller's thread sends a fixed payload a fixed
//! number of times, while a [`ReceiveLoop`] thread collects what the reader
//! side delivers. The caller then waits on a [`CompletionGate`] for a
//! bounded time, cancels the receive loop if the gate did not fire, takes
//! ownership of everything received, and judges the trial.
//!
//! The harness knows nothing about modems. Frames arrive through the
//! [`FrameSource`] seam and are judged through [`ReceivedFrame`].

pub mod error;
pub mod gate;
pub mod receive;
pub mod source;
pub mod throughput;

pub use error::{HarnessError, Result};
pub use gate::CompletionGate;
pub use receive::{ReceiveLoop, ReceiveOutcome, StopReason};
pub use source::{ChannelSource, FrameSource, ReceivedFrame};
pub use throughput::{
    HarnessConfig, Mismatch, ThroughputHarness, TrialReport, Verdict, DEFAULT_GATE_TIMEOUT,
};

pub use tokio_util::sync::CancellationToken;
