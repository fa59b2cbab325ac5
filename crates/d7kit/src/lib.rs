//! Host-side toolkit for D7 modems.
//!
//! d7kit encodes the fixed-layout system file records a modem stores, and
//! verifies that a writer/reader modem pair delivers a payload losslessly
//! within a bounded time.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial TTY and Unix socket byte streams
//! - [`frame`]: the modem's serial framing
//! - [`alp`]: system file records and the ALP command subset
//! - [`modem`]: blocking modem handle with a cancellable receiver
//! - [`harness`]: completion gate, receive loop and throughput trials

/// Re-export transport types.
pub mod transport {
    pub use d7kit_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use d7kit_frame::*;
}

/// Re-export ALP types.
pub mod alp {
    pub use d7kit_alp::*;
}

/// Re-export modem types.
pub mod modem {
    pub use d7kit_modem::*;
}

/// Re-export harness types.
pub mod harness {
    pub use d7kit_harness::*;
}
