use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// One-shot completion signal with a bounded wait.
///
/// The fired flag lives under the same mutex the condition variable waits
/// on, so a `signal` that lands before or during `wait` is always seen.
#[derive(Debug, Default)]
pub struct CompletionGate {
    fired: Mutex<bool>,
    cond: Condvar,
}

impl CompletionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the gate. Calling it again has no effect.
    pub fn signal(&self) {
        let mut fired = self.lock();
        if !*fired {
            *fired = true;
            self.cond.notify_all();
        }
    }

    /// Block until the gate fires or `timeout` elapses.
    ///
    /// Returns `true` if the gate fired within the bound.
    pub fn wait(&self, timeout: Duration) -> bool {
        let fired = self.lock();
        let (fired, _) = self
            .cond
            .wait_timeout_while(fired, timeout, |fired| !*fired)
            .unwrap_or_else(PoisonError::into_inner);
        *fired
    }

    pub fn is_signalled(&self) -> bool {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.fired.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
