//! Interruptible sleeping for polling waits

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Signal {
    interrupted: Mutex<bool>,
    wake: Condvar,
}

/// Cross-thread handle that cuts short a lookup's wait.
///
/// An interrupt stays pending until a sleeping (or the next) wait observes
/// it; observing it clears it.
#[derive(Clone, Default)]
pub struct InterruptHandle {
    signal: Arc<Signal>,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request interruption and wake any sleeper.
    pub fn interrupt(&self) {
        let mut interrupted = self
            .signal
            .interrupted
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *interrupted = true;
        self.signal.wake.notify_all();
    }

    /// Whether an interrupt is pending.
    pub fn is_interrupted(&self) -> bool {
        *self
            .signal
            .interrupted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Sleep for `duration`. Returns true, consuming the interrupt, if one
    /// is pending or arrives before the time is up.
    pub(crate) fn sleep(&self, duration: Duration) -> bool {
        let guard = self
            .signal
            .interrupted
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let (mut interrupted, _) = self
            .signal
            .wake
            .wait_timeout_while(guard, duration, |flag| !*flag)
            .unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *interrupted)
    }
}

impl std::fmt::Debug for InterruptHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterruptHandle")
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}
