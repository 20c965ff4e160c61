//! [`WakeUpSignal`] – lets asynchronous nodes tell the driver to re-tick now.
//!
//! A timer thread (or any other background producer) calls
//! [`emit`][WakeUpSignal::emit]; the driver loop calls
//! [`wait_for`][WakeUpSignal::wait_for] between ticks and returns early as
//! soon as a signal arrives.  Signals emitted while nobody waits are latched,
//! so the next wait returns immediately.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Default)]
struct Shared {
    ready: Mutex<bool>,
    cond: Condvar,
}

/// A latched, clonable wake-up flag.  Clones share the same flag.
#[derive(Clone, Default)]
pub struct WakeUpSignal {
    shared: Arc<Shared>,
}

impl WakeUpSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag and wake any waiter.
    pub fn emit(&self) {
        let mut ready = self.shared.ready.lock();
        *ready = true;
        self.shared.cond.notify_all();
    }

    /// Block for at most `timeout` until the flag is set.
    ///
    /// Returns `true` (and clears the flag) if a signal was received.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut ready = self.shared.ready.lock();
        while !*ready {
            if self.shared.cond.wait_until(&mut ready, deadline).timed_out() {
                break;
            }
        }
        std::mem::take(&mut *ready)
    }

    /// `true` if two handles share the same flag.
    pub fn same_as(&self, other: &WakeUpSignal) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl std::fmt::Debug for WakeUpSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WakeUpSignal")
            .field("ready", &*self.shared.ready.lock())
            .finish()
    }
}
