//! Nullable clock: deterministic time for testing.

use agora_types::{Clock, Timestamp};
use std::sync::atomic::{AtomicI64, Ordering};

/// A deterministic clock. Time only advances when you tell it to.
pub struct NullClock {
    current: AtomicI64,
}

impl NullClock {
    pub fn new(initial_secs: i64) -> Self {
        Self {
            current: AtomicI64::new(initial_secs),
        }
    }

    /// Advance time by a number of seconds.
    pub fn advance(&self, secs: i64) {
        self.current.fetch_add(secs, Ordering::SeqCst);
    }

    /// Set the time to a specific value.
    pub fn set(&self, secs: i64) {
        self.current.store(secs, Ordering::SeqCst);
    }
}

impl Default for NullClock {
    fn default() -> Self {
        Self::new(1_700_000_000)
    }
}

impl Clock for NullClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_unix_secs(self.current.load(Ordering::SeqCst))
    }
}
