//! Time source for pool operations
//!
//! The engine reads the clock exactly once per operation and threads that
//! value through every check, so an operation never observes two times.

use crate::types::Timestamp;
use std::sync::atomic::{AtomicI64, Ordering};

/// Supplies the current unix timestamp in seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp()
    }
}

/// Manually driven clock for simulations and tests
///
/// Time never goes backwards: `set` to an earlier value is ignored.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    /// Move the clock forward to `timestamp`
    pub fn set(&self, timestamp: Timestamp) {
        self.now.fetch_max(timestamp, Ordering::SeqCst);
    }

    /// Advance by `seconds` and return the new time
    pub fn advance(&self, seconds: i64) -> Timestamp {
        let seconds = seconds.max(0);
        self.now.fetch_add(seconds, Ordering::SeqCst) + seconds
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
