//! Time sources for the scheduler
//!
//! The scheduler never reads the system clock directly; it asks a `Clock`.
//! Times are `Duration`s measured from the clock's own origin, so the two
//! implementations are interchangeable:
//!
//! - `SystemClock`: monotonic wall time. `sleep` parks cooperatively through
//!   `may::coroutine::sleep`, which yields the strand when called from a
//!   coroutine and falls back to a thread sleep otherwise.
//! - `ManualClock`: virtual time that only moves when told to. `sleep` just
//!   advances it, which makes timer-driven behavior deterministic in tests.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub trait Clock {
    /// Time elapsed since the clock's origin
    fn now(&self) -> Duration;

    /// Let `duration` pass
    fn sleep(&self, duration: Duration);
}

/// Monotonic clock backed by `Instant`
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            may::coroutine::sleep(duration);
        }
    }
}

/// Virtual clock for deterministic tests
///
/// Clones share the same time, so a test can keep one handle while the
/// scheduler owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move virtual time forward
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get().saturating_add(by));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
