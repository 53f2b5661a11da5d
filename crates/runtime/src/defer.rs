//! Deferred invocation
//!
//! `defer_call` schedules exactly one invocation of a function, with a fixed
//! argument list, `wait` from now. It returns immediately; the effect is
//! observed later, when the scheduler is driven past the deadline.
//!
//! The returned `DeferHandle` can cancel the invocation while it is still
//! pending. Dropping the handle does not cancel anything, so ignoring it gives
//! plain fire-and-forget behavior. The function's return value is discarded.

use crate::scheduler::{Scheduler, TimerId};
use belt_core::Value;
use std::time::Duration;
use tracing::trace;

/// Handle to one pending deferred invocation
#[derive(Debug, Clone)]
pub struct DeferHandle {
    id: TimerId,
    scheduler: Scheduler,
}

impl DeferHandle {
    /// Discard the invocation if it has not run yet.
    ///
    /// Returns true if this call prevented it from running.
    pub fn cancel(&self) -> bool {
        self.scheduler.cancel(self.id)
    }

    pub fn is_pending(&self) -> bool {
        self.scheduler.is_pending(self.id)
    }

    pub fn id(&self) -> TimerId {
        self.id
    }
}

/// Invoke `f(&args)` once, `wait` from now
pub fn defer_call<F>(scheduler: &Scheduler, f: F, wait: Duration, args: Vec<Value>) -> DeferHandle
where
    F: FnOnce(&[Value]) -> Value + 'static,
{
    let id = scheduler.schedule(wait, move || {
        let _ = f(&args);
    });
    trace!("defer_call: invocation {} deferred by {:?}", id, wait);
    DeferHandle {
        id,
        scheduler: scheduler.clone(),
    }
}
