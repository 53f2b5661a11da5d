//! Scheduler - Cooperative Timer Queue
//!
//! The deferred-execution facility behind `defer_call` and the reopen step of
//! `throttle_by_interval`. It is a single-threaded timer queue: callbacks are
//! registered with a delay and run later, when the owner drives the queue.
//!
//! ## Ordering Guarantee
//!
//! Timers fire in deadline order. Timers with equal deadlines fire in the
//! order they were scheduled (FIFO), because the queue is keyed on
//! `(deadline, sequence number)`.
//!
//! ## Non-Interleaving Guarantee
//!
//! Nothing fires on its own. Callbacks run only inside `run_due`, `advance`
//! and `run_until_idle`, one at a time, after whatever synchronous code
//! scheduled them has returned. The queue is not borrowed while a callback
//! runs, so callbacks may schedule or cancel timers freely.
//!
//! A timer scheduled by a callback during `run_due` never fires in that same
//! pass, even with a zero delay; it waits for the next drive. This keeps a
//! self-rescheduling callback from starving the caller.
//!
//! ## Threading
//!
//! `Scheduler` is `Rc`-based and therefore `!Send`. It coordinates one
//! logical caller stream; there is no locking because there is nothing to
//! contend with.

use crate::clock::{Clock, ManualClock, SystemClock};
use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tracing::trace;

type Callback = Box<dyn FnOnce()>;

/// Identifies a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Timer lifecycle counters (for diagnostics)
///
/// - scheduled: monotonically increasing count of all timers ever scheduled
/// - fired: timers whose callback ran
/// - cancelled: timers removed before firing
/// - peak_pending: high-water mark of simultaneously pending timers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub scheduled: u64,
    pub fired: u64,
    pub cancelled: u64,
    pub peak_pending: usize,
}

#[derive(Default)]
struct TimerQueue {
    // Min-heap on (deadline, seq). Cancelled timers stay in the heap until
    // popped; the callback map is the source of truth for liveness.
    heap: BinaryHeap<Reverse<(Duration, u64)>>,
    callbacks: HashMap<u64, Callback>,
    next_seq: u64,
    stats: SchedulerStats,
}

impl TimerQueue {
    fn push(&mut self, deadline: Duration, callback: Callback) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse((deadline, seq)));
        self.callbacks.insert(seq, callback);
        self.stats.scheduled += 1;
        self.stats.peak_pending = self.stats.peak_pending.max(self.callbacks.len());
        TimerId(seq)
    }

    /// Drop cancelled entries from the top of the heap
    fn prune(&mut self) {
        while let Some(Reverse((_, seq))) = self.heap.peek() {
            if self.callbacks.contains_key(seq) {
                break;
            }
            self.heap.pop();
        }
    }

    fn next_deadline(&mut self) -> Option<Duration> {
        self.prune();
        self.heap.peek().map(|Reverse((deadline, _))| *deadline)
    }

    /// Pop the next live timer that is due at `now` and was scheduled before `seq_limit`
    fn pop_due(&mut self, now: Duration, seq_limit: u64) -> Option<(TimerId, Callback)> {
        self.prune();
        let &Reverse((deadline, seq)) = self.heap.peek()?;
        if deadline > now || seq >= seq_limit {
            return None;
        }
        self.heap.pop();
        let callback = self.callbacks.remove(&seq)?;
        self.stats.fired += 1;
        Some((TimerId(seq), callback))
    }
}

/// Handle to a cooperative timer queue
///
/// Clones share the same queue and clock.
#[derive(Clone)]
pub struct Scheduler {
    clock: Rc<dyn Clock>,
    queue: Rc<RefCell<TimerQueue>>,
}

impl Scheduler {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            queue: Rc::new(RefCell::new(TimerQueue::default())),
        }
    }

    /// Scheduler driven by real monotonic time
    pub fn with_system_clock() -> Self {
        Self::new(Rc::new(SystemClock::new()))
    }

    /// Scheduler driven by virtual time, plus a handle to that time
    pub fn manual() -> (Self, ManualClock) {
        let clock = ManualClock::new();
        (Self::new(Rc::new(clock.clone())), clock)
    }

    /// The clock this scheduler reads
    pub fn clock(&self) -> Rc<dyn Clock> {
        Rc::clone(&self.clock)
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Run `callback` once, `delay` from now
    pub fn schedule<F>(&self, delay: Duration, callback: F) -> TimerId
    where
        F: FnOnce() + 'static,
    {
        let deadline = self.clock.now().saturating_add(delay);
        let id = self.queue.borrow_mut().push(deadline, Box::new(callback));
        trace!("timer {} scheduled, due in {:?}", id, delay);
        id
    }

    /// Remove a pending timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&self, id: TimerId) -> bool {
        let mut queue = self.queue.borrow_mut();
        let removed = queue.callbacks.remove(&id.0).is_some();
        if removed {
            queue.stats.cancelled += 1;
            trace!("timer {} cancelled", id);
        }
        removed
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.queue.borrow().callbacks.contains_key(&id.0)
    }

    /// Number of timers waiting to fire
    pub fn pending(&self) -> usize {
        self.queue.borrow().callbacks.len()
    }

    /// Deadline of the earliest pending timer
    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.borrow_mut().next_deadline()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.queue.borrow().stats
    }

    /// Fire every timer that is due now, without letting time pass.
    ///
    /// Returns the number of callbacks run.
    pub fn run_due(&self) -> usize {
        let now = self.clock.now();
        let seq_limit = self.queue.borrow().next_seq;
        let mut fired = 0;

        loop {
            // Borrow ends before the callback runs
            let next = self.queue.borrow_mut().pop_due(now, seq_limit);
            match next {
                Some((id, callback)) => {
                    trace!("timer {} fired", id);
                    callback();
                    fired += 1;
                }
                None => break,
            }
        }

        fired
    }

    /// Let `by` pass on the clock, firing timers at their deadlines along the way.
    ///
    /// Time is stepped to each deadline in turn, so a callback observes
    /// `now()` equal to its own deadline and timers it schedules are placed
    /// relative to that instant.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.clock.now().saturating_add(by);
        let mut fired = 0;

        while let Some(deadline) = self.next_deadline() {
            if deadline > target {
                break;
            }
            self.sleep_until(deadline);
            fired += self.run_due();
        }

        self.sleep_until(target);
        fired + self.run_due()
    }

    /// Drive the queue until no timers remain.
    ///
    /// With a `SystemClock` this blocks (cooperatively) for as long as the
    /// latest deadline requires.
    pub fn run_until_idle(&self) -> usize {
        let mut fired = 0;
        while let Some(deadline) = self.next_deadline() {
            self.sleep_until(deadline);
            fired += self.run_due();
        }
        fired
    }

    fn sleep_until(&self, deadline: Duration) {
        let now = self.clock.now();
        if deadline > now {
            self.clock.sleep(deadline - now);
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::with_system_clock()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now())
            .field("pending", &self.pending())
            .finish()
    }
}
