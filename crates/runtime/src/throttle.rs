//! Rate limiting by interval
//!
//! A throttled wrapper is either open or closed. An open wrapper invokes the
//! function immediately and closes; it reopens `wait` later, when the
//! scheduler fires the reopen timer. Calls arriving while it is closed are
//! dropped: nothing is queued and no trailing call is made. A dropped call
//! returns the result of the last real invocation (`Value::Undefined` before
//! the first one).
//!
//! The window is measured from the moment the function returns. The wrapper
//! is already closed while the function runs, so a call made from inside the
//! function is dropped like any other.

use crate::config::ThrottleConfig;
use crate::scheduler::Scheduler;
use belt_core::Value;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tracing::trace;

struct ThrottleState {
    open: Cell<bool>,
    last_result: RefCell<Value>,
    invocations: Cell<u64>,
    dropped: Cell<u64>,
}

/// Wrapper produced by `throttle_by_interval`
pub struct Throttled<F> {
    f: F,
    wait: Duration,
    scheduler: Scheduler,
    state: Rc<ThrottleState>,
}

/// Allow `f` to run at most once per `wait`
pub fn throttle_by_interval<F>(scheduler: &Scheduler, f: F, wait: Duration) -> Throttled<F>
where
    F: Fn(&[Value]) -> Value,
{
    Throttled {
        f,
        wait,
        scheduler: scheduler.clone(),
        state: Rc::new(ThrottleState {
            open: Cell::new(true),
            last_result: RefCell::new(Value::Undefined),
            invocations: Cell::new(0),
            dropped: Cell::new(0),
        }),
    }
}

/// `throttle_by_interval` with the configured default window
pub fn throttle_with_config<F>(
    scheduler: &Scheduler,
    f: F,
    config: &ThrottleConfig,
) -> Throttled<F>
where
    F: Fn(&[Value]) -> Value,
{
    throttle_by_interval(scheduler, f, config.default_wait())
}

impl<F> Throttled<F>
where
    F: Fn(&[Value]) -> Value,
{
    pub fn call(&self, args: &[Value]) -> Value {
        if !self.state.open.get() {
            self.state.dropped.set(self.state.dropped.get() + 1);
            trace!("throttle: call dropped, window still closed");
            return self.state.last_result.borrow().clone();
        }

        self.state.open.set(false);
        let result = (self.f)(args);
        self.state.invocations.set(self.state.invocations.get() + 1);
        *self.state.last_result.borrow_mut() = result.clone();

        self.schedule_reopen();
        result
    }

    fn schedule_reopen(&self) {
        // The timer must not keep the wrapper's state alive
        let state = Rc::downgrade(&self.state);
        self.scheduler.schedule(self.wait, move || {
            if let Some(state) = state.upgrade() {
                state.open.set(true);
                trace!("throttle: window reopened");
            }
        });
    }
}

impl<F> Throttled<F> {
    /// Whether the next call would invoke the function
    pub fn is_open(&self) -> bool {
        self.state.open.get()
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Number of times the function actually ran
    pub fn invocations(&self) -> u64 {
        self.state.invocations.get()
    }

    /// Number of calls dropped while closed
    pub fn dropped(&self) -> u64 {
        self.state.dropped.get()
    }
}

impl<F> fmt::Debug for Throttled<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throttled")
            .field("wait", &self.wait)
            .field("open", &self.is_open())
            .field("invocations", &self.invocations())
            .field("dropped", &self.dropped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;

    fn counter() -> (Rc<Cell<i64>>, impl Fn(&[Value]) -> Value) {
        let calls = Rc::new(Cell::new(0));
        let handle = Rc::clone(&calls);
        let f = move |_: &[Value]| {
            handle.set(handle.get() + 1);
            Value::Int(handle.get())
        };
        (calls, f)
    }

    #[test]
    fn test_synchronous_burst_invokes_once() {
        let (scheduler, _clock) = Scheduler::manual();
        let (calls, f) = counter();
        let throttled = throttle_by_interval(&scheduler, f, Duration::from_millis(100));

        assert_eq!(throttled.call(&[]), Value::Int(1));
        assert_eq!(throttled.call(&[]), Value::Int(1));
        assert_eq!(throttled.call(&[]), Value::Int(1));
        assert_eq!(calls.get(), 1);
        assert_eq!(throttled.dropped(), 2);
    }

    #[test]
    fn test_reopens_after_wait() {
        let (scheduler, _clock) = Scheduler::manual();
        let (calls, f) = counter();
        let throttled = throttle_by_interval(&scheduler, f, Duration::from_millis(100));

        throttled.call(&[]);
        scheduler.advance(Duration::from_millis(99));
        assert!(!throttled.is_open());
        throttled.call(&[]);
        assert_eq!(calls.get(), 1);

        scheduler.advance(Duration::from_millis(1));
        assert!(throttled.is_open());
        assert_eq!(throttled.call(&[]), Value::Int(2));
        assert_eq!(calls.get(), 2);
        assert_eq!(throttled.invocations(), 2);
    }

    #[test]
    fn test_window_starts_when_function_returns() {
        let (scheduler, clock) = Scheduler::manual();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let busy_clock = clock.clone();
        let slow = move |_: &[Value]| {
            // Simulate 60ms of work
            busy_clock.advance(Duration::from_millis(60));
            counter.set(counter.get() + 1);
            Value::Int(counter.get())
        };
        let throttled = throttle_by_interval(&scheduler, slow, Duration::from_millis(100));

        throttled.call(&[]);
        assert_eq!(clock.now(), Duration::from_millis(60));

        // 100ms after the call started, but only 50ms after it returned
        scheduler.advance(Duration::from_millis(50));
        assert!(!throttled.is_open());
        throttled.call(&[]);
        assert_eq!(calls.get(), 1);

        scheduler.advance(Duration::from_millis(50));
        assert!(throttled.is_open());
        throttled.call(&[]);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_closed_before_first_result_returns_undefined() {
        let (scheduler, _clock) = Scheduler::manual();
        let seen = Rc::new(RefCell::new(Vec::new()));

        type Slot = Rc<RefCell<Option<Rc<Throttled<Box<dyn Fn(&[Value]) -> Value>>>>>>;
        let slot: Slot = Rc::default();
        let inner_slot = Rc::clone(&slot);
        let inner_seen = Rc::clone(&seen);
        let f: Box<dyn Fn(&[Value]) -> Value> = Box::new(move |_: &[Value]| {
            if let Some(me) = inner_slot.borrow().clone() {
                inner_seen.borrow_mut().push(me.call(&[]));
            }
            Value::from("done")
        });
        let throttled = Rc::new(throttle_by_interval(&scheduler, f, Duration::from_millis(10)));
        *slot.borrow_mut() = Some(Rc::clone(&throttled));

        assert_eq!(throttled.call(&[]), Value::from("done"));
        assert_eq!(*seen.borrow(), vec![Value::Undefined]);
        assert_eq!(throttled.invocations(), 1);

        slot.borrow_mut().take();
    }

    #[test]
    fn test_window_from_config() {
        let (scheduler, _clock) = Scheduler::manual();
        let (calls, f) = counter();
        let config = ThrottleConfig {
            default_wait_ms: 30,
        };
        let throttled = throttle_with_config(&scheduler, f, &config);
        assert_eq!(throttled.wait(), Duration::from_millis(30));

        throttled.call(&[]);
        scheduler.advance(Duration::from_millis(29));
        throttled.call(&[]);
        assert_eq!(calls.get(), 1);
        scheduler.advance(Duration::from_millis(1));
        throttled.call(&[]);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_dropped_wrapper_leaves_harmless_timer() {
        let (scheduler, _clock) = Scheduler::manual();
        let (_calls, f) = counter();
        let throttled = throttle_by_interval(&scheduler, f, Duration::from_millis(5));
        throttled.call(&[]);
        drop(throttled);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.run_until_idle(), 1);
    }

    #[test]
    fn test_independent_windows() {
        let (scheduler, _clock) = Scheduler::manual();
        let (a_calls, a) = counter();
        let (b_calls, b) = counter();
        let slow = throttle_by_interval(&scheduler, a, Duration::from_millis(50));
        let fast = throttle_by_interval(&scheduler, b, Duration::from_millis(10));

        slow.call(&[]);
        fast.call(&[]);
        scheduler.advance(Duration::from_millis(10));
        slow.call(&[]);
        fast.call(&[]);
        assert_eq!(a_calls.get(), 1);
        assert_eq!(b_calls.get(), 2);
    }
}
