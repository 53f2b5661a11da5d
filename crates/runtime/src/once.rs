//! Single-shot invocation
//!
//! `run_once(f)` wraps a zero-argument function so it runs on the first call
//! only. Every later call, whatever its arguments, returns the result of that
//! first run.

use belt_core::{Value, record_violation};
use std::cell::RefCell;
use std::fmt;
use tracing::debug;

enum OnceState<F> {
    Pending(F),
    Running,
    Done(Value),
    // The first run panicked
    Poisoned,
}

// Marks the wrapper poisoned if `f` unwinds before finishing
struct PoisonOnUnwind<'a, F> {
    state: &'a RefCell<OnceState<F>>,
    finished: bool,
}

impl<F> Drop for PoisonOnUnwind<'_, F> {
    fn drop(&mut self) {
        if !self.finished {
            *self.state.borrow_mut() = OnceState::Poisoned;
        }
    }
}

/// Wrapper produced by `run_once`
pub struct RunOnce<F> {
    state: RefCell<OnceState<F>>,
}

/// Wrap `f` so that it is invoked at most once
pub fn run_once<F>(f: F) -> RunOnce<F>
where
    F: FnOnce() -> Value,
{
    RunOnce {
        state: RefCell::new(OnceState::Pending(f)),
    }
}

impl<F> RunOnce<F>
where
    F: FnOnce() -> Value,
{
    /// Invoke the wrapper. Arguments are accepted and ignored.
    ///
    /// A call made from inside `f` itself, before the first run has finished,
    /// returns `Value::Undefined`. If the first run panics the wrapper is
    /// poisoned: `f` is gone, so every later call returns `Value::Undefined`
    /// and records a contract violation.
    pub fn call(&self, _args: &[Value]) -> Value {
        if let OnceState::Done(result) = &*self.state.borrow() {
            return result.clone();
        }

        let state = std::mem::replace(&mut *self.state.borrow_mut(), OnceState::Running);
        match state {
            OnceState::Pending(f) => {
                let mut guard = PoisonOnUnwind {
                    state: &self.state,
                    finished: false,
                };
                let result = f();
                guard.finished = true;
                *self.state.borrow_mut() = OnceState::Done(result.clone());
                result
            }
            OnceState::Running => {
                debug!("run_once: reentrant call while first run is in progress");
                Value::Undefined
            }
            OnceState::Poisoned => {
                *self.state.borrow_mut() = OnceState::Poisoned;
                record_violation("run_once: first run panicked");
                Value::Undefined
            }
            // Handled above
            OnceState::Done(result) => {
                *self.state.borrow_mut() = OnceState::Done(result.clone());
                result
            }
        }
    }

    pub fn has_run(&self) -> bool {
        matches!(&*self.state.borrow(), OnceState::Done(_))
    }
}

impl<F> fmt::Debug for RunOnce<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.borrow() {
            OnceState::Pending(_) => "pending",
            OnceState::Running => "running",
            OnceState::Done(_) => "done",
            OnceState::Poisoned => "poisoned",
        };
        f.debug_struct("RunOnce").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_runs_once_with_any_arguments() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let once = run_once(move || {
            counter.set(counter.get() + 1);
            Value::from("created")
        });

        assert!(!once.has_run());
        assert_eq!(once.call(&[]), Value::from("created"));
        assert_eq!(once.call(&[Value::Int(1)]), Value::from("created"));
        assert_eq!(once.call(&[Value::from("x"), Value::Null]), Value::from("created"));
        assert_eq!(calls.get(), 1);
        assert!(once.has_run());
    }

    #[test]
    fn test_falsy_result_is_still_cached() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let once = run_once(move || {
            counter.set(counter.get() + 1);
            Value::Undefined
        });
        once.call(&[]);
        once.call(&[]);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_reentrant_call_returns_undefined() {
        type Slot = Rc<RefCell<Option<Rc<RunOnce<Box<dyn FnOnce() -> Value>>>>>>;
        let slot: Slot = Rc::default();
        let seen = Rc::new(RefCell::new(None));

        let inner_slot = Rc::clone(&slot);
        let inner_seen = Rc::clone(&seen);
        let f: Box<dyn FnOnce() -> Value> = Box::new(move || {
            let wrapper = inner_slot.borrow().clone();
            *inner_seen.borrow_mut() = wrapper.map(|w| w.call(&[]));
            Value::Int(7)
        });
        let once = Rc::new(run_once(f));
        *slot.borrow_mut() = Some(Rc::clone(&once));

        assert_eq!(once.call(&[]), Value::Int(7));
        assert_eq!(*seen.borrow(), Some(Value::Undefined));
        assert_eq!(once.call(&[]), Value::Int(7));

        // Break the cycle
        slot.borrow_mut().take();
    }

    #[test]
    fn test_panicking_first_run_poisons() {
        use belt_core::{clear_violation, take_violation};
        use std::panic::{AssertUnwindSafe, catch_unwind};

        let once = run_once(|| -> Value { panic!("boom") });
        let outcome = catch_unwind(AssertUnwindSafe(|| once.call(&[])));
        assert!(outcome.is_err());
        assert!(!once.has_run());

        clear_violation();
        assert_eq!(once.call(&[]), Value::Undefined);
        assert!(take_violation().is_some_and(|m| m.contains("panicked")));
        assert_eq!(format!("{:?}", once), "RunOnce { state: \"poisoned\" }");
    }

    #[test]
    fn test_independent_wrappers() {
        let calls = Rc::new(Cell::new(0));
        let make = || {
            let counter = Rc::clone(&calls);
            run_once(move || {
                counter.set(counter.get() + 1);
                Value::Int(counter.get())
            })
        };
        let a = make();
        let b = make();
        assert_eq!(a.call(&[]), Value::Int(1));
        assert_eq!(b.call(&[]), Value::Int(2));
        assert_eq!(a.call(&[]), Value::Int(1));
    }
}
