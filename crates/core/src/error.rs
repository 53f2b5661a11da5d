//! Contract violation channel
//!
//! Combinators never fail: given an input outside their contract they fall
//! back to an innocuous default (input unchanged, empty sequence,
//! `Value::Undefined`). This module provides thread-local state so that a
//! caller who cares can still find out that a fallback happened.
//!
//! # Usage
//!
//! Operations record a violation and carry on:
//! ```ignore
//! if !is_container {
//!     record_violation("each_over: expected sequence or mapping, got int");
//!     return container; // Return unchanged input
//! }
//! ```
//!
//! Callers can check afterwards:
//! ```ignore
//! if has_violation() {
//!     let message = take_violation();
//!     // Handle it...
//! }
//! ```

use crate::value::Value;
use std::cell::RefCell;

thread_local! {
    /// Thread-local storage for the last contract violation message
    static LAST_VIOLATION: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Record a contract violation, replacing any earlier one
pub fn record_violation(msg: impl Into<String>) {
    let msg = msg.into();
    tracing::debug!("contract violation: {}", msg);
    LAST_VIOLATION.with(|v| {
        *v.borrow_mut() = Some(msg);
    });
}

/// Take (and clear) the last contract violation
pub fn take_violation() -> Option<String> {
    LAST_VIOLATION.with(|v| v.borrow_mut().take())
}

/// Check if there's a pending contract violation
pub fn has_violation() -> bool {
    LAST_VIOLATION.with(|v| v.borrow().is_some())
}

/// Clear any pending contract violation
pub fn clear_violation() {
    LAST_VIOLATION.with(|v| *v.borrow_mut() = None);
}

pub(crate) fn unsupported_container(op: &str, value: &Value) {
    record_violation(format!(
        "{}: expected sequence or mapping, got {}",
        op,
        value.type_name()
    ));
}

pub(crate) fn expected_sequence(op: &str, value: &Value) {
    record_violation(format!(
        "{}: expected sequence, got {}",
        op,
        value.type_name()
    ));
}
