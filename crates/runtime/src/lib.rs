//! Belt Runtime: time- and identity-sensitive invocation wrappers
//!
//! Key design principles:
//! - Scheduler: a cooperative, single-threaded timer queue. Deferred work
//!   runs only when the owner drives it, never interleaved with other code
//! - Clock: where the scheduler gets its time. `SystemClock` for real use,
//!   `ManualClock` for deterministic tests
//! - Each wrapper owns its state exclusively; wrapping the same function
//!   twice gives two independent wrappers
//!
//! # Modules
//!
//! - `clock`: Clock trait, SystemClock, ManualClock
//! - `scheduler`: Timer queue with FIFO ordering for equal deadlines
//! - `once`: `run_once`
//! - `memoize`: `memoize_by_arguments`, `memoize_with`, eviction policies
//! - `throttle`: `throttle_by_interval`
//! - `defer`: `defer_call` and its cancellation handle
//! - `config`: TOML / environment configuration
//! - `logging`: stderr tracing subscriber setup

pub mod clock;
pub mod config;
pub mod defer;
pub mod logging;
pub mod memoize;
pub mod once;
pub mod scheduler;
pub mod throttle;

// Re-export key types and functions
pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduler::{Scheduler, SchedulerStats, TimerId};

// Invocation control
pub use defer::{DeferHandle, defer_call};
pub use memoize::{
    CacheStats, EvictionPolicy, Memoized, memoize_by_arguments, memoize_with, memoize_with_config,
};
pub use once::{RunOnce, run_once};
pub use throttle::{Throttled, throttle_by_interval, throttle_with_config};

// Configuration and logging
pub use config::{BeltConfig, ConfigError, EvictionKind, MemoizeConfig, ThrottleConfig};
pub use logging::init_logging;
