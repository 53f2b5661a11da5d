//! Memoization keyed by serialized arguments
//!
//! `memoize_by_arguments(f)` caches `f`'s result per distinct argument list.
//! Argument lists are encoded with `belt_core::args_key`, so two calls hit the
//! same entry exactly when their arguments serialize to the same bytes.
//!
//! ## Eviction
//!
//! The default cache is unbounded: every distinct argument list ever seen
//! stays resident for the lifetime of the wrapper. `memoize_with` picks a
//! bounded policy instead:
//!
//! | Policy | Behavior |
//! |--------|----------|
//! | `Unbounded` | Never evicts |
//! | `Lru { capacity }` | Evicts the least recently used entry once `capacity` is reached |
//! | `Ttl { ttl }` | Entries older than `ttl` are recomputed on next use |
//!
//! ## Reentrancy
//!
//! The cache is not borrowed while `f` runs, so a memoized function may call
//! its own wrapper (the classic recursive memoization).

use crate::clock::{Clock, SystemClock};
use crate::config::MemoizeConfig;
use belt_core::{ArgsKey, Value, args_key, record_violation};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, trace};

/// When cached results are discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Keep every result forever (default)
    #[default]
    Unbounded,
    /// Keep at most `capacity` results, dropping the least recently used
    Lru { capacity: usize },
    /// Keep each result for `ttl` after it was computed
    Ttl { ttl: Duration },
}

/// Cache counters (for diagnostics)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Calls whose arguments could not be turned into a key
    pub uncacheable: u64,
}

struct Entry {
    value: Value,
    stored_at: Duration,
    last_used: u64,
}

struct MemoCache {
    policy: EvictionPolicy,
    entries: HashMap<ArgsKey, Entry>,
    // Logical time for LRU ordering
    tick: u64,
    stats: CacheStats,
}

impl MemoCache {
    fn new(policy: EvictionPolicy) -> Self {
        Self {
            policy,
            entries: HashMap::new(),
            tick: 0,
            stats: CacheStats::default(),
        }
    }

    fn lookup(&mut self, key: &ArgsKey, now: Duration) -> Option<Value> {
        self.tick += 1;
        let tick = self.tick;

        let policy = self.policy;
        let expired = self.entries.get(key).map(|entry| match policy {
            EvictionPolicy::Ttl { ttl } => now.saturating_sub(entry.stored_at) >= ttl,
            _ => false,
        });
        let Some(expired) = expired else {
            self.stats.misses += 1;
            return None;
        };

        if expired {
            self.entries.remove(key);
            self.stats.evictions += 1;
            self.stats.misses += 1;
            trace!("memoize: entry expired");
            return None;
        }

        let entry = self.entries.get_mut(key)?;
        entry.last_used = tick;
        self.stats.hits += 1;
        Some(entry.value.clone())
    }

    fn store(&mut self, key: ArgsKey, value: Value, now: Duration) {
        match self.policy {
            EvictionPolicy::Unbounded => {}
            EvictionPolicy::Lru { capacity } => {
                if capacity == 0 {
                    return;
                }
                while self.entries.len() >= capacity && !self.entries.contains_key(&key) {
                    self.evict_least_recent();
                }
            }
            EvictionPolicy::Ttl { ttl } => {
                let before = self.entries.len();
                self.entries
                    .retain(|_, entry| now.saturating_sub(entry.stored_at) < ttl);
                self.stats.evictions += (before - self.entries.len()) as u64;
            }
        }

        self.entries.insert(
            key,
            Entry {
                value,
                stored_at: now,
                last_used: self.tick,
            },
        );
    }

    fn evict_least_recent(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
            self.stats.evictions += 1;
            trace!("memoize: evicted least recently used entry");
        }
    }
}

/// Wrapper produced by `memoize_by_arguments` / `memoize_with`
pub struct Memoized<F> {
    f: F,
    clock: Rc<dyn Clock>,
    cache: RefCell<MemoCache>,
}

/// Memoize `f` with an unbounded cache
pub fn memoize_by_arguments<F>(f: F) -> Memoized<F>
where
    F: Fn(&[Value]) -> Value,
{
    memoize_with(f, EvictionPolicy::Unbounded, Rc::new(SystemClock::new()))
}

/// Memoize `f` with the given eviction policy
///
/// `clock` is only consulted by `EvictionPolicy::Ttl`.
pub fn memoize_with<F>(f: F, policy: EvictionPolicy, clock: Rc<dyn Clock>) -> Memoized<F>
where
    F: Fn(&[Value]) -> Value,
{
    Memoized {
        f,
        clock,
        cache: RefCell::new(MemoCache::new(policy)),
    }
}

/// Memoize `f` with the configured eviction policy
pub fn memoize_with_config<F>(f: F, config: &MemoizeConfig, clock: Rc<dyn Clock>) -> Memoized<F>
where
    F: Fn(&[Value]) -> Value,
{
    memoize_with(f, config.policy(), clock)
}

impl<F> Memoized<F>
where
    F: Fn(&[Value]) -> Value,
{
    pub fn call(&self, args: &[Value]) -> Value {
        let key = match args_key(args) {
            Ok(key) => key,
            Err(e) => {
                record_violation(format!("memoize_by_arguments: uncacheable arguments: {}", e));
                self.cache.borrow_mut().stats.uncacheable += 1;
                return (self.f)(args);
            }
        };

        let now = self.clock.now();
        if let Some(hit) = self.cache.borrow_mut().lookup(&key, now) {
            return hit;
        }

        let result = (self.f)(args);
        // Time of completion, so a slow computation still gets its full ttl
        let now = self.clock.now();
        self.cache.borrow_mut().store(key, result.clone(), now);
        result
    }

    /// Number of cached results
    pub fn len(&self) -> usize {
        self.cache.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.cache.borrow().policy
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.borrow().stats
    }

    /// Drop every cached result. Counters are kept.
    pub fn clear(&self) {
        let mut cache = self.cache.borrow_mut();
        debug!("memoize: clearing {} cached results", cache.entries.len());
        cache.entries.clear();
    }
}

impl<F> fmt::Debug for Memoized<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.cache.borrow();
        f.debug_struct("Memoized")
            .field("policy", &cache.policy)
            .field("len", &cache.entries.len())
            .field("stats", &cache.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use belt_core::{clear_violation, take_violation};
    use std::cell::Cell;

    fn counting_square(calls: &Rc<Cell<u32>>) -> impl Fn(&[Value]) -> Value + use<> {
        let calls = Rc::clone(calls);
        move |args: &[Value]| {
            calls.set(calls.get() + 1);
            match args.first().and_then(Value::as_int) {
                Some(n) => Value::Int(n * n),
                None => Value::Undefined,
            }
        }
    }

    #[test]
    fn test_same_arguments_invoke_once() {
        let calls = Rc::new(Cell::new(0));
        let square = memoize_by_arguments(counting_square(&calls));

        assert_eq!(square.call(&[Value::Int(4)]), Value::Int(16));
        assert_eq!(square.call(&[Value::Int(4)]), Value::Int(16));
        assert_eq!(calls.get(), 1);
        assert_eq!(square.stats().hits, 1);
        assert_eq!(square.stats().misses, 1);
    }

    #[test]
    fn test_distinct_arguments_kept_independently() {
        let calls = Rc::new(Cell::new(0));
        let square = memoize_by_arguments(counting_square(&calls));

        assert_eq!(square.call(&[Value::Int(2)]), Value::Int(4));
        assert_eq!(square.call(&[Value::Int(3)]), Value::Int(9));
        assert_eq!(calls.get(), 2);
        assert_eq!(square.len(), 2);

        assert_eq!(square.call(&[Value::Int(2)]), Value::Int(4));
        assert_eq!(square.call(&[Value::Int(3)]), Value::Int(9));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_structural_keys() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let length = memoize_by_arguments(move |args: &[Value]| {
            counter.set(counter.get() + 1);
            Value::Int(args.len() as i64)
        });

        length.call(&[Value::list([1, 2]), Value::from("a")]);
        length.call(&[Value::list([1, 2]), Value::from("a")]);
        assert_eq!(calls.get(), 1);

        // Extra trailing argument is a different list
        length.call(&[Value::list([1, 2]), Value::from("a"), Value::Undefined]);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_non_finite_arguments_bypass_cache() {
        clear_violation();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let echo = memoize_by_arguments(move |args: &[Value]| {
            counter.set(counter.get() + 1);
            args.first().cloned().unwrap_or_default()
        });

        echo.call(&[Value::Float(f64::NAN)]);
        echo.call(&[Value::Float(f64::NAN)]);
        assert_eq!(calls.get(), 2);
        assert!(echo.is_empty());
        assert_eq!(echo.stats().uncacheable, 2);
        assert!(take_violation().is_some_and(|m| m.contains("uncacheable")));
    }

    #[test]
    fn test_lru_evicts_least_recently_used() {
        let calls = Rc::new(Cell::new(0));
        let square = memoize_with(
            counting_square(&calls),
            EvictionPolicy::Lru { capacity: 2 },
            Rc::new(ManualClock::new()),
        );

        square.call(&[Value::Int(1)]);
        square.call(&[Value::Int(2)]);
        // Touch 1 so that 2 becomes the oldest
        square.call(&[Value::Int(1)]);
        square.call(&[Value::Int(3)]);
        assert_eq!(square.len(), 2);
        assert_eq!(square.stats().evictions, 1);
        assert_eq!(calls.get(), 3);

        square.call(&[Value::Int(1)]);
        assert_eq!(calls.get(), 3);
        square.call(&[Value::Int(2)]);
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn test_lru_zero_capacity_caches_nothing() {
        let calls = Rc::new(Cell::new(0));
        let square = memoize_with(
            counting_square(&calls),
            EvictionPolicy::Lru { capacity: 0 },
            Rc::new(ManualClock::new()),
        );
        square.call(&[Value::Int(5)]);
        square.call(&[Value::Int(5)]);
        assert_eq!(calls.get(), 2);
        assert!(square.is_empty());
    }

    #[test]
    fn test_ttl_expiry() {
        let calls = Rc::new(Cell::new(0));
        let clock = ManualClock::new();
        let square = memoize_with(
            counting_square(&calls),
            EvictionPolicy::Ttl {
                ttl: Duration::from_millis(50),
            },
            Rc::new(clock.clone()),
        );

        square.call(&[Value::Int(6)]);
        clock.advance(Duration::from_millis(49));
        square.call(&[Value::Int(6)]);
        assert_eq!(calls.get(), 1);

        clock.advance(Duration::from_millis(1));
        square.call(&[Value::Int(6)]);
        assert_eq!(calls.get(), 2);
        assert_eq!(square.stats().evictions, 1);
    }

    #[test]
    fn test_recursive_memoization() {
        type Fib = Memoized<Box<dyn Fn(&[Value]) -> Value>>;
        let slot: Rc<RefCell<Option<Rc<Fib>>>> = Rc::default();
        let calls = Rc::new(Cell::new(0));

        let inner_slot = Rc::clone(&slot);
        let counter = Rc::clone(&calls);
        let body: Box<dyn Fn(&[Value]) -> Value> = Box::new(move |args: &[Value]| {
            counter.set(counter.get() + 1);
            let n = args.first().and_then(Value::as_int).unwrap_or(0);
            if n < 2 {
                return Value::Int(n);
            }
            let Some(fib) = inner_slot.borrow().clone() else {
                return Value::Undefined;
            };
            let a = fib.call(&[Value::Int(n - 1)]).as_int().unwrap_or(0);
            let b = fib.call(&[Value::Int(n - 2)]).as_int().unwrap_or(0);
            Value::Int(a + b)
        });
        let fib = Rc::new(memoize_by_arguments(body));
        *slot.borrow_mut() = Some(Rc::clone(&fib));

        assert_eq!(fib.call(&[Value::Int(30)]), Value::Int(832_040));
        // One evaluation per distinct n
        assert_eq!(calls.get(), 31);

        slot.borrow_mut().take();
    }

    #[test]
    fn test_policy_from_config() {
        use crate::config::EvictionKind;

        let calls = Rc::new(Cell::new(0));
        let config = MemoizeConfig {
            eviction: EvictionKind::Lru,
            capacity: 1,
            ..MemoizeConfig::default()
        };
        let square =
            memoize_with_config(counting_square(&calls), &config, Rc::new(ManualClock::new()));
        assert_eq!(square.policy(), EvictionPolicy::Lru { capacity: 1 });

        square.call(&[Value::Int(2)]);
        square.call(&[Value::Int(3)]);
        square.call(&[Value::Int(2)]);
        assert_eq!(calls.get(), 3);
        assert_eq!(square.len(), 1);
    }

    #[test]
    fn test_clear_keeps_stats() {
        let calls = Rc::new(Cell::new(0));
        let square = memoize_by_arguments(counting_square(&calls));
        square.call(&[Value::Int(2)]);
        square.clear();
        assert!(square.is_empty());
        square.call(&[Value::Int(2)]);
        assert_eq!(calls.get(), 2);
        assert_eq!(square.stats().misses, 2);
    }
}
