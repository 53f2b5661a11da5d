//! Container combinators
//!
//! Higher-order operations that accept either container shape. They are all
//! expressed through `each_over` or `reduce_over`, so sequences, character
//! sequences and mappings are walked in exactly the same order everywhere.
//!
//! # Examples
//!
//! ```
//! use belt_core::{Value, filter_over, map_over, reduce_over};
//!
//! let list = Value::list([1, 2, 3, 4]);
//!
//! // Map: double each element
//! let doubled = map_over(&list, |v, _, _| Value::Int(v.as_int().unwrap_or(0) * 2));
//! assert_eq!(Value::List(doubled), Value::list([2, 4, 6, 8]));
//!
//! // Filter: keep even numbers
//! let even = filter_over(&list, |v, _, _| v.as_int().is_some_and(|n| n % 2 == 0));
//! assert_eq!(Value::List(even), Value::list([2, 4]));
//!
//! // Reduce: sum all elements
//! let sum = reduce_over(&list, |acc, v, _, _| {
//!     Value::Int(acc.as_int().unwrap_or(0) + v.as_int().unwrap_or(0))
//! }, Some(Value::Int(0)));
//! assert_eq!(sum, Value::Int(10));
//! ```

use crate::error::unsupported_container;
use crate::helpers::{permute_randomly, values_of};
use crate::traversal::{Container, Position, each_over};
use crate::value::{MapKey, Value};

/// Return the argument unchanged
pub fn identity(value: Value) -> Value {
    value
}

/// Map a function over a container, returning a new sequence
///
/// The result has one element per visited element, in traversal order.
pub fn map_over<F>(container: &Value, mut f: F) -> Vec<Value>
where
    F: FnMut(&Value, Position<'_>, &Value) -> Value,
{
    let mut results = Vec::new();
    each_over(container, |item, pos, whole| results.push(f(item, pos, whole)));
    results
}

/// Keep the elements for which `predicate` returns true
///
/// Mappings yield their matching values; key association is not kept.
pub fn filter_over<F>(container: &Value, mut predicate: F) -> Vec<Value>
where
    F: FnMut(&Value, Position<'_>, &Value) -> bool,
{
    let mut results = Vec::new();
    each_over(container, |item, pos, whole| {
        if predicate(item, pos, whole) {
            results.push(item.clone());
        }
    });
    results
}

/// Keep the elements for which `predicate` returns false
pub fn reject_from<F>(container: &Value, mut predicate: F) -> Vec<Value>
where
    F: FnMut(&Value, Position<'_>, &Value) -> bool,
{
    filter_over(container, |item, pos, whole| !predicate(item, pos, whole))
}

/// Left fold in traversal order
///
/// With `seed = None` the first element becomes the accumulator and folding
/// starts from the second element. An empty container with no seed yields
/// `Value::Undefined`.
pub fn reduce_over<F>(container: &Value, mut f: F, seed: Option<Value>) -> Value
where
    F: FnMut(Value, &Value, Position<'_>, &Value) -> Value,
{
    let mut acc = seed;
    each_over(container, |item, pos, whole| {
        acc = Some(match acc.take() {
            None => item.clone(),
            Some(memo) => f(memo, item, pos, whole),
        });
    });
    acc.unwrap_or_default()
}

/// True when `predicate` holds for every element (vacuously true)
///
/// The predicate is evaluated for every element; there is no early exit.
pub fn every_matches<F>(container: &Value, mut predicate: F) -> bool
where
    F: FnMut(&Value, Position<'_>, &Value) -> bool,
{
    reduce_over(
        container,
        |acc, item, pos, whole| {
            let matched = predicate(item, pos, whole);
            Value::Bool(matched && acc.is_truthy())
        },
        Some(Value::Bool(true)),
    )
    .is_truthy()
}

/// True when `predicate` holds for at least one element (vacuously false)
pub fn some_matches<F>(container: &Value, mut predicate: F) -> bool
where
    F: FnMut(&Value, Position<'_>, &Value) -> bool,
{
    reduce_over(
        container,
        |acc, item, pos, whole| {
            let matched = predicate(item, pos, whole);
            Value::Bool(matched || acc.is_truthy())
        },
        Some(Value::Bool(false)),
    )
    .is_truthy()
}

/// `every_matches` with element truthiness as the predicate
pub fn every_truthy(container: &Value) -> bool {
    every_matches(container, |item, _, _| item.is_truthy())
}

/// `some_matches` with element truthiness as the predicate
pub fn some_truthy(container: &Value) -> bool {
    some_matches(container, |item, _, _| item.is_truthy())
}

/// Extract `key` from every element
///
/// Elements that are not mappings (or lists, for Int keys), or that lack the
/// key, contribute `Value::Undefined`.
pub fn pluck_field(container: &Value, key: &MapKey) -> Vec<Value> {
    map_over(container, |item, _, _| {
        item.field(key).cloned().unwrap_or_default()
    })
}

/// Membership test
///
/// Sequences: true iff `value` occurs at an index >= `from_index` (default 0).
/// Mappings: true iff `value` is a *key* of the mapping. The two shapes
/// deliberately answer different questions.
pub fn contains_value(container: &Value, value: &Value, from_index: Option<usize>) -> bool {
    match Container::of(container) {
        Some(Container::Mapping(map)) => {
            MapKey::from_value(value).is_some_and(|key| map.contains_key(&key))
        }
        Some(_) => {
            let from = from_index.unwrap_or(0);
            reduce_over(
                container,
                |acc, item, pos, _| {
                    let hit = pos.index().is_some_and(|i| i >= from) && item == value;
                    Value::Bool(hit || acc.is_truthy())
                },
                Some(Value::Bool(false)),
            )
            .is_truthy()
        }
        None => {
            unsupported_container("contains_value", container);
            false
        }
    }
}

/// A random permutation of a sequence, or of a mapping's values
pub fn shuffle(container: &Value) -> Vec<Value> {
    match Container::of(container) {
        Some(Container::Sequence(items)) => permute_randomly(items),
        Some(Container::Mapping(map)) => permute_randomly(&values_of(map)),
        Some(Container::Text(_)) => permute_randomly(&map_over(container, |c, _, _| c.clone())),
        None => {
            unsupported_container("shuffle", container);
            Vec::new()
        }
    }
}
