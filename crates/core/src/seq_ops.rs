//! Sequence operations
//!
//! Operations that only make sense for ordered sequences: searching,
//! deduplication, set-like filtering, flattening, sorting and zipping.
//! Character sequences are accepted wherever a read-only sequence is.
//!
//! Binary searches assume ascending order under `Value::compare`. That is a
//! caller obligation and is never checked; violating it gives an unspecified
//! (but never panicking) answer.

use crate::combinators::{contains_value, filter_over, map_over, reduce_over};
use crate::error::expected_sequence;
use crate::traversal::{Container, each_over, sequence_items};
use crate::value::{MapKey, Value};
use std::cmp::Ordering;

/// Sort key for `sort_by_key`
pub enum SortKey {
    /// Read a field from each element (see `Value::field`)
    Field(MapKey),
    /// Compute the key with a function
    With(Box<dyn Fn(&Value) -> Value>),
}

impl SortKey {
    pub fn field(key: impl Into<MapKey>) -> Self {
        SortKey::Field(key.into())
    }

    pub fn with<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Value + 'static,
    {
        SortKey::With(Box::new(f))
    }

    fn extract(&self, item: &Value) -> Value {
        match self {
            SortKey::Field(key) => item.field(key).cloned().unwrap_or_default(),
            SortKey::With(f) => f(item),
        }
    }
}

impl std::fmt::Debug for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortKey::Field(key) => f.debug_tuple("Field").field(key).finish(),
            SortKey::With(_) => f.write_str("With(<fn>)"),
        }
    }
}

/// Deduplicate a sequence, keeping first occurrences in order
///
/// With `is_pre_sorted` each element is only compared against the last
/// emitted value, which is O(n) but only correct for sorted input.
pub fn unique_values(sequence: &Value, is_pre_sorted: bool) -> Vec<Value> {
    unique_values_by(sequence, is_pre_sorted, |item| item.clone())
}

/// Deduplicate the transformed elements
///
/// Equality is checked on `transform(element)` and the transformed values
/// are what gets emitted.
pub fn unique_values_by<F>(sequence: &Value, is_pre_sorted: bool, mut transform: F) -> Vec<Value>
where
    F: FnMut(&Value) -> Value,
{
    let mut result: Vec<Value> = Vec::new();
    each_over(sequence, |item, _, _| {
        let candidate = transform(item);
        let seen = if is_pre_sorted {
            result.last() == Some(&candidate)
        } else {
            result.contains(&candidate)
        };
        if !seen {
            result.push(candidate);
        }
    });
    result
}

/// Find `target` in a sequence
///
/// Unsorted: linear scan returning the index of the *last* match.
/// Sorted: binary search assuming ascending order.
/// None when the value is absent or the input is not a sequence.
pub fn index_of_value(sequence: &Value, target: &Value, is_sorted: bool) -> Option<usize> {
    let Some(items) = sequence_items(sequence) else {
        expected_sequence("index_of_value", sequence);
        return None;
    };

    if !is_sorted {
        let mut found = None;
        each_over(sequence, |item, pos, _| {
            if item == target {
                found = pos.index();
            }
        });
        return found;
    }

    let (mut lo, mut hi) = (0usize, items.len());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match items[mid].compare(target) {
            Some(Ordering::Equal) => return Some(mid),
            Some(Ordering::Less) => lo = mid + 1,
            _ => hi = mid,
        }
    }
    None
}

/// Index at which `value` should be inserted to keep `sorted` ascending
///
/// Returns the lowest such index (before any equal elements); 0 for an
/// empty sequence.
pub fn sorted_insert_index(sorted: &Value, value: &Value) -> usize {
    let Some(items) = sequence_items(sorted) else {
        expected_sequence("sorted_insert_index", sorted);
        return 0;
    };

    let (mut lo, mut hi) = (0usize, items.len());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if items[mid].compare(value) == Some(Ordering::Less) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Elements of the first sequence present in every other sequence
///
/// Base order and base duplicates are preserved.
pub fn intersection_of(sequences: &[Value]) -> Vec<Value> {
    let Some((base, others)) = sequences.split_first() else {
        return Vec::new();
    };
    filter_over(base, |item, _, _| {
        others.iter().all(|other| contains_value(other, item, None))
    })
}

/// Elements of the first sequence present in none of the other sequences
pub fn difference_of(sequences: &[Value]) -> Vec<Value> {
    let Some((base, others)) = sequences.split_first() else {
        return Vec::new();
    };
    filter_over(base, |item, _, _| {
        !others.iter().any(|other| contains_value(other, item, None))
    })
}

/// Flatten nested lists
///
/// `shallow` removes one level of nesting; otherwise nesting is removed to
/// any depth. Non-list elements pass through at their level.
pub fn flatten_sequence(sequence: &Value, shallow: bool) -> Vec<Value> {
    if Container::of(sequence).is_none() {
        expected_sequence("flatten_sequence", sequence);
        return Vec::new();
    }

    let flat = reduce_over(
        sequence,
        |acc, item, _, _| {
            let mut flat = match acc {
                Value::List(items) => items,
                _ => Vec::new(),
            };
            match item {
                Value::List(inner) if shallow => flat.extend(inner.iter().cloned()),
                Value::List(_) => flat.extend(flatten_sequence(item, false)),
                other => flat.push(other.clone()),
            }
            Value::List(flat)
        },
        Some(Value::List(Vec::new())),
    );

    match flat {
        Value::List(items) => items,
        _ => Vec::new(),
    }
}

/// Stable in-place ascending sort by a field or computed key
///
/// Keys are compared with `Value::sort_cmp`; elements with equal keys keep
/// their relative order. Non-list input is left untouched.
pub fn sort_by_key<'a>(sequence: &'a mut Value, key: &SortKey) -> &'a mut Value {
    match &mut *sequence {
        Value::List(items) => {
            let mut keyed: Vec<(Value, Value)> = items
                .drain(..)
                .map(|item| (key.extract(&item), item))
                .collect();
            // slice::sort_by is stable
            keyed.sort_by(|(a, _), (b, _)| a.sort_cmp(b));
            items.extend(keyed.into_iter().map(|(_, item)| item));
        }
        other => expected_sequence("sort_by_key", other),
    }
    sequence
}

/// Group the i-th elements of every sequence into tuples
///
/// The first sequence bounds the output length; shorter sequences
/// contribute `Value::Undefined`.
pub fn zip_sequences(sequences: &[Value]) -> Vec<Value> {
    let Some(first) = sequences.first() else {
        return Vec::new();
    };
    let columns: Vec<_> = sequences.iter().map(sequence_items).collect();

    map_over(first, |_, pos, _| {
        let i = pos.index().unwrap_or(usize::MAX);
        Value::List(
            columns
                .iter()
                .map(|column| {
                    column
                        .as_ref()
                        .and_then(|items| items.get(i))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect(),
        )
    })
}

/// First element, or the first `n` elements as a list
///
/// `Value::Undefined` for an empty sequence or a non-sequence.
pub fn first(sequence: &Value, n: Option<usize>) -> Value {
    let Some(items) = sequence_items(sequence) else {
        expected_sequence("first", sequence);
        return Value::Undefined;
    };
    match n {
        None => items.first().cloned().unwrap_or_default(),
        Some(n) => Value::List(items.iter().take(n).cloned().collect()),
    }
}

/// Last element, or the last `n` elements as a list
///
/// Mappings have no last element and give `Value::Undefined`.
pub fn last(sequence: &Value, n: Option<usize>) -> Value {
    let Some(items) = sequence_items(sequence) else {
        expected_sequence("last", sequence);
        return Value::Undefined;
    };
    match n {
        None => items.last().cloned().unwrap_or_default(),
        Some(n) => {
            let skip = items.len().saturating_sub(n);
            Value::List(items[skip..].to_vec())
        }
    }
}
