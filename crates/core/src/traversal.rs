//! Traversal kernel
//!
//! `each_over` is the one primitive that knows how to walk a container.
//! Every combinator in this crate is written in terms of it (directly or
//! through `reduce_over`), so there is exactly one notion of iteration order:
//!
//! - sequences visit indices `0..len` in increasing order
//! - character sequences visit each `char` as a one-character string
//! - mappings visit keys in enumeration (insertion) order
//!
//! Container shape is decided once, at the call boundary, by `Container::of`.
//! Values with no container view are skipped without visiting anything.

use crate::error::unsupported_container;
use crate::mapping::Mapping;
use crate::value::{MapKey, Value};
use std::borrow::Cow;

/// Where a visited element lives in its container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position<'a> {
    Index(usize),
    Key(&'a MapKey),
}

impl Position<'_> {
    pub fn index(&self) -> Option<usize> {
        match self {
            Position::Index(i) => Some(*i),
            Position::Key(_) => None,
        }
    }

    /// The position as a mapping key (indices become Int keys)
    pub fn to_key(&self) -> MapKey {
        match self {
            Position::Index(i) => MapKey::Int(*i as i64),
            Position::Key(k) => (*k).clone(),
        }
    }

    pub fn to_value(&self) -> Value {
        self.to_key().to_value()
    }
}

/// The container view of a value
#[derive(Debug, Clone, Copy)]
pub enum Container<'a> {
    Sequence(&'a [Value]),
    Text(&'a str),
    Mapping(&'a Mapping),
}

impl<'a> Container<'a> {
    /// Classify a value, or None if it is not a container
    pub fn of(value: &'a Value) -> Option<Self> {
        match value {
            Value::List(items) => Some(Container::Sequence(items)),
            Value::String(s) => Some(Container::Text(s)),
            Value::Map(map) => Some(Container::Mapping(map)),
            _ => None,
        }
    }

    /// Element count (chars for text, keys for mappings)
    pub fn len(&self) -> usize {
        match self {
            Container::Sequence(items) => items.len(),
            Container::Text(s) => s.chars().count(),
            Container::Mapping(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Visit every element of `container` in traversal order.
///
/// The visitor receives `(element, position, container)`. Returns
/// `container` itself so calls can be chained. Non-container values are a
/// no-op and record a contract violation.
///
/// The container is borrowed for the whole walk, so it cannot be mutated
/// from inside the visitor.
pub fn each_over<'a, F>(container: &'a Value, mut visitor: F) -> &'a Value
where
    F: FnMut(&Value, Position<'_>, &Value),
{
    match Container::of(container) {
        Some(Container::Sequence(items)) => {
            for (i, item) in items.iter().enumerate() {
                visitor(item, Position::Index(i), container);
            }
        }
        Some(Container::Text(text)) => {
            for (i, ch) in text.chars().enumerate() {
                let item = Value::String(ch.to_string());
                visitor(&item, Position::Index(i), container);
            }
        }
        Some(Container::Mapping(map)) => {
            for (key, value) in map.iter() {
                visitor(value, Position::Key(key), container);
            }
        }
        None => unsupported_container("each_over", container),
    }
    container
}

/// Random-access view of a sequence or character sequence.
///
/// Lists are borrowed; text is split into one-character strings. Mappings and
/// scalars have no indexable view.
pub fn sequence_items(value: &Value) -> Option<Cow<'_, [Value]>> {
    match Container::of(value)? {
        Container::Sequence(items) => Some(Cow::Borrowed(items)),
        Container::Text(_) => {
            let mut chars = Vec::new();
            each_over(value, |item, _, _| chars.push(item.clone()));
            Some(Cow::Owned(chars))
        }
        Container::Mapping(_) => None,
    }
}
