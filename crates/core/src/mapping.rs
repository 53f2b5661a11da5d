//! Insertion-ordered keyed mapping
//!
//! Enumeration order equals first-insertion order. Overwriting an existing
//! key replaces the value in place, so the key keeps its original position.
//! Lookups go through a side index, so `get` and `contains_key` are O(1).

use crate::value::{MapKey, Value};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct Mapping {
    entries: Vec<(MapKey, Value)>,
    index: HashMap<MapKey, usize>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &MapKey) -> Option<&Value> {
        self.index.get(key).map(|&slot| &self.entries[slot].1)
    }

    pub fn contains_key(&self, key: &MapKey) -> bool {
        self.index.contains_key(key)
    }

    /// Insert or overwrite, returning the previous value for the key
    pub fn insert(&mut self, key: MapKey, value: Value) -> Option<Value> {
        match self.index.get(&key) {
            Some(&slot) => Some(std::mem::replace(&mut self.entries[slot].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Entries in enumeration order
    pub fn iter(&self) -> impl Iterator<Item = (&MapKey, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &MapKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
}

// Two mappings are equal when they hold the same associations; enumeration
// order does not take part.
impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V> FromIterator<(K, V)> for Mapping
where
    K: Into<MapKey>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Mapping::new();
        for (k, v) in iter {
            map.insert(k.into(), v.into());
        }
        map
    }
}

// Serialized as a sequence of (key, value) pairs so that enumeration order
// survives a round trip and equal mappings built the same way encode to
// identical bytes.
impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter())
    }
}

impl<'de> Deserialize<'de> for Mapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<(MapKey, Value)>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}
