//! Belt Core: collection combinators over a small dynamic value model
//!
//! This crate provides the time-independent half of the utility belt:
//! one traversal primitive and the combinators built on top of it.
//!
//! Key design principles:
//! - Value: what the combinators talk about (Int, String, List, Map, etc.)
//! - Container: the closed set of shapes a Value can be walked as
//!   (sequence, character sequence, mapping), decided at the call boundary
//! - each_over: the only code that knows traversal order; everything else
//!   is expressed through it or through reduce_over
//!
//! Combinators never panic and never return errors. Inputs outside their
//! contract produce an innocuous default and leave a note in the
//! thread-local contract violation channel (`error`).
//!
//! # Modules
//!
//! - `value`: Core Value enum and MapKey
//! - `mapping`: Insertion-ordered keyed mapping
//! - `traversal`: `each_over`, `Container`, `Position`
//! - `combinators`: map/filter/reject/reduce/every/some/pluck/contains/shuffle
//! - `seq_ops`: searching, dedup, set operations, flatten, sort, zip
//! - `map_ops`: extend and defaults
//! - `helpers`: random permutation and values-of collaborators
//! - `serialize`: bincode encoding and memoization cache keys
//! - `error`: Thread-local contract violation channel

pub mod combinators;
pub mod error;
pub mod helpers;
pub mod map_ops;
pub mod mapping;
pub mod seq_ops;
pub mod serialize;
pub mod traversal;
pub mod value;

// Re-export key types and functions
pub use mapping::Mapping;
pub use traversal::{Container, Position, each_over, sequence_items};
pub use value::{MapKey, Value};

pub use combinators::{
    contains_value, every_matches, every_truthy, filter_over, identity, map_over, pluck_field,
    reduce_over, reject_from, shuffle, some_matches, some_truthy,
};
pub use map_ops::{apply_defaults, extend_into};
pub use seq_ops::{
    SortKey, difference_of, first, flatten_sequence, index_of_value, intersection_of, last,
    sort_by_key, sorted_insert_index, unique_values, unique_values_by, zip_sequences,
};

pub use helpers::{permute_randomly, permute_with, values_of};

// Serialization
pub use serialize::{ArgsKey, SerializeError, ValueSerialize, args_key, value_from_bytes};

// Contract violations
pub use error::{clear_violation, has_violation, record_violation, take_violation};
