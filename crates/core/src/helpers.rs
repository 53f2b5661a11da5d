//! Collaborator helpers with a fixed contract
//!
//! - `permute_randomly`: uniformly random permutation, input untouched
//! - `values_of`: a mapping's values in enumeration order

use crate::mapping::Mapping;
use crate::value::Value;
use rand::Rng;
use rand::seq::SliceRandom;

/// Return a new, uniformly shuffled copy of `sequence`
pub fn permute_randomly(sequence: &[Value]) -> Vec<Value> {
    permute_with(sequence, &mut rand::thread_rng())
}

/// Like `permute_randomly`, drawing from the given generator
pub fn permute_with<R: Rng + ?Sized>(sequence: &[Value], rng: &mut R) -> Vec<Value> {
    let mut permuted = sequence.to_vec();
    permuted.shuffle(rng);
    permuted
}

/// Values of a mapping in enumeration order
pub fn values_of(mapping: &Mapping) -> Vec<Value> {
    mapping.values().cloned().collect()
}
