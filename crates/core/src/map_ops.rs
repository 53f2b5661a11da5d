//! Mapping operations
//!
//! Merge helpers that mutate a target mapping from a list of sources. Each
//! source is walked with `each_over`, so a list source contributes its
//! indices as Int keys and a text source its character positions.

use crate::mapping::Mapping;
use crate::traversal::each_over;
use crate::value::Value;

/// Copy every key of every source into `target`
///
/// Sources are applied in order, so later sources win on conflict.
pub fn extend_into<'a>(target: &'a mut Mapping, sources: &[Value]) -> &'a mut Mapping {
    for source in sources {
        each_over(source, |value, pos, _| {
            target.insert(pos.to_key(), value.clone());
        });
    }
    target
}

/// Fill keys of `target` that are absent (or hold `Value::Undefined`)
///
/// Defaults are scanned in order, so the first default to supply a key wins.
pub fn apply_defaults<'a>(target: &'a mut Mapping, defaults: &[Value]) -> &'a mut Mapping {
    for defaults_source in defaults {
        each_over(defaults_source, |value, pos, _| {
            let key = pos.to_key();
            if target.get(&key).is_none_or(Value::is_undefined) {
                target.insert(key, value.clone());
            }
        });
    }
    target
}
