//! Serialization of Values
//!
//! `Value` and `Mapping` implement serde's traits directly, and this module
//! adds the bincode plumbing on top:
//!
//! - `ValueSerialize::to_bytes` / `value_from_bytes` for round trips
//! - `args_key`, which turns an argument list into a cache key for
//!   memoization
//!
//! # Cache keys
//!
//! Two argument lists produce the same `ArgsKey` exactly when they serialize
//! to the same bytes. That is structural equality on the serialized form, not
//! `PartialEq`: `Int(1)` and `Float(1.0)` are equal values but distinct keys,
//! and mappings with the same entries in different orders are distinct keys.
//!
//! Non-finite floats are rejected, since NaN payloads and infinities make
//! byte equality a poor stand-in for argument equality.

use crate::value::Value;
use std::fmt;

/// Error during serialization/deserialization
#[derive(Debug)]
pub enum SerializeError {
    /// Bincode encoding/decoding error (preserves original error for debugging)
    BincodeError(Box<bincode::Error>),
    /// Non-finite float (NaN or Infinity)
    NonFiniteFloat(f64),
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializeError::BincodeError(e) => write!(f, "Bincode error: {}", e),
            SerializeError::NonFiniteFloat(v) => {
                write!(f, "Cannot serialize non-finite float: {}", v)
            }
        }
    }
}

impl std::error::Error for SerializeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SerializeError::BincodeError(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<bincode::Error> for SerializeError {
    fn from(e: bincode::Error) -> Self {
        SerializeError::BincodeError(Box::new(e))
    }
}

/// Serialized argument list, usable as a hash map key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArgsKey(Vec<u8>);

impl ArgsKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Build the cache key for an argument list
pub fn args_key(args: &[Value]) -> Result<ArgsKey, SerializeError> {
    for arg in args {
        ensure_finite(arg)?;
    }
    Ok(ArgsKey(bincode::serialize(args)?))
}

fn ensure_finite(value: &Value) -> Result<(), SerializeError> {
    match value {
        Value::Float(x) if !x.is_finite() => Err(SerializeError::NonFiniteFloat(*x)),
        Value::List(items) => items.iter().try_for_each(ensure_finite),
        Value::Map(map) => map.values().try_for_each(ensure_finite),
        _ => Ok(()),
    }
}

/// Extension trait for Value to add serialization methods
pub trait ValueSerialize {
    /// Serialize to binary format (bincode)
    fn to_bytes(&self) -> Result<Vec<u8>, SerializeError>;
}

impl ValueSerialize for Value {
    fn to_bytes(&self) -> Result<Vec<u8>, SerializeError> {
        ensure_finite(self)?;
        bincode::serialize(self).map_err(SerializeError::from)
    }
}

/// Deserialize from binary format (bincode)
pub fn value_from_bytes(bytes: &[u8]) -> Result<Value, SerializeError> {
    bincode::deserialize(bytes).map_err(SerializeError::from)
}
