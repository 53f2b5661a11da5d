//! Configuration for the invocation-control wrappers
//!
//! Defaults apply when nothing is configured. A TOML file may override them:
//!
//! ```toml
//! [memoize]
//! eviction = "lru"   # "none" | "lru" | "ttl"
//! capacity = 512     # used by "lru"
//! ttl_ms = 30000     # used by "ttl"
//!
//! [throttle]
//! default_wait_ms = 250
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BELT_MEMO_EVICTION` | `none` | Memoization eviction: `none`, `lru` or `ttl` |
//! | `BELT_MEMO_CAPACITY` | `256` | LRU capacity (entries) |
//! | `BELT_MEMO_TTL_MS` | `60000` | TTL in milliseconds |
//! | `BELT_THROTTLE_WAIT_MS` | `100` | Default throttle window in milliseconds |
//!
//! Unparseable environment values are ignored with a warning and the
//! previous value is kept.

use crate::memoize::EvictionPolicy;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

pub const ENV_MEMO_EVICTION: &str = "BELT_MEMO_EVICTION";
pub const ENV_MEMO_CAPACITY: &str = "BELT_MEMO_CAPACITY";
pub const ENV_MEMO_TTL_MS: &str = "BELT_MEMO_TTL_MS";
pub const ENV_THROTTLE_WAIT_MS: &str = "BELT_THROTTLE_WAIT_MS";

/// Error loading configuration
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read
    Io(std::io::Error),
    /// The file is not valid configuration TOML
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read config: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Which eviction policy memoized wrappers use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionKind {
    #[default]
    None,
    Lru,
    Ttl,
}

impl EvictionKind {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" | "unbounded" => Some(EvictionKind::None),
            "lru" => Some(EvictionKind::Lru),
            "ttl" => Some(EvictionKind::Ttl),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MemoizeConfig {
    pub eviction: EvictionKind,
    pub capacity: usize,
    pub ttl_ms: u64,
}

impl Default for MemoizeConfig {
    fn default() -> Self {
        Self {
            eviction: EvictionKind::None,
            capacity: 256,
            ttl_ms: 60_000,
        }
    }
}

impl MemoizeConfig {
    pub fn policy(&self) -> EvictionPolicy {
        match self.eviction {
            EvictionKind::None => EvictionPolicy::Unbounded,
            EvictionKind::Lru => EvictionPolicy::Lru {
                capacity: self.capacity,
            },
            EvictionKind::Ttl => EvictionPolicy::Ttl {
                ttl: Duration::from_millis(self.ttl_ms),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    pub default_wait_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            default_wait_ms: 100,
        }
    }
}

impl ThrottleConfig {
    pub fn default_wait(&self) -> Duration {
        Duration::from_millis(self.default_wait_ms)
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BeltConfig {
    pub memoize: MemoizeConfig,
    pub throttle: ThrottleConfig,
}

impl BeltConfig {
    /// Parse configuration from a TOML string. Missing tables and keys take defaults.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply environment variable overrides on top of this configuration
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(eviction) = env_value(ENV_MEMO_EVICTION, EvictionKind::parse) {
            self.memoize.eviction = eviction;
        }
        if let Some(capacity) = env_value(ENV_MEMO_CAPACITY, |s| s.trim().parse().ok()) {
            self.memoize.capacity = capacity;
        }
        if let Some(ttl_ms) = env_value(ENV_MEMO_TTL_MS, |s| s.trim().parse().ok()) {
            self.memoize.ttl_ms = ttl_ms;
        }
        if let Some(wait_ms) = env_value(ENV_THROTTLE_WAIT_MS, |s| s.trim().parse().ok()) {
            self.throttle.default_wait_ms = wait_ms;
        }
        self
    }
}

fn env_value<T>(name: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        warn!("ignoring invalid {}={:?}", name, raw);
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BeltConfig::default();
        assert_eq!(config.memoize.policy(), EvictionPolicy::Unbounded);
        assert_eq!(config.memoize.capacity, 256);
        assert_eq!(config.throttle.default_wait(), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = BeltConfig::from_toml_str("[throttle]\ndefault_wait_ms = 250\n").unwrap();
        assert_eq!(config.throttle.default_wait_ms, 250);
        assert_eq!(config.memoize, MemoizeConfig::default());

        let empty = BeltConfig::from_toml_str("").unwrap();
        assert_eq!(empty, BeltConfig::default());
    }

    #[test]
    fn test_policy_from_toml() {
        let lru = BeltConfig::from_toml_str("[memoize]\neviction = \"lru\"\ncapacity = 8\n").unwrap();
        assert_eq!(lru.memoize.policy(), EvictionPolicy::Lru { capacity: 8 });

        let ttl = BeltConfig::from_toml_str("[memoize]\neviction = \"ttl\"\nttl_ms = 1500\n").unwrap();
        assert_eq!(
            ttl.memoize.policy(),
            EvictionPolicy::Ttl {
                ttl: Duration::from_millis(1500)
            }
        );
    }

    #[test]
    fn test_invalid_toml() {
        let result = BeltConfig::from_toml_str("[memoize]\neviction = \"fifo\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
        let err = result.unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse config"));
    }

    #[test]
    fn test_eviction_kind_parse() {
        assert_eq!(EvictionKind::parse(" LRU "), Some(EvictionKind::Lru));
        assert_eq!(EvictionKind::parse("unbounded"), Some(EvictionKind::None));
        assert_eq!(EvictionKind::parse("sometimes"), None);
    }
}
