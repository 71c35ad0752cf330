//! qlat-config
//!
//! Configuration surface for the `qlat` binary.
//!
//! Layering (later wins):
//! 1. built-in defaults
//! 2. process environment (a `.env` file is loaded into it by the binary)
//! 3. command-line flags
//!
//! Everything is validated here, before any file or queue I/O. Validated
//! settings are plain data; consumers never re-read the environment.

mod env;
mod load_dump;
mod measure;
mod redis;

pub use env::{env_bool, env_i64, env_or, EnvLookup, ProcessEnv};
pub use load_dump::{LoadDumpConfig, LoadDumpSettings, DEFAULT_BATCH};
pub use measure::{resolve_hold_queue, MeasureConfig, MeasureSettings, MeasureWarning};
pub use redis::{RedisConfig, RedisOverrides, DEFAULT_REDIS_ADDR};

use std::fmt;

use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting is empty or absent.
    Missing(&'static str),
    /// A setting is present but not one of the accepted values.
    Invalid {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
    /// Observation and hold lists resolve to the same key.
    HoldEqualsObs(String),
    /// An environment variable could not be parsed.
    Env { var: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(field) => write!(f, "{field} is required"),
            ConfigError::Invalid {
                field,
                value,
                expected,
            } => write!(f, "{field} must be {expected} (got '{value}')"),
            ConfigError::HoldEqualsObs(q) => {
                write!(f, "hold queue must differ from observation queue ('{q}')")
            }
            ConfigError::Env { var, value } => write!(f, "invalid {var}='{value}'"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Compact JSON with object keys sorted, for hashing.
pub fn canonical_json<T: serde::Serialize>(v: &T) -> Result<String, serde_json::Error> {
    // serde_json::Map is BTreeMap-backed here, so a Value round-trip sorts keys.
    let value = serde_json::to_value(v)?;
    serde_json::to_string(&value)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub(crate) fn require(field: &'static str, value: &str) -> Result<String, ConfigError> {
    let t = value.trim();
    if t.is_empty() {
        return Err(ConfigError::Missing(field));
    }
    Ok(t.to_string())
}
