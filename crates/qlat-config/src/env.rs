//! Environment access.
//!
//! All env reads go through [`EnvLookup`] so tests can supply a map instead of
//! mutating the process environment.

use std::collections::BTreeMap;

use crate::ConfigError;

pub trait EnvLookup {
    fn get(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvLookup for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

/// Value of `key`, or `default` when unset or blank.
pub fn env_or<E: EnvLookup + ?Sized>(env: &E, key: &str, default: &str) -> String {
    match env.get(key) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default.to_string(),
    }
}

pub fn env_i64<E: EnvLookup + ?Sized>(
    env: &E,
    key: &'static str,
    default: i64,
) -> Result<i64, ConfigError> {
    match env.get(key) {
        Some(v) if !v.trim().is_empty() => v.trim().parse().map_err(|_| ConfigError::Env {
            var: key,
            value: v,
        }),
        _ => Ok(default),
    }
}

/// `1/true/yes/on` and `0/false/no/off`, case-insensitive.
pub fn env_bool<E: EnvLookup + ?Sized>(
    env: &E,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match env.get(key) {
        Some(v) if !v.trim().is_empty() => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Env { var: key, value: v }),
        },
        _ => Ok(default),
    }
}
