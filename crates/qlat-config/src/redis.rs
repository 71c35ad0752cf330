//! Redis connection settings.
//!
//! Env: `REDIS_URL` (preferred), else `REDIS_ADDR` / `REDIS_PASS` / `REDIS_DB`.
//! Passwords are redacted in `Debug` output.

use std::fmt;

use crate::env::{env_i64, env_or, EnvLookup};
use crate::ConfigError;

pub const DEFAULT_REDIS_ADDR: &str = "127.0.0.1:6379";

#[derive(Clone, PartialEq, Eq)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub addr: String,
    pub pass: String,
    pub db: i64,
}

impl fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisConfig")
            .field("url", &self.url.as_ref().map(|_| "<REDACTED>"))
            .field("addr", &self.addr)
            .field("pass", &(!self.pass.is_empty()).then_some("<REDACTED>"))
            .field("db", &self.db)
            .finish()
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            addr: DEFAULT_REDIS_ADDR.to_string(),
            pass: String::new(),
            db: 0,
        }
    }
}

/// Explicit command-line values. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct RedisOverrides {
    pub url: Option<String>,
    pub addr: Option<String>,
    pub pass: Option<String>,
    pub db: Option<i64>,
}

impl RedisConfig {
    pub fn from_env<E: EnvLookup + ?Sized>(env: &E) -> Result<Self, ConfigError> {
        let url = Some(env_or(env, "REDIS_URL", "")).filter(|u| !u.is_empty());
        Ok(Self {
            url,
            addr: env_or(env, "REDIS_ADDR", DEFAULT_REDIS_ADDR),
            pass: env.get("REDIS_PASS").unwrap_or_default(),
            db: env_i64(env, "REDIS_DB", 0)?,
        })
    }

    /// Apply flags on top of env. Any explicit addr/pass/db drops an
    /// env-provided URL; an explicit URL always wins.
    pub fn apply(&mut self, o: &RedisOverrides) {
        if o.addr.is_some() || o.pass.is_some() || o.db.is_some() {
            self.url = None;
        }
        if let Some(addr) = &o.addr {
            self.addr = addr.trim().to_string();
        }
        if let Some(pass) = &o.pass {
            self.pass = pass.clone();
        }
        if let Some(db) = o.db {
            self.db = db;
        }
        if let Some(url) = o.url.as_ref().filter(|u| !u.trim().is_empty()) {
            self.url = Some(url.trim().to_string());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_none() && self.addr.trim().is_empty() {
            return Err(ConfigError::Missing("redis addr"));
        }
        if self.db < 0 {
            return Err(ConfigError::Invalid {
                field: "redis db",
                value: self.db.to_string(),
                expected: ">= 0",
            });
        }
        Ok(())
    }

    /// `redis://[:pass@]addr/db`, or the configured URL verbatim.
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        if self.pass.is_empty() {
            format!("redis://{}/{}", self.addr, self.db)
        } else {
            format!("redis://:{}@{}/{}", self.pass, self.addr, self.db)
        }
    }

    /// Where we connect, safe to log.
    pub fn display_target(&self) -> String {
        match &self.url {
            Some(_) => "REDIS_URL".to_string(),
            None => format!("{}/{}", self.addr, self.db),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_without_env() {
        let c = RedisConfig::from_env(&env(&[])).unwrap();
        assert_eq!(c, RedisConfig::default());
        assert_eq!(c.connection_url(), "redis://127.0.0.1:6379/0");
    }

    #[test]
    fn url_from_env_is_preferred() {
        let c = RedisConfig::from_env(&env(&[
            ("REDIS_URL", "redis://cache:6380/2"),
            ("REDIS_ADDR", "ignored:1"),
        ]))
        .unwrap();
        assert_eq!(c.connection_url(), "redis://cache:6380/2");
    }

    #[test]
    fn explicit_addr_flag_clears_env_url() {
        let mut c = RedisConfig::from_env(&env(&[("REDIS_URL", "redis://cache:6380/2")])).unwrap();
        c.apply(&RedisOverrides {
            addr: Some("10.0.0.5:6379".to_string()),
            pass: Some("pw".to_string()),
            ..RedisOverrides::default()
        });
        assert_eq!(c.connection_url(), "redis://:pw@10.0.0.5:6379/0");
    }

    #[test]
    fn explicit_url_flag_wins() {
        let mut c = RedisConfig::default();
        c.apply(&RedisOverrides {
            url: Some("redis://u:p@h:1/3".to_string()),
            db: Some(9),
            ..RedisOverrides::default()
        });
        assert_eq!(c.connection_url(), "redis://u:p@h:1/3");
    }

    #[test]
    fn debug_redacts_password() {
        let c = RedisConfig {
            pass: "hunter2".to_string(),
            ..RedisConfig::default()
        };
        let s = format!("{c:?}");
        assert!(!s.contains("hunter2"));
        assert!(s.contains("<REDACTED>"));
    }

    #[test]
    fn negative_db_rejected() {
        let c = RedisConfig {
            db: -1,
            ..RedisConfig::default()
        };
        assert!(c.validate().is_err());
    }
}
