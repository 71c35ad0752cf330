//! `measure` settings: raw input, validation, effective settings, hash.

use std::path::PathBuf;
use std::time::Duration;

use qlat_schemas::EpochUnit;
use serde::Serialize;

use crate::{canonical_json, require, sha256_hex, ConfigError};

/// Longest accepted run window (30 days).
pub const MAX_DURATION_SEC: u64 = 30 * 24 * 60 * 60;

/// Raw values as layered from defaults and flags. Not yet validated.
#[derive(Debug, Clone)]
pub struct MeasureConfig {
    pub obs_queue: String,
    /// Empty means `<obs_queue>:hold`.
    pub hold_queue: String,
    pub source_dump: String,
    pub out_jsonl: String,
    pub lost_json: String,
    pub duration_sec: u64,
    pub block_sec: u64,
    pub id_field: String,
    pub source_sent_field: String,
    pub source_sent_unit: String,
    pub result_sent_field: String,
    pub result_sent_unit: String,
    pub restore: bool,
    pub verify_empty: bool,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            obs_queue: String::new(),
            hold_queue: String::new(),
            source_dump: String::new(),
            out_jsonl: "latency.jsonl".to_string(),
            lost_json: "lost.json".to_string(),
            duration_sec: 600,
            block_sec: 1,
            id_field: "message_id".to_string(),
            source_sent_field: "sent_epoch".to_string(),
            source_sent_unit: "auto".to_string(),
            result_sent_field: "sent_epoch".to_string(),
            result_sent_unit: "auto".to_string(),
            restore: false,
            verify_empty: false,
        }
    }
}

/// Non-fatal configuration findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureWarning {
    /// `verify_empty` only applies to a restore.
    VerifyEmptyWithoutRestore,
}

impl MeasureWarning {
    pub fn message(&self) -> &'static str {
        match self {
            MeasureWarning::VerifyEmptyWithoutRestore => {
                "verify-empty has no effect without restore; ignoring"
            }
        }
    }
}

/// Effective, validated settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeasureSettings {
    pub obs_queue: String,
    pub hold_queue: String,
    pub source_dump: PathBuf,
    pub out_jsonl: String,
    pub lost_json: PathBuf,
    pub duration_sec: u64,
    pub block_sec: u64,
    pub id_field: String,
    pub source_sent_field: String,
    pub source_sent_unit: EpochUnit,
    pub result_sent_field: String,
    pub result_sent_unit: EpochUnit,
    pub restore: bool,
    pub verify_empty: bool,
}

fn parse_unit(field: &'static str, value: &str) -> Result<EpochUnit, ConfigError> {
    EpochUnit::parse(value).ok_or_else(|| ConfigError::Invalid {
        field,
        value: value.to_string(),
        expected: "one of auto|s|ms|us",
    })
}

/// Hold list for `obs_queue`: `hold` if given, else `<obs_queue>:hold`.
/// The two must differ.
pub fn resolve_hold_queue(obs_queue: &str, hold: &str) -> Result<String, ConfigError> {
    let hold_queue = match hold.trim() {
        "" => format!("{obs_queue}:hold"),
        h => h.to_string(),
    };
    if hold_queue == obs_queue {
        return Err(ConfigError::HoldEqualsObs(obs_queue.to_string()));
    }
    Ok(hold_queue)
}

impl MeasureConfig {
    pub fn validate(&self) -> Result<(MeasureSettings, Vec<MeasureWarning>), ConfigError> {
        let obs_queue = require("obs queue", &self.obs_queue)?;
        let source_dump = require("source dump", &self.source_dump)?;
        let id_field = require("id field", &self.id_field)?;
        let source_sent_field = require("source sent field", &self.source_sent_field)?;
        let result_sent_field = require("result sent field", &self.result_sent_field)?;
        let source_sent_unit = parse_unit("source sent unit", &self.source_sent_unit)?;
        let result_sent_unit = parse_unit("result sent unit", &self.result_sent_unit)?;

        if self.duration_sec == 0 {
            return Err(ConfigError::Invalid {
                field: "duration",
                value: "0".to_string(),
                expected: "> 0 seconds",
            });
        }
        if self.duration_sec > MAX_DURATION_SEC {
            return Err(ConfigError::Invalid {
                field: "duration",
                value: self.duration_sec.to_string(),
                expected: "<= 2592000 seconds (30 days)",
            });
        }
        if self.block_sec == 0 {
            return Err(ConfigError::Invalid {
                field: "block",
                value: "0".to_string(),
                expected: "> 0 seconds",
            });
        }

        let hold_queue = resolve_hold_queue(&obs_queue, &self.hold_queue)?;

        let lost_json = match self.lost_json.trim() {
            "" => "lost.json",
            p => p,
        };

        let mut warnings = Vec::new();
        if self.verify_empty && !self.restore {
            warnings.push(MeasureWarning::VerifyEmptyWithoutRestore);
        }

        Ok((
            MeasureSettings {
                obs_queue,
                hold_queue,
                source_dump: PathBuf::from(source_dump),
                out_jsonl: match self.out_jsonl.trim() {
                    "" => "latency.jsonl".to_string(),
                    p => p.to_string(),
                },
                lost_json: PathBuf::from(lost_json),
                duration_sec: self.duration_sec,
                block_sec: self.block_sec,
                id_field,
                source_sent_field,
                source_sent_unit,
                result_sent_field,
                result_sent_unit,
                restore: self.restore,
                verify_empty: self.verify_empty && self.restore,
            },
            warnings,
        ))
    }
}

impl MeasureSettings {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_sec)
    }

    pub fn block(&self) -> Duration {
        Duration::from_secs(self.block_sec)
    }

    /// SHA-256 over the canonical JSON of these settings.
    pub fn config_hash(&self) -> Result<String, serde_json::Error> {
        Ok(sha256_hex(canonical_json(self)?.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> MeasureConfig {
        MeasureConfig {
            obs_queue: "results".to_string(),
            source_dump: "dump.jsonl".to_string(),
            ..MeasureConfig::default()
        }
    }

    #[test]
    fn defaults_resolve_hold_queue() {
        let (s, w) = base().validate().unwrap();
        assert_eq!(s.hold_queue, "results:hold");
        assert_eq!(s.duration(), Duration::from_secs(600));
        assert_eq!(s.block(), Duration::from_secs(1));
        assert_eq!(s.source_sent_unit, EpochUnit::Auto);
        assert_eq!(s.lost_json, PathBuf::from("lost.json"));
        assert!(w.is_empty());
    }

    #[test]
    fn required_fields() {
        let mut c = base();
        c.obs_queue = "  ".to_string();
        assert_eq!(c.validate().unwrap_err(), ConfigError::Missing("obs queue"));

        let mut c = base();
        c.source_dump.clear();
        assert_eq!(c.validate().unwrap_err(), ConfigError::Missing("source dump"));

        let mut c = base();
        c.result_sent_field.clear();
        assert_eq!(c.validate().unwrap_err(), ConfigError::Missing("result sent field"));
    }

    #[test]
    fn unit_must_be_known() {
        let mut c = base();
        c.result_sent_unit = "ns".to_string();
        assert!(matches!(
            c.validate().unwrap_err(),
            ConfigError::Invalid {
                field: "result sent unit",
                ..
            }
        ));

        let mut c = base();
        c.source_sent_unit = " MS ".to_string();
        assert_eq!(c.validate().unwrap().0.source_sent_unit, EpochUnit::Millis);
    }

    #[test]
    fn zero_windows_rejected() {
        let mut c = base();
        c.duration_sec = 0;
        assert!(c.validate().is_err());

        let mut c = base();
        c.block_sec = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn oversized_duration_rejected() {
        let mut c = base();
        c.duration_sec = u64::MAX;
        assert_eq!(
            c.validate().unwrap_err(),
            ConfigError::Invalid {
                field: "duration",
                value: u64::MAX.to_string(),
                expected: "<= 2592000 seconds (30 days)",
            }
        );

        let mut c = base();
        c.duration_sec = MAX_DURATION_SEC;
        assert_eq!(c.validate().unwrap().0.duration_sec, MAX_DURATION_SEC);
    }

    #[test]
    fn hold_equal_to_obs_rejected() {
        let mut c = base();
        c.hold_queue = "results".to_string();
        assert_eq!(
            c.validate().unwrap_err(),
            ConfigError::HoldEqualsObs("results".to_string())
        );
    }

    #[test]
    fn verify_empty_without_restore_warns() {
        let mut c = base();
        c.verify_empty = true;
        let (s, w) = c.validate().unwrap();
        assert_eq!(w, vec![MeasureWarning::VerifyEmptyWithoutRestore]);
        assert!(!s.verify_empty);
    }
}
