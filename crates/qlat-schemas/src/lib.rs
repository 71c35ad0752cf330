//! qlat-schemas
//!
//! Wire shapes shared by the measurement pipeline: the per-record outcome
//! line, the aggregate stats file, and the small enums that several crates
//! need to agree on: timestamp units, stop reasons, and the publisher's push
//! side and rewrite mode.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Timestamp units
// ---------------------------------------------------------------------------

/// Unit hint for a numeric epoch field.
///
/// `Auto` classifies by magnitude (see `qlat_reconcile::epoch`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpochUnit {
    Auto,
    #[serde(rename = "s")]
    Seconds,
    #[serde(rename = "ms")]
    Millis,
    #[serde(rename = "us")]
    Micros,
}

impl EpochUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            EpochUnit::Auto => "auto",
            EpochUnit::Seconds => "s",
            EpochUnit::Millis => "ms",
            EpochUnit::Micros => "us",
        }
    }

    /// Parse a unit token. Case-insensitive, surrounding whitespace ignored.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(EpochUnit::Auto),
            "s" => Some(EpochUnit::Seconds),
            "ms" => Some(EpochUnit::Millis),
            "us" => Some(EpochUnit::Micros),
            _ => None,
        }
    }

    /// Multiplier to microseconds for explicit units. `None` for `Auto`.
    pub fn micros_factor(&self) -> Option<i64> {
        match self {
            EpochUnit::Auto => None,
            EpochUnit::Seconds => Some(1_000_000),
            EpochUnit::Millis => Some(1_000),
            EpochUnit::Micros => Some(1),
        }
    }
}

impl fmt::Display for EpochUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Per-record outcome
// ---------------------------------------------------------------------------

/// One line of the per-record output stream.
///
/// `ok == true` iff both `serve_us` and `latency_us` resolved and are
/// non-negative. Absent fields are omitted from the JSON line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_sent_us: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_sent_us: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serve_us: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_us: Option<i64>,
}

// ---------------------------------------------------------------------------
// Aggregate stats file
// ---------------------------------------------------------------------------

/// Nearest-rank percentiles of one sample series, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentileStats {
    pub p50_us: i64,
    pub p90_us: i64,
    pub p95_us: i64,
    pub p99_us: i64,
    pub max_us: i64,
}

/// Contents of `<out>.stats.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsFile {
    pub total_read: u64,
    pub ok: u64,
    pub bad: u64,
    pub duration_sec: f64,
    pub ok_throughput_msg_s: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serve_us: Option<PercentileStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_us: Option<PercentileStats>,
}

// ---------------------------------------------------------------------------
// Loop termination
// ---------------------------------------------------------------------------

/// Why the reconciliation loop left `RUNNING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Wall-clock deadline passed before every indexed id was observed
    /// (or exactly as the last one arrived on a previous iteration).
    Timeout,
    /// Every indexed id was observed at least once.
    AllFound,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Timeout => "timeout",
            StopReason::AllFound => "all_found",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Publisher push side
// ---------------------------------------------------------------------------

/// Which end of a list a publisher appends to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushSide {
    /// Append at the tail (`RPUSH`). Consumers popping the tail see LIFO order.
    Rpush,
    /// Prepend at the head (`LPUSH`).
    Lpush,
}

impl PushSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PushSide::Rpush => "rpush",
            PushSide::Lpush => "lpush",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rpush" => Some(PushSide::Rpush),
            "lpush" => Some(PushSide::Lpush),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Dump rewrite mode
// ---------------------------------------------------------------------------

/// How the dump rewriter assigns send times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewriteMode {
    /// Every line gets the base value.
    Same,
    /// The k-th accepted line gets `base + k * step`.
    Increment,
}

impl RewriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewriteMode::Same => "same",
            RewriteMode::Increment => "increment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "same" => Some(RewriteMode::Same),
            "increment" => Some(RewriteMode::Increment),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_unit_parse() {
        assert_eq!(EpochUnit::parse(" AUTO "), Some(EpochUnit::Auto));
        assert_eq!(EpochUnit::parse("s"), Some(EpochUnit::Seconds));
        assert_eq!(EpochUnit::parse("Ms"), Some(EpochUnit::Millis));
        assert_eq!(EpochUnit::parse("us"), Some(EpochUnit::Micros));
        assert_eq!(EpochUnit::parse("ns"), None);
        assert_eq!(EpochUnit::parse(""), None);
    }

    #[test]
    fn outcome_omits_absent_fields() {
        let o = Outcome {
            ok: false,
            error: Some("source_not_found".to_string()),
            message_id: Some("a".to_string()),
            ..Outcome::default()
        };
        let line = serde_json::to_string(&o).unwrap();
        assert_eq!(
            line,
            r#"{"ok":false,"error":"source_not_found","message_id":"a"}"#
        );
    }

    #[test]
    fn stats_file_omits_series_when_no_ok_records() {
        let s = StatsFile {
            total_read: 2,
            ok: 0,
            bad: 2,
            duration_sec: 1.5,
            ok_throughput_msg_s: 0.0,
            serve_us: None,
            latency_us: None,
        };
        let v = serde_json::to_value(&s).unwrap();
        assert!(v.get("serve_us").is_none());
        assert!(v.get("latency_us").is_none());
        assert_eq!(v["total_read"], 2);
    }

    #[test]
    fn stop_reason_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&StopReason::AllFound).unwrap(),
            r#""all_found""#
        );
    }
}
