//! Epoch normalization: heterogeneous timestamp fields -> microsecond epoch.
//!
//! A raw JSON field is first decoded into a [`TimestampValue`], then scaled
//! with a unit hint. String decoding order is fixed:
//! 1. RFC 3339 with optional fractional seconds and a `Z` designator;
//!    numeric offsets such as `+03:00` are rejected
//! 2. naive ISO-8601 `YYYY-MM-DDTHH:MM:SS[.ffffff]`, read as UTC
//! 3. a purely numeric string, treated exactly like a JSON number
//!
//! ISO strings are self-describing; the unit hint is ignored for them.
//!
//! `Auto` classification by magnitude:
//!
//! | magnitude        | read as      |
//! |------------------|--------------|
//! | `>= 1e15`        | microseconds |
//! | `>= 1e12`        | milliseconds |
//! | `>= 1e9`         | seconds      |
//! | below            | rejected     |

use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use qlat_schemas::EpochUnit;
use serde_json::Value;

const NAIVE_ISO_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const AUTO_MICROS_MIN: u64 = 1_000_000_000_000_000;
const AUTO_MILLIS_MIN: u64 = 1_000_000_000_000;
const AUTO_SECONDS_MIN: u64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum TimestampError {
    /// Field was JSON `null`.
    Null,
    /// String was empty after trimming.
    Empty,
    /// Booleans, arrays and objects carry no timestamp.
    UnsupportedType(&'static str),
    /// String is neither ISO-8601 nor numeric.
    Unparseable(String),
    /// `auto` unit and the magnitude is below `1e9`.
    UndeterminablePrecision(String),
    /// Scaled value does not fit in `i64` microseconds.
    Overflow(String),
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampError::Null => write!(f, "timestamp is null"),
            TimestampError::Empty => write!(f, "timestamp is an empty string"),
            TimestampError::UnsupportedType(t) => {
                write!(f, "timestamp has unsupported JSON type {t}")
            }
            TimestampError::Unparseable(raw) => {
                write!(f, "timestamp '{raw}' is neither ISO-8601 nor numeric")
            }
            TimestampError::UndeterminablePrecision(raw) => {
                write!(f, "cannot determine epoch precision of {raw} (below 1e9)")
            }
            TimestampError::Overflow(raw) => {
                write!(f, "timestamp {raw} overflows i64 microseconds")
            }
        }
    }
}

impl std::error::Error for TimestampError {}

// ---------------------------------------------------------------------------
// Decoded value
// ---------------------------------------------------------------------------

/// A numeric epoch in an as-yet-unknown unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Int(i64),
    Float(f64),
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Int(i) => write!(f, "{i}"),
            Numeric::Float(x) => write!(f, "{x}"),
        }
    }
}

/// A timestamp field after type dispatch, before unit scaling.
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampValue {
    Number(Numeric),
    NumericString(Numeric),
    Iso(DateTime<Utc>),
}

impl TimestampValue {
    pub fn decode(v: &Value) -> Result<Self, TimestampError> {
        match v {
            Value::Null => Err(TimestampError::Null),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(TimestampValue::Number(Numeric::Int(i)))
                } else if n.is_u64() {
                    Err(TimestampError::Overflow(n.to_string()))
                } else {
                    n.as_f64()
                        .filter(|x| x.is_finite())
                        .map(|x| TimestampValue::Number(Numeric::Float(x)))
                        .ok_or_else(|| TimestampError::Unparseable(n.to_string()))
                }
            }
            Value::String(s) => decode_str(s),
            Value::Bool(_) => Err(TimestampError::UnsupportedType("bool")),
            Value::Array(_) => Err(TimestampError::UnsupportedType("array")),
            Value::Object(_) => Err(TimestampError::UnsupportedType("object")),
        }
    }

    /// Scale to microseconds. `unit` is ignored for ISO strings.
    pub fn to_micros(&self, unit: EpochUnit) -> Result<i64, TimestampError> {
        match self {
            TimestampValue::Iso(dt) => Ok(dt.timestamp_micros()),
            TimestampValue::Number(n) | TimestampValue::NumericString(n) => scale(*n, unit),
        }
    }
}

fn decode_str(s: &str) -> Result<TimestampValue, TimestampError> {
    let t = s.trim();
    if t.is_empty() {
        return Err(TimestampError::Empty);
    }

    if t.ends_with('Z') || t.ends_with('z') {
        if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
            return Ok(TimestampValue::Iso(dt.with_timezone(&Utc)));
        }
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(t, NAIVE_ISO_LAYOUT) {
        return Ok(TimestampValue::Iso(Utc.from_utc_datetime(&naive)));
    }

    if let Ok(i) = t.parse::<i64>() {
        return Ok(TimestampValue::NumericString(Numeric::Int(i)));
    }
    match t.parse::<f64>() {
        Ok(x) if x.is_finite() => Ok(TimestampValue::NumericString(Numeric::Float(x))),
        _ => Err(TimestampError::Unparseable(t.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Scaling
// ---------------------------------------------------------------------------

fn auto_factor(magnitude: u64, raw: Numeric) -> Result<i64, TimestampError> {
    if magnitude >= AUTO_MICROS_MIN {
        Ok(1)
    } else if magnitude >= AUTO_MILLIS_MIN {
        Ok(1_000)
    } else if magnitude >= AUTO_SECONDS_MIN {
        Ok(1_000_000)
    } else {
        Err(TimestampError::UndeterminablePrecision(raw.to_string()))
    }
}

fn scale(n: Numeric, unit: EpochUnit) -> Result<i64, TimestampError> {
    match n {
        Numeric::Int(i) => {
            let factor = match unit.micros_factor() {
                Some(f) => f,
                None => auto_factor(i.unsigned_abs(), n)?,
            };
            i.checked_mul(factor)
                .ok_or_else(|| TimestampError::Overflow(n.to_string()))
        }
        Numeric::Float(x) => {
            let factor = match unit.micros_factor() {
                Some(f) => f,
                // Saturating cast: anything >= 2^64 is already far past 1e15.
                None => auto_factor(x.abs().trunc() as u64, n)?,
            };
            let micros = (x * factor as f64).trunc();
            if micros.is_finite() && micros >= i64::MIN as f64 && micros < i64::MAX as f64 {
                Ok(micros as i64)
            } else {
                Err(TimestampError::Overflow(n.to_string()))
            }
        }
    }
}

/// Normalize a raw JSON field to a microsecond epoch.
pub fn normalize_epoch(v: &Value, unit: EpochUnit) -> Result<i64, TimestampError> {
    TimestampValue::decode(v)?.to_micros(unit)
}

/// Current wall-clock time in microseconds since the Unix epoch.
pub fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}
