//! Source index: the recorded dump, keyed by message id.
//!
//! Built once before the loop and read-only afterwards. Line accounting:
//! - `bad`: blank, not a JSON object, id missing or not coercible to a
//!   non-empty string, send-time missing or not normalizable
//! - `duplicates`: valid line whose id is already indexed (first one wins)
//!
//! Neither kind is fatal. Zero indexed records is.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use qlat_schemas::EpochUnit;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::epoch::normalize_epoch;

/// One accepted dump line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub id: String,
    pub sent_time_us: i64,
    /// The original line, whitespace-trimmed but otherwise untouched.
    pub raw: Vec<u8>,
}

/// Which fields to read from each dump line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub id_field: String,
    pub sent_field: String,
    pub unit: EpochUnit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_lines: u64,
    pub indexed: u64,
    pub bad: u64,
    pub duplicates: u64,
}

#[derive(Debug)]
pub enum IndexError {
    Open { path: String, message: String },
    Read { path: String, message: String },
    /// Nothing to correlate against.
    Empty { path: String, stats: IndexStats },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::Open { path, message } => {
                write!(f, "open source dump '{path}': {message}")
            }
            IndexError::Read { path, message } => {
                write!(f, "read source dump '{path}': {message}")
            }
            IndexError::Empty { path, stats } => write!(
                f,
                "source dump '{path}' contains no valid records \
                 (lines={} bad={} dup={})",
                stats.total_lines, stats.bad, stats.duplicates
            ),
        }
    }
}

impl std::error::Error for IndexError {}

/// Coerce an id field to its string key.
///
/// Strings are trimmed and must be non-empty; numbers keep their source text
/// (serde_json `arbitrary_precision`) and booleans use their JSON text. `null`, arrays and objects are not ids.
pub(crate) fn coerce_id(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// id -> record. Iteration is in id order.
#[derive(Debug, Clone, Default)]
pub struct SourceIndex {
    records: BTreeMap<String, SourceRecord>,
}

impl SourceIndex {
    /// Index the JSONL dump at `path`.
    pub fn load(path: &Path, spec: &IndexSpec) -> Result<(Self, IndexStats), IndexError> {
        let label = path.display().to_string();
        let file = File::open(path).map_err(|e| IndexError::Open {
            path: label.clone(),
            message: e.to_string(),
        })?;
        Self::build(BufReader::new(file), spec, &label)
    }

    /// Index JSONL from any buffered reader.
    pub fn from_reader<R: BufRead>(
        reader: R,
        spec: &IndexSpec,
    ) -> Result<(Self, IndexStats), IndexError> {
        Self::build(reader, spec, "<reader>")
    }

    fn build<R: BufRead>(
        mut reader: R,
        spec: &IndexSpec,
        label: &str,
    ) -> Result<(Self, IndexStats), IndexError> {
        let mut records: BTreeMap<String, SourceRecord> = BTreeMap::new();
        let mut stats = IndexStats::default();
        let mut buf: Vec<u8> = Vec::new();

        loop {
            buf.clear();
            let n = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| IndexError::Read {
                    path: label.to_string(),
                    message: e.to_string(),
                })?;
            if n == 0 {
                break;
            }
            stats.total_lines += 1;

            let line = buf.trim_ascii();
            let (id, sent_time_us) = match parse_line(line, spec) {
                Ok(v) => v,
                Err(reason) => {
                    debug!(line = stats.total_lines, reason, "source line skipped");
                    stats.bad += 1;
                    continue;
                }
            };

            if records.contains_key(&id) {
                debug!(line = stats.total_lines, id = %id, "duplicate source id skipped");
                stats.duplicates += 1;
                continue;
            }

            records.insert(
                id.clone(),
                SourceRecord {
                    id,
                    sent_time_us,
                    raw: line.to_vec(),
                },
            );
            stats.indexed += 1;
        }

        if records.is_empty() {
            return Err(IndexError::Empty {
                path: label.to_string(),
                stats,
            });
        }
        Ok((Self { records }, stats))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SourceRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Records in id order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceRecord> {
        self.records.values()
    }
}

fn parse_line(line: &[u8], spec: &IndexSpec) -> Result<(String, i64), &'static str> {
    if line.is_empty() {
        return Err("blank");
    }
    let obj: Map<String, Value> = serde_json::from_slice(line).map_err(|_| "not_json_object")?;
    let id_val = obj.get(&spec.id_field).ok_or("missing_id")?;
    let id = coerce_id(id_val).ok_or("bad_id")?;
    let sent_val = obj.get(&spec.sent_field).ok_or("missing_sent")?;
    let sent = normalize_epoch(sent_val, spec.unit).map_err(|_| "bad_sent")?;
    Ok((id, sent))
}
