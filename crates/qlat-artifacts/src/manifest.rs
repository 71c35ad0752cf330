use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use qlat_reconcile::IndexStats;
use qlat_schemas::StopReason;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const RUN_MANIFEST_SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: i32,
    pub run_id: Uuid,
    pub started_at_utc: DateTime<Utc>,
    pub finished_at_utc: DateTime<Utc>,
    pub stop_reason: StopReason,
    pub config_hash: String,
    pub obs_queue: String,
    pub hold_queue: String,
    pub source_dump: String,
    pub source_dump_sha256: String,
    pub source_index: IndexStats,
    pub total_read: u64,
    pub ok: u64,
    pub bad: u64,
    pub lost: u64,
    /// `None` when restore was not requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored: Option<u64>,
    pub artifacts: ArtifactPaths,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub outcomes_jsonl: String,
    pub stats_json: String,
    pub lost_json: String,
    pub manifest_json: String,
}

/// Write (overwrite) the manifest as pretty JSON.
pub fn write_run_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    let json = serde_json::to_string_pretty(manifest).context("serialize manifest failed")?;
    fs::write(path, format!("{json}\n"))
        .with_context(|| format!("write manifest failed: {}", path.display()))?;
    Ok(())
}
