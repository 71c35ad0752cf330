//! qlat-artifacts
//!
//! Durable outputs of a measurement run:
//! - `<out>.jsonl`: one outcome per observed message, streamed
//! - `<out>.stats.json`: aggregate counters and percentiles
//! - lost manifest: verbatim source lines never observed
//! - `<out>.manifest.json`: run identity, config hash, artifact paths
//!
//! Written once per run. Nothing here talks to the queue.

mod files;
mod manifest;
mod outcomes;
mod paths;

pub use files::{sha256_file, write_lost_json, write_stats_json};
pub use manifest::{write_run_manifest, ArtifactPaths, RunManifest, RUN_MANIFEST_SCHEMA_VERSION};
pub use outcomes::JsonlOutcomeWriter;
pub use paths::{manifest_path_for, stats_path_for};
