use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use qlat_artifacts::{
    manifest_path_for, sha256_file, stats_path_for, write_lost_json, write_run_manifest,
    write_stats_json, ArtifactPaths, JsonlOutcomeWriter, RunManifest, RUN_MANIFEST_SCHEMA_VERSION,
};
use qlat_config::{MeasureConfig, MeasureSettings};
use qlat_reconcile::{
    restore, run_reconciliation, IndexSpec, ReconcileParams, ReconcileSummary, SourceIndex,
};
use qlat_schemas::PercentileStats;
use tracing::{info, warn};
use uuid::Uuid;

use super::{connect, redis_config};
use crate::RedisArgs;

#[derive(Args, Debug)]
pub struct MeasureArgs {
    /// Observation list the service writes results to.
    #[arg(long = "obs")]
    pub obs_queue: Option<String>,

    /// Quarantine list [default: <obs>:hold]
    #[arg(long = "hold")]
    pub hold_queue: Option<String>,

    /// Source dump (JSONL) of what was sent.
    #[arg(long = "source-dump")]
    pub source_dump: Option<String>,

    /// Per-record outcomes [default: latency.jsonl]
    #[arg(long = "out")]
    pub out_jsonl: Option<String>,

    /// Lost manifest [default: lost.json]
    #[arg(long)]
    pub lost_json: Option<String>,

    /// Measurement window in seconds [default: 600]
    #[arg(long = "duration")]
    pub duration_sec: Option<u64>,

    /// Max wait per dequeue in seconds [default: 1]
    #[arg(long = "block")]
    pub block_sec: Option<u64>,

    /// [default: message_id]
    #[arg(long)]
    pub id_field: Option<String>,

    /// [default: sent_epoch]
    #[arg(long)]
    pub source_sent_field: Option<String>,

    /// auto|s|ms|us [default: auto]
    #[arg(long)]
    pub source_sent_unit: Option<String>,

    /// [default: sent_epoch]
    #[arg(long)]
    pub result_sent_field: Option<String>,

    /// auto|s|ms|us [default: auto]
    #[arg(long)]
    pub result_sent_unit: Option<String>,

    /// Move quarantined messages back when done.
    #[arg(long, default_value_t = false)]
    pub restore: bool,

    /// With --restore: refuse unless the observation list is empty.
    #[arg(long, default_value_t = false)]
    pub verify_empty: bool,
}

impl MeasureArgs {
    fn to_config(&self) -> MeasureConfig {
        let d = MeasureConfig::default();
        MeasureConfig {
            obs_queue: self.obs_queue.clone().unwrap_or(d.obs_queue),
            hold_queue: self.hold_queue.clone().unwrap_or(d.hold_queue),
            source_dump: self.source_dump.clone().unwrap_or(d.source_dump),
            out_jsonl: self.out_jsonl.clone().unwrap_or(d.out_jsonl),
            lost_json: self.lost_json.clone().unwrap_or(d.lost_json),
            duration_sec: self.duration_sec.unwrap_or(d.duration_sec),
            block_sec: self.block_sec.unwrap_or(d.block_sec),
            id_field: self.id_field.clone().unwrap_or(d.id_field),
            source_sent_field: self.source_sent_field.clone().unwrap_or(d.source_sent_field),
            source_sent_unit: self.source_sent_unit.clone().unwrap_or(d.source_sent_unit),
            result_sent_field: self.result_sent_field.clone().unwrap_or(d.result_sent_field),
            result_sent_unit: self.result_sent_unit.clone().unwrap_or(d.result_sent_unit),
            restore: self.restore,
            verify_empty: self.verify_empty,
        }
    }
}

fn reconcile_params(s: &MeasureSettings) -> ReconcileParams {
    ReconcileParams {
        obs_list: s.obs_queue.clone(),
        hold_list: s.hold_queue.clone(),
        duration: s.duration(),
        block: s.block(),
        id_field: s.id_field.clone(),
        result_sent_field: s.result_sent_field.clone(),
        result_sent_unit: s.result_sent_unit,
    }
}

fn log_percentiles(series: &str, p: Option<&PercentileStats>) {
    if let Some(p) = p {
        info!(
            series,
            p50_us = p.p50_us,
            p90_us = p.p90_us,
            p95_us = p.p95_us,
            p99_us = p.p99_us,
            max_us = p.max_us,
            "percentiles"
        );
    }
}

fn log_summary(summary: &ReconcileSummary) {
    info!(stop_reason = %summary.stop_reason, "stopped");
    let stats = summary.stats_file();
    info!(
        total_read = stats.total_read,
        ok = stats.ok,
        bad = stats.bad,
        duration_sec = stats.duration_sec,
        ok_throughput_msg_s = stats.ok_throughput_msg_s,
        "result"
    );
    log_percentiles("serve_us", stats.serve_us.as_ref());
    log_percentiles("latency_us", stats.latency_us.as_ref());
}

pub fn run(args: MeasureArgs, redis_args: &RedisArgs) -> Result<()> {
    let (settings, warnings) = args.to_config().validate().context("invalid measure config")?;
    for w in &warnings {
        warn!("{}", w.message());
    }
    let redis = redis_config(redis_args)?;
    let config_hash = settings.config_hash().context("hash measure config")?;

    let run_id = Uuid::new_v4();
    let started_at_utc = Utc::now();

    let spec = IndexSpec {
        id_field: settings.id_field.clone(),
        sent_field: settings.source_sent_field.clone(),
        unit: settings.source_sent_unit,
    };
    let (index, index_stats) =
        SourceIndex::load(&settings.source_dump, &spec).context("load source index")?;
    info!(
        total = index_stats.total_lines,
        indexed = index_stats.indexed,
        bad = index_stats.bad,
        dup = index_stats.duplicates,
        "source index loaded"
    );
    let source_dump_sha256 = sha256_file(&settings.source_dump)?;

    let mut transport = connect(&redis)?;

    let out_path = Path::new(&settings.out_jsonl);
    let mut writer = JsonlOutcomeWriter::create(out_path)?;
    let params = reconcile_params(&settings);
    info!(
        %run_id,
        obs = %settings.obs_queue,
        hold = %settings.hold_queue,
        out = %settings.out_jsonl,
        "measuring"
    );

    let summary = run_reconciliation(&mut transport, &index, &params, &mut writer)
        .context("reconciliation aborted")?;
    log_summary(&summary);

    let lost = summary.lost(&index);
    write_lost_json(&settings.lost_json, &lost)?;
    info!(lost = lost.len(), path = %settings.lost_json.display(), "lost manifest written");

    let stats_path = stats_path_for(&settings.out_jsonl);
    write_stats_json(&stats_path, &summary.stats_file())?;
    info!(path = %stats_path.display(), "stats written");

    let restore_result = settings.restore.then(|| {
        restore(
            &mut transport,
            &settings.obs_queue,
            &settings.hold_queue,
            settings.verify_empty,
        )
    });
    let restored = match &restore_result {
        Some(Ok(r)) => Some(r.moved_back),
        _ => None,
    };

    let manifest_path = manifest_path_for(&settings.out_jsonl);
    let manifest = RunManifest {
        schema_version: RUN_MANIFEST_SCHEMA_VERSION,
        run_id,
        started_at_utc,
        finished_at_utc: Utc::now(),
        stop_reason: summary.stop_reason,
        config_hash,
        obs_queue: settings.obs_queue.clone(),
        hold_queue: settings.hold_queue.clone(),
        source_dump: settings.source_dump.display().to_string(),
        source_dump_sha256,
        source_index: index_stats,
        total_read: summary.total,
        ok: summary.ok,
        bad: summary.bad,
        lost: lost.len() as u64,
        restored,
        artifacts: ArtifactPaths {
            outcomes_jsonl: writer.path().display().to_string(),
            stats_json: stats_path.display().to_string(),
            lost_json: settings.lost_json.display().to_string(),
            manifest_json: manifest_path.display().to_string(),
        },
    };
    write_run_manifest(&manifest_path, &manifest)?;

    match restore_result {
        Some(r) => {
            r.context("restore failed")?;
        }
        None => info!(
            hold = %settings.hold_queue,
            "restore not requested; messages remain in hold"
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_flags_take_defaults() {
        let args = MeasureArgs {
            obs_queue: Some("results".to_string()),
            hold_queue: None,
            source_dump: Some("dump.jsonl".to_string()),
            out_jsonl: None,
            lost_json: None,
            duration_sec: Some(5),
            block_sec: None,
            id_field: None,
            source_sent_field: None,
            source_sent_unit: Some("ms".to_string()),
            result_sent_field: None,
            result_sent_unit: None,
            restore: true,
            verify_empty: true,
        };
        let (s, w) = args.to_config().validate().unwrap();
        assert!(w.is_empty());
        assert_eq!(s.hold_queue, "results:hold");
        assert_eq!(s.out_jsonl, "latency.jsonl");

        let p = reconcile_params(&s);
        assert_eq!(p.duration, std::time::Duration::from_secs(5));
        assert_eq!(p.block, std::time::Duration::from_secs(1));
        assert_eq!(p.result_sent_field, "sent_epoch");
    }
}
