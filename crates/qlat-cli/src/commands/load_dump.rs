use std::fs::File;
use std::io::{BufReader, BufWriter};

use anyhow::{Context, Result};
use clap::Args;
use qlat_config::LoadDumpConfig;
use qlat_dump::{base_now, rewrite_dump, DumpReport, Publisher, RewriteOptions};
use qlat_redis::RedisLists;
use tracing::info;

use super::{connect, redis_config};
use crate::RedisArgs;

#[derive(Args, Debug)]
pub struct LoadDumpArgs {
    /// Input dump (JSONL).
    #[arg(long)]
    pub in_dump: Option<String>,

    /// Output dump (JSONL).
    #[arg(long)]
    pub out_dump: Option<String>,

    /// Field to rewrite [default: sent_epoch]
    #[arg(long)]
    pub sent_field: Option<String>,

    /// ms|s [default: ms]
    #[arg(long)]
    pub epoch_unit: Option<String>,

    /// same|increment [default: increment]
    #[arg(long)]
    pub mode: Option<String>,

    /// Increment per line, in epoch units [default: 1]
    #[arg(long, allow_negative_numbers = true)]
    pub step: Option<i64>,

    /// First value; 0 means now [default: 0]
    #[arg(long)]
    pub base_epoch: Option<i64>,

    /// Publish each rewritten line onto this list.
    #[arg(long)]
    pub queue: Option<String>,

    /// rpush|lpush [default: rpush]
    #[arg(long)]
    pub push: Option<String>,

    /// Items per pipelined push [default: 1000]
    #[arg(long, allow_negative_numbers = true)]
    pub batch: Option<i64>,

    /// Delete the target list first.
    #[arg(long, default_value_t = false)]
    pub clear_queue: bool,
}

impl LoadDumpArgs {
    fn to_config(&self) -> LoadDumpConfig {
        let d = LoadDumpConfig::default();
        LoadDumpConfig {
            in_dump: self.in_dump.clone().unwrap_or(d.in_dump),
            out_dump: self.out_dump.clone().unwrap_or(d.out_dump),
            sent_field: self.sent_field.clone().unwrap_or(d.sent_field),
            epoch_unit: self.epoch_unit.clone().unwrap_or(d.epoch_unit),
            mode: self.mode.clone().unwrap_or(d.mode),
            step: self.step.unwrap_or(d.step),
            base_epoch: self.base_epoch.unwrap_or(d.base_epoch),
            queue: self.queue.clone().unwrap_or(d.queue),
            push: self.push.clone().unwrap_or(d.push),
            batch: self.batch.unwrap_or(d.batch),
            clear_queue: self.clear_queue,
        }
    }
}

pub fn run(args: LoadDumpArgs, redis_args: &RedisArgs) -> Result<()> {
    let s = args.to_config().validate().context("invalid load-dump config")?;
    let base = s.base_epoch.unwrap_or_else(|| base_now(s.unit));
    let opts = RewriteOptions {
        sent_field: s.sent_field.clone(),
        mode: s.mode,
        step: s.step,
        base,
    };

    let reader = BufReader::new(
        File::open(&s.in_dump)
            .with_context(|| format!("open in dump failed: {}", s.in_dump.display()))?,
    );
    let mut writer = BufWriter::new(
        File::create(&s.out_dump)
            .with_context(|| format!("create out dump failed: {}", s.out_dump.display()))?,
    );

    let (report, queue_len): (DumpReport, Option<u64>) = match &s.queue {
        None => {
            let r = rewrite_dump::<_, _, RedisLists>(reader, &mut writer, &opts, None)
                .context("rewrite dump")?;
            (r, None)
        }
        Some(queue) => {
            let redis = redis_config(redis_args)?;
            let mut transport = connect(&redis)?;
            let mut publisher = Publisher::new(&mut transport, queue, s.push, s.batch);
            if s.clear_queue {
                publisher.clear().context("clear target queue")?;
            }
            let r = rewrite_dump(reader, &mut writer, &opts, Some(&mut publisher))
                .context("rewrite and publish dump")?;
            let len = publisher.queue_len().context("read target queue length")?;
            (r, Some(len))
        }
    };

    info!(
        in_lines = report.in_lines,
        out_lines = report.out_lines,
        bad_lines_skipped = report.bad_lines,
        base = report.base,
        unit = %s.unit,
        mode = s.mode.as_str(),
        "dump rewritten"
    );
    if let (Some(queue), Some(len)) = (&s.queue, queue_len) {
        info!(queue = %queue, pushed = report.pushed, llen = len, "dump published");
    }
    Ok(())
}
