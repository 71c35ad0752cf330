//! `load-dump` settings.

use std::path::PathBuf;

use qlat_schemas::{EpochUnit, PushSide, RewriteMode};

use crate::{require, ConfigError};

/// Publisher batch size used when the configured one is not positive.
pub const DEFAULT_BATCH: usize = 1000;

#[derive(Debug, Clone)]
pub struct LoadDumpConfig {
    pub in_dump: String,
    pub out_dump: String,
    pub sent_field: String,
    pub epoch_unit: String,
    pub mode: String,
    pub step: i64,
    /// 0 means "now" in `epoch_unit`.
    pub base_epoch: i64,
    /// Empty means rewrite only, no publishing.
    pub queue: String,
    pub push: String,
    pub batch: i64,
    pub clear_queue: bool,
}

impl Default for LoadDumpConfig {
    fn default() -> Self {
        Self {
            in_dump: String::new(),
            out_dump: String::new(),
            sent_field: "sent_epoch".to_string(),
            epoch_unit: "ms".to_string(),
            mode: "increment".to_string(),
            step: 1,
            base_epoch: 0,
            queue: String::new(),
            push: "rpush".to_string(),
            batch: DEFAULT_BATCH as i64,
            clear_queue: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadDumpSettings {
    pub in_dump: PathBuf,
    pub out_dump: PathBuf,
    pub sent_field: String,
    /// `Seconds` or `Millis` only.
    pub unit: EpochUnit,
    pub mode: RewriteMode,
    pub step: i64,
    /// `None` means use the current time.
    pub base_epoch: Option<i64>,
    pub queue: Option<String>,
    pub push: PushSide,
    pub batch: usize,
    pub clear_queue: bool,
}

impl LoadDumpConfig {
    pub fn validate(&self) -> Result<LoadDumpSettings, ConfigError> {
        let in_dump = require("in dump", &self.in_dump)?;
        let out_dump = require("out dump", &self.out_dump)?;
        let sent_field = require("sent field", &self.sent_field)?;

        let unit = match EpochUnit::parse(&self.epoch_unit) {
            Some(u @ (EpochUnit::Seconds | EpochUnit::Millis)) => u,
            _ => {
                return Err(ConfigError::Invalid {
                    field: "epoch unit",
                    value: self.epoch_unit.clone(),
                    expected: "ms or s",
                })
            }
        };
        let mode = RewriteMode::parse(&self.mode).ok_or_else(|| ConfigError::Invalid {
            field: "mode",
            value: self.mode.clone(),
            expected: "same or increment",
        })?;
        let push = PushSide::parse(&self.push).ok_or_else(|| ConfigError::Invalid {
            field: "push",
            value: self.push.clone(),
            expected: "rpush or lpush",
        })?;

        let queue = Some(self.queue.trim().to_string()).filter(|q| !q.is_empty());
        if self.clear_queue && queue.is_none() {
            return Err(ConfigError::Missing("queue (required by clear-queue)"));
        }

        let batch = usize::try_from(self.batch)
            .ok()
            .filter(|b| *b > 0)
            .unwrap_or(DEFAULT_BATCH);

        Ok(LoadDumpSettings {
            in_dump: PathBuf::from(in_dump),
            out_dump: PathBuf::from(out_dump),
            sent_field,
            unit,
            mode,
            step: self.step,
            base_epoch: (self.base_epoch != 0).then_some(self.base_epoch),
            queue,
            push,
            batch,
            clear_queue: self.clear_queue,
        })
    }
}
