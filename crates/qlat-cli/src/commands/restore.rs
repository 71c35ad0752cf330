use anyhow::{Context, Result};
use clap::Args;
use qlat_config::{resolve_hold_queue, ConfigError};

use super::{connect, redis_config};
use crate::RedisArgs;

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Observation list to restore onto.
    #[arg(long = "obs")]
    pub obs_queue: Option<String>,

    /// Quarantine list [default: <obs>:hold]
    #[arg(long = "hold")]
    pub hold_queue: Option<String>,

    /// Refuse unless the observation list is empty.
    #[arg(long, default_value_t = false)]
    pub verify_empty: bool,
}

pub fn run(args: RestoreArgs, redis_args: &RedisArgs) -> Result<()> {
    let obs = args
        .obs_queue
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ConfigError::Missing("obs queue"))
        .context("invalid restore config")?;
    let hold = resolve_hold_queue(obs, args.hold_queue.as_deref().unwrap_or(""))
        .context("invalid restore config")?;
    let redis = redis_config(redis_args)?;

    let mut transport = connect(&redis)?;
    qlat_reconcile::restore(&mut transport, obs, &hold, args.verify_empty)
        .context("restore failed")?;
    Ok(())
}
