//! Command handlers for `qlat`.
//!
//! Shared connection plumbing lives here; each subcommand has its own module.

pub mod load_dump;
pub mod measure;
pub mod restore;

use anyhow::{Context, Result};
use qlat_config::{ProcessEnv, RedisConfig, RedisOverrides};
use qlat_redis::RedisLists;
use tracing::info;

use crate::RedisArgs;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Environment first, then flags.
pub fn redis_config(args: &RedisArgs) -> Result<RedisConfig> {
    let mut cfg = RedisConfig::from_env(&ProcessEnv).context("redis environment")?;
    cfg.apply(&RedisOverrides {
        url: args.redis_url.clone(),
        addr: args.redis_addr.clone(),
        pass: args.redis_pass.clone(),
        db: args.redis_db,
    });
    cfg.validate().context("redis config")?;
    Ok(cfg)
}

pub fn connect(cfg: &RedisConfig) -> Result<RedisLists> {
    let lists = RedisLists::connect(&cfg.connection_url())
        .with_context(|| format!("connect redis failed: {}", cfg.display_target()))?;
    info!(redis = %cfg.display_target(), "redis connected");
    Ok(lists)
}
