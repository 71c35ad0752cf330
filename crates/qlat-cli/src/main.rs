use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use qlat_config::{env_bool, ProcessEnv};

mod commands;

#[derive(Parser)]
#[command(name = "qlat")]
#[command(about = "Queue latency reconciliation", long_about = None)]
struct Cli {
    #[command(flatten)]
    redis: RedisArgs,

    /// Debug logging (also DEBUG=true). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    cmd: Commands,
}

/// Connection flags. Any of addr/pass/db drops a REDIS_URL from the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct RedisArgs {
    /// Full connection URL; wins over everything else.
    #[arg(long, global = true)]
    pub redis_url: Option<String>,

    /// host:port
    #[arg(long, global = true)]
    pub redis_addr: Option<String>,

    #[arg(long, global = true)]
    pub redis_pass: Option<String>,

    #[arg(long, global = true)]
    pub redis_db: Option<i64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Drain the observation list, correlate with a source dump, report latency.
    Measure(commands::measure::MeasureArgs),

    /// Move everything from the hold list back onto the observation list.
    Restore(commands::restore::RestoreArgs),

    /// Rewrite send times in a dump and optionally publish it to a list.
    LoadDump(commands::load_dump::LoadDumpArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env");

    let debug = cli.debug || env_bool(&ProcessEnv, "DEBUG", false).unwrap_or(false);
    init_tracing(debug);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.cmd {
        Commands::Measure(args) => commands::measure::run(args, &cli.redis),
        Commands::Restore(args) => commands::restore::run(args, &cli.redis),
        Commands::LoadDump(args) => commands::load_dump::run(args, &cli.redis),
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .init();
}
