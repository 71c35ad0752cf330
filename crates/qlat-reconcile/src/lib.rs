//! qlat-reconcile
//!
//! Latency reconciliation core.
//!
//! Architectural decisions:
//! - Source dump indexed once, read-only during the loop
//! - Every observed message is quarantined (obs -> hold) before it is parsed
//! - Per-record failures are outcomes, never fatal
//! - Loop stops on deadline or when every indexed id has been seen
//! - Lost set = index minus found, independent of the stop reason
//! - Restore is a separate, re-runnable step
//!
//! No queue client here. Everything goes through `qlat_transport::ListTransport`.

mod engine;
mod epoch;
mod index;
mod lost;
mod restore;
mod stats;

pub use engine::{
    classify, run_reconciliation, Observation, OutcomeSink, ReconcileError, ReconcileParams,
    ReconcileSummary, RejectReason, Verdict,
};
pub use epoch::{normalize_epoch, now_micros, Numeric, TimestampError, TimestampValue};
pub use index::{IndexError, IndexSpec, IndexStats, SourceIndex, SourceRecord};
pub use lost::lost_records;
pub use restore::{restore, RestoreError, RestoreReport};
pub use stats::{
    build_stats_file, elapsed_secs, percentile, series_stats, throughput, SampleSeries,
    MIN_ELAPSED_SECS,
};
