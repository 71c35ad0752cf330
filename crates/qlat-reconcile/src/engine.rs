//! Reconciliation loop: drain, quarantine, correlate, classify.
//!
//! One state (`RUNNING`) and two exits:
//! - `Timeout`: deadline checked before every dequeue attempt
//! - `AllFound`: every indexed id observed; the message that completes the
//!   set is still fully classified and recorded before stopping
//!
//! Runtime can overshoot the deadline by at most one `block` wait.
//! Classification is a pure function of (payload, index, params, read time);
//! the loop owns every counter.

use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::time::{Duration, Instant};

use qlat_schemas::{EpochUnit, Outcome, StatsFile, StopReason};
use qlat_transport::{ListTransport, TransportError};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::epoch::{normalize_epoch, now_micros};
use crate::index::{coerce_id, SourceIndex, SourceRecord};
use crate::lost::lost_records;
use crate::stats::{build_stats_file, SampleSeries};

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileParams {
    pub obs_list: String,
    pub hold_list: String,
    /// Measurement window.
    pub duration: Duration,
    /// Bounded wait per dequeue attempt.
    pub block: Duration,
    pub id_field: String,
    pub result_sent_field: String,
    pub result_sent_unit: EpochUnit,
}

// ---------------------------------------------------------------------------
// Output sink
// ---------------------------------------------------------------------------

/// Destination for per-record outcomes, written as they are produced.
pub trait OutcomeSink {
    fn record(&mut self, outcome: &Outcome) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

impl OutcomeSink for Vec<Outcome> {
    fn record(&mut self, outcome: &Outcome) -> io::Result<()> {
        self.push(outcome.clone());
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Why an observed message is not an ok record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    JsonParse,
    MissingId { field: String },
    BadId { field: String },
    BadResultSent { field: String },
    SourceNotFound,
    ResultSentBeforeSource,
    ResultSentInFuture,
}

impl RejectReason {
    /// Error code written to the outcome line.
    pub fn code(&self) -> String {
        match self {
            RejectReason::JsonParse => "json_parse_error".to_string(),
            RejectReason::MissingId { field } => format!("missing_{field}"),
            RejectReason::BadId { field } => format!("bad_{field}"),
            RejectReason::BadResultSent { field } => format!("missing_or_bad_{field}"),
            RejectReason::SourceNotFound => "source_not_found".to_string(),
            RejectReason::ResultSentBeforeSource => "result_sent_before_source".to_string(),
            RejectReason::ResultSentInFuture => "result_sent_in_future".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Ok {
        source_sent_us: i64,
        result_sent_us: i64,
        serve_us: i64,
        latency_us: i64,
    },
    Rejected {
        reason: RejectReason,
        source_sent_us: Option<i64>,
        result_sent_us: Option<i64>,
    },
}

/// Classification of one dequeued message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Present once the id field decoded, even if a later step rejected it.
    pub message_id: Option<String>,
    pub verdict: Verdict,
}

impl Observation {
    fn rejected(message_id: Option<String>, reason: RejectReason) -> Self {
        Self {
            message_id,
            verdict: Verdict::Rejected {
                reason,
                source_sent_us: None,
                result_sent_us: None,
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.verdict, Verdict::Ok { .. })
    }

    pub fn to_outcome(&self) -> Outcome {
        let message_id = self.message_id.clone();
        match &self.verdict {
            Verdict::Ok {
                source_sent_us,
                result_sent_us,
                serve_us,
                latency_us,
            } => Outcome {
                ok: true,
                error: None,
                message_id,
                source_sent_us: Some(*source_sent_us),
                result_sent_us: Some(*result_sent_us),
                serve_us: Some(*serve_us),
                latency_us: Some(*latency_us),
            },
            Verdict::Rejected {
                reason,
                source_sent_us,
                result_sent_us,
            } => Outcome {
                ok: false,
                error: Some(reason.code()),
                message_id,
                source_sent_us: *source_sent_us,
                result_sent_us: *result_sent_us,
                serve_us: None,
                latency_us: None,
            },
        }
    }
}

/// Classify one payload against the index.
///
/// `read_time_us` is the wall-clock instant the message was dequeued.
pub fn classify(
    payload: &[u8],
    index: &SourceIndex,
    params: &ReconcileParams,
    read_time_us: i64,
) -> Observation {
    let obj: Map<String, Value> = match serde_json::from_slice(payload) {
        Ok(o) => o,
        Err(e) => {
            debug!(error = %e, "result payload is not a JSON object");
            return Observation::rejected(None, RejectReason::JsonParse);
        }
    };

    let id = match obj.get(&params.id_field) {
        None => {
            return Observation::rejected(
                None,
                RejectReason::MissingId {
                    field: params.id_field.clone(),
                },
            )
        }
        Some(v) => match coerce_id(v) {
            Some(id) => id,
            None => {
                return Observation::rejected(
                    None,
                    RejectReason::BadId {
                        field: params.id_field.clone(),
                    },
                )
            }
        },
    };

    let result_sent_us = match obj
        .get(&params.result_sent_field)
        .map(|v| normalize_epoch(v, params.result_sent_unit))
    {
        Some(Ok(us)) => us,
        Some(Err(e)) => {
            debug!(message_id = %id, error = %e, "result send time not normalizable");
            return Observation::rejected(
                Some(id),
                RejectReason::BadResultSent {
                    field: params.result_sent_field.clone(),
                },
            );
        }
        None => {
            return Observation::rejected(
                Some(id),
                RejectReason::BadResultSent {
                    field: params.result_sent_field.clone(),
                },
            )
        }
    };

    let source_sent_us = match index.get(&id) {
        Some(rec) => rec.sent_time_us,
        None => {
            return Observation {
                message_id: Some(id),
                verdict: Verdict::Rejected {
                    reason: RejectReason::SourceNotFound,
                    source_sent_us: None,
                    result_sent_us: Some(result_sent_us),
                },
            }
        }
    };

    let serve_us = result_sent_us.saturating_sub(source_sent_us);
    if serve_us < 0 {
        return Observation {
            message_id: Some(id),
            verdict: Verdict::Rejected {
                reason: RejectReason::ResultSentBeforeSource,
                source_sent_us: Some(source_sent_us),
                result_sent_us: Some(result_sent_us),
            },
        };
    }

    let latency_us = read_time_us.saturating_sub(result_sent_us);
    if latency_us < 0 {
        return Observation {
            message_id: Some(id),
            verdict: Verdict::Rejected {
                reason: RejectReason::ResultSentInFuture,
                source_sent_us: Some(source_sent_us),
                result_sent_us: Some(result_sent_us),
            },
        };
    }

    Observation {
        message_id: Some(id),
        verdict: Verdict::Ok {
            source_sent_us,
            result_sent_us,
            serve_us,
            latency_us,
        },
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ReconcileError {
    /// Dequeue failed for a reason other than "empty". Outcomes written so
    /// far have been flushed.
    Transport(TransportError),
    /// The outcome sink failed.
    Output(io::Error),
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::Transport(e) => write!(f, "dequeue failed: {e}"),
            ReconcileError::Output(e) => write!(f, "write outcome failed: {e}"),
        }
    }
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReconcileError::Transport(e) => Some(e),
            ReconcileError::Output(e) => Some(e),
        }
    }
}

/// What one run of the loop produced.
#[derive(Debug, Clone)]
pub struct ReconcileSummary {
    pub stop_reason: StopReason,
    pub total: u64,
    pub ok: u64,
    pub bad: u64,
    /// Ids from the index observed at least once. Always a subset of the index.
    pub found: BTreeSet<String>,
    /// `|index|` at loop start.
    pub target: usize,
    pub elapsed: Duration,
    pub samples: SampleSeries,
}

impl ReconcileSummary {
    pub fn missing(&self) -> usize {
        self.target.saturating_sub(self.found.len())
    }

    /// Indexed records never observed, in id order.
    pub fn lost<'a>(&self, index: &'a SourceIndex) -> Vec<&'a SourceRecord> {
        lost_records(index, &self.found)
    }

    pub fn stats_file(&self) -> StatsFile {
        build_stats_file(
            self.total,
            self.ok,
            self.bad,
            self.elapsed,
            self.samples.clone(),
        )
    }
}

#[derive(Debug, Default)]
struct LoopState {
    total: u64,
    ok: u64,
    bad: u64,
    found: BTreeSet<String>,
    samples: SampleSeries,
}

impl LoopState {
    fn apply(&mut self, obs: &Observation) {
        match &obs.verdict {
            Verdict::Ok {
                serve_us,
                latency_us,
                ..
            } => {
                self.ok += 1;
                self.samples.push(*serve_us, *latency_us);
            }
            Verdict::Rejected { .. } => self.bad += 1,
        }
    }
}

fn log_outcome(o: &Outcome) {
    let id = o.message_id.as_deref().unwrap_or("");
    if o.ok {
        debug!(
            ok = true,
            message_id = id,
            source_sent_us = o.source_sent_us,
            result_sent_us = o.result_sent_us,
            serve_us = o.serve_us,
            latency_us = o.latency_us,
            "record"
        );
    } else {
        debug!(
            ok = false,
            message_id = id,
            error = o.error.as_deref().unwrap_or(""),
            "record"
        );
    }
}

/// Drain `params.obs_list` into `params.hold_list` until the deadline passes
/// or every indexed id has been seen, writing one outcome per message.
pub fn run_reconciliation<T, S>(
    transport: &mut T,
    index: &SourceIndex,
    params: &ReconcileParams,
    sink: &mut S,
) -> Result<ReconcileSummary, ReconcileError>
where
    T: ListTransport + ?Sized,
    S: OutcomeSink + ?Sized,
{
    let started = Instant::now();
    // An unrepresentable deadline means the loop only ends on AllFound.
    let deadline = started.checked_add(params.duration);
    let target = index.len();
    let mut st = LoopState::default();

    info!(
        obs = %params.obs_list,
        hold = %params.hold_list,
        target,
        duration_sec = params.duration.as_secs_f64(),
        "reconciliation started"
    );

    let stop_reason = loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break StopReason::Timeout;
        }

        let payload =
            match transport.move_blocking(&params.obs_list, &params.hold_list, params.block) {
                Ok(Some(p)) => p,
                Ok(None) => continue,
                Err(e) => {
                    // Keep what was already written before aborting.
                    let _ = sink.flush();
                    return Err(ReconcileError::Transport(e));
                }
            };

        st.total += 1;
        let read_time_us = now_micros();

        let obs = classify(&payload, index, params, read_time_us);
        if let Some(id) = &obs.message_id {
            if index.contains(id) && !st.found.contains(id) {
                st.found.insert(id.clone());
            }
        }
        let should_stop = st.found.len() >= target;

        st.apply(&obs);
        let outcome = obs.to_outcome();
        log_outcome(&outcome);
        sink.record(&outcome).map_err(ReconcileError::Output)?;

        if should_stop {
            info!(all_messages_found = st.found.len(), "stop");
            break StopReason::AllFound;
        }
    };

    sink.flush().map_err(ReconcileError::Output)?;
    let elapsed = started.elapsed();

    let summary = ReconcileSummary {
        stop_reason,
        total: st.total,
        ok: st.ok,
        bad: st.bad,
        found: st.found,
        target,
        elapsed,
        samples: st.samples,
    };

    if summary.stop_reason == StopReason::Timeout && summary.missing() > 0 {
        warn!(
            messages_received = summary.found.len(),
            messages_in_dump = target,
            missing = summary.missing(),
            timeout_sec = params.duration.as_secs_f64(),
            total_read = summary.total,
            "timeout before all dump messages were found"
        );
    }

    Ok(summary)
}
