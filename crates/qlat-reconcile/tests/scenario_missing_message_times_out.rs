use std::collections::BTreeSet;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use qlat_reconcile::{restore, run_reconciliation, IndexSpec, ReconcileParams, SourceIndex};
use qlat_schemas::{EpochUnit, Outcome, StopReason};
use qlat_transport::{ListTransport, MemoryLists, PushSide};
use tracing_subscriber::fmt::MakeWriter;

const DUMP: &str = concat!(
    "{\"message_id\":\"a\",\"sent_epoch\":1700000000000}\n",
    "{\"message_id\":\"b\",\"sent_epoch\":1700000001000}\n",
    "{\"message_id\":\"c\",\"sent_epoch\":1700000002000,\"payload\":\"keep me\"}\n",
);

const TIMEOUT_WARNING: &str = "timeout before all dump messages were found";

/// Log sink shared between the subscriber and the assertions.
#[derive(Clone, Default)]
struct LogBuf(Arc<Mutex<Vec<u8>>>);

impl LogBuf {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuf {
    type Writer = LogBuf;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn with_captured_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buf = LogBuf::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buf.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, buf.contents())
}

fn index() -> Result<SourceIndex> {
    let spec = IndexSpec {
        id_field: "message_id".to_string(),
        sent_field: "sent_epoch".to_string(),
        unit: EpochUnit::Auto,
    };
    Ok(SourceIndex::from_reader(DUMP.as_bytes(), &spec)?.0)
}

fn params(duration: Duration) -> ReconcileParams {
    ReconcileParams {
        obs_list: "obs".to_string(),
        hold_list: "obs:hold".to_string(),
        duration,
        block: Duration::from_millis(20),
        id_field: "message_id".to_string(),
        result_sent_field: "sent_epoch".to_string(),
        result_sent_unit: EpochUnit::Auto,
    }
}

#[test]
fn scenario_missing_message_times_out() -> Result<()> {
    let index = index()?;

    let mut lists = MemoryLists::new();
    lists.push(
        "obs",
        &[
            br#"{"message_id":"a","sent_epoch":1700000000004}"#.to_vec(),
            br#"{"message_id":"b","sent_epoch":1700000001004}"#.to_vec(),
            br#"not even json"#.to_vec(),
        ],
        PushSide::Rpush,
    )?;

    let params = params(Duration::from_millis(300));

    let started = Instant::now();
    let mut out: Vec<Outcome> = Vec::new();
    let (summary, logs) =
        with_captured_logs(|| run_reconciliation(&mut lists, &index, &params, &mut out));
    let summary = summary?;
    let took = started.elapsed();

    let warning = logs
        .lines()
        .find(|l| l.contains(TIMEOUT_WARNING))
        .expect("timeout warning logged");
    assert!(warning.contains("WARN"));
    assert!(warning.contains("missing=1"));
    assert!(warning.contains("messages_in_dump=3"));

    assert_eq!(summary.stop_reason, StopReason::Timeout);
    assert!(took >= params.duration);
    assert!(took < params.duration + Duration::from_secs(2));

    assert_eq!((summary.total, summary.ok, summary.bad), (3, 2, 1));
    assert_eq!(out[0].error.as_deref(), Some("json_parse_error"));
    assert!(out.iter().filter(|o| o.ok).all(|o| o.serve_us == Some(4_000)));

    // found and lost partition the index.
    let lost = summary.lost(&index);
    assert_eq!(lost.len(), 1);
    assert_eq!(
        lost[0].raw,
        br#"{"message_id":"c","sent_epoch":1700000002000,"payload":"keep me"}"#.to_vec()
    );
    let found: BTreeSet<&str> = summary.found.iter().map(String::as_str).collect();
    assert_eq!(found, ["a", "b"].into_iter().collect());
    assert_eq!(summary.missing(), 1);

    // Restore puts everything back in the original order.
    let r = restore(&mut lists, "obs", "obs:hold", true)?;
    assert_eq!(r.moved_back, 3);
    assert_eq!(lists.len("obs:hold")?, 0);
    assert_eq!(lists.items("obs")[2], br#"not even json"#.to_vec());

    Ok(())
}

#[test]
fn scenario_all_found_run_does_not_warn() -> Result<()> {
    let index = index()?;

    let mut lists = MemoryLists::new();
    lists.push(
        "obs",
        &[
            br#"{"message_id":"a","sent_epoch":1700000000004}"#.to_vec(),
            br#"{"message_id":"b","sent_epoch":1700000001004}"#.to_vec(),
            br#"{"message_id":"c","sent_epoch":1700000002004}"#.to_vec(),
        ],
        PushSide::Rpush,
    )?;

    let mut out: Vec<Outcome> = Vec::new();
    let (summary, logs) = with_captured_logs(|| {
        run_reconciliation(&mut lists, &index, &params(Duration::from_secs(5)), &mut out)
    });
    let summary = summary?;

    assert_eq!(summary.stop_reason, StopReason::AllFound);
    assert_eq!(summary.missing(), 0);
    assert!(!logs.contains(TIMEOUT_WARNING));
    Ok(())
}
