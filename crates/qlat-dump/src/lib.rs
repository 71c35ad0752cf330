//! qlat-dump
//!
//! Dump rewriter and publisher: the producer side of a measurement run.
//!
//! Each JSONL line that parses as an object gets its send-time field
//! overwritten (`same`: base for every line; `increment`: base + k*step),
//! is re-serialised compactly to the output dump, and is optionally pushed
//! onto a list in fixed-size batches. Other lines are counted and skipped.

use std::fmt;
use std::io::{self, BufRead, Write};

use chrono::Utc;
use qlat_schemas::{EpochUnit, PushSide, RewriteMode};
use qlat_transport::{ListTransport, TransportError};
use serde_json::{Map, Value};
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOptions {
    pub sent_field: String,
    pub mode: RewriteMode,
    pub step: i64,
    /// First value written, in the caller's unit.
    pub base: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpReport {
    pub in_lines: u64,
    pub out_lines: u64,
    pub bad_lines: u64,
    pub base: i64,
    /// Items handed to the transport. 0 when not publishing.
    pub pushed: u64,
}

#[derive(Debug)]
pub enum DumpError {
    Read(io::Error),
    Write(io::Error),
    Transport(TransportError),
}

impl fmt::Display for DumpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpError::Read(e) => write!(f, "read input dump: {e}"),
            DumpError::Write(e) => write!(f, "write output dump: {e}"),
            DumpError::Transport(e) => write!(f, "publish: {e}"),
        }
    }
}

impl std::error::Error for DumpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DumpError::Read(e) | DumpError::Write(e) => Some(e),
            DumpError::Transport(e) => Some(e),
        }
    }
}

impl From<TransportError> for DumpError {
    fn from(e: TransportError) -> Self {
        DumpError::Transport(e)
    }
}

/// Current wall-clock epoch in `unit` (seconds or milliseconds).
pub fn base_now(unit: EpochUnit) -> i64 {
    let now = Utc::now();
    match unit {
        EpochUnit::Seconds => now.timestamp(),
        EpochUnit::Micros => now.timestamp_micros(),
        EpochUnit::Millis | EpochUnit::Auto => now.timestamp_millis(),
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

/// Batched pushes onto one list.
pub struct Publisher<'a, T: ListTransport + ?Sized> {
    transport: &'a mut T,
    queue: String,
    side: PushSide,
    batch: usize,
    pending: Vec<Vec<u8>>,
    pushed: u64,
}

impl<'a, T: ListTransport + ?Sized> Publisher<'a, T> {
    pub fn new(transport: &'a mut T, queue: &str, side: PushSide, batch: usize) -> Self {
        let batch = batch.max(1);
        Self {
            transport,
            queue: queue.to_string(),
            side,
            batch,
            pending: Vec::with_capacity(batch),
            pushed: 0,
        }
    }

    /// Delete the target list before loading.
    pub fn clear(&mut self) -> Result<(), TransportError> {
        self.transport.delete(&self.queue)?;
        info!(queue = %self.queue, "target queue cleared");
        Ok(())
    }

    fn enqueue(&mut self, item: Vec<u8>) -> Result<(), TransportError> {
        self.pending.push(item);
        if self.pending.len() >= self.batch {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.transport.push(&self.queue, &self.pending, self.side)?;
        self.pushed += self.pending.len() as u64;
        self.pending.clear();
        debug!(queue = %self.queue, pushed = self.pushed, "batch pushed");
        Ok(())
    }

    /// Length of the target list.
    pub fn queue_len(&mut self) -> Result<u64, TransportError> {
        self.transport.len(&self.queue)
    }
}

// ---------------------------------------------------------------------------
// Rewrite
// ---------------------------------------------------------------------------

/// Rewrite `reader` into `writer`, publishing each output line when a
/// publisher is given. The output is flushed before returning.
pub fn rewrite_dump<R, W, T>(
    mut reader: R,
    writer: &mut W,
    opts: &RewriteOptions,
    mut publisher: Option<&mut Publisher<'_, T>>,
) -> Result<DumpReport, DumpError>
where
    R: BufRead,
    W: Write + ?Sized,
    T: ListTransport + ?Sized,
{
    let mut report = DumpReport {
        base: opts.base,
        ..DumpReport::default()
    };
    let mut next = opts.base;
    let mut buf: Vec<u8> = Vec::new();

    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).map_err(DumpError::Read)?;
        if n == 0 {
            break;
        }
        report.in_lines += 1;

        let line = buf.trim_ascii();
        if line.is_empty() {
            report.bad_lines += 1;
            continue;
        }
        let mut obj: Map<String, Value> = match serde_json::from_slice(line) {
            Ok(o) => o,
            Err(_) => {
                report.bad_lines += 1;
                continue;
            }
        };

        let value = match opts.mode {
            RewriteMode::Same => opts.base,
            RewriteMode::Increment => {
                let v = next;
                next = next.saturating_add(opts.step);
                v
            }
        };
        obj.insert(opts.sent_field.clone(), Value::from(value));

        let out = match serde_json::to_vec(&obj) {
            Ok(b) => b,
            Err(_) => {
                report.bad_lines += 1;
                continue;
            }
        };
        writer.write_all(&out).map_err(DumpError::Write)?;
        writer.write_all(b"\n").map_err(DumpError::Write)?;
        report.out_lines += 1;

        if let Some(p) = publisher.as_deref_mut() {
            p.enqueue(out)?;
        }
    }

    writer.flush().map_err(DumpError::Write)?;
    if let Some(p) = publisher {
        p.flush()?;
        report.pushed = p.pushed;
    }
    Ok(report)
}
