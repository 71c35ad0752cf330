//! qlat-transport
//!
//! Queue capability boundary for the measurement pipeline.
//!
//! The reconciliation core never talks to a queue server directly. It needs
//! exactly two primitives from the transport:
//! - atomically move one item from list A to list B, waiting up to N for an item
//! - the same move, non-blocking, used to put quarantined items back
//!
//! `len`, `push` and `delete` exist for the restore precondition and for the
//! dump publisher.
//!
//! Concrete implementations:
//! - [`MemoryLists`] (this crate): deterministic, in-process, used by tests
//! - `qlat_redis::RedisLists`: Redis LIST commands

mod memory;

pub use memory::MemoryLists;
pub use qlat_schemas::PushSide;

use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Transport failures. "List empty" is never an error; it is `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established or was lost.
    Connect(String),
    /// The backend rejected or failed a command.
    Command { op: &'static str, message: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Connect(msg) => write!(f, "transport connect failed: {msg}"),
            TransportError::Command { op, message } => {
                write!(f, "transport {op} failed: {message}")
            }
        }
    }
}

impl std::error::Error for TransportError {}

// ---------------------------------------------------------------------------
// ListTransport trait
// ---------------------------------------------------------------------------

/// Named FIFO lists with an atomic pop+push primitive.
///
/// Move semantics follow Redis `RPOPLPUSH`: the item is taken from the
/// **tail** of `src` and pushed onto the **head** of `dst`, so moving every
/// item from A to B and then every item back from B to A restores A's order.
pub trait ListTransport {
    /// Move one item `src -> dst`, blocking up to `wait` for `src` to become
    /// non-empty. `Ok(None)` means nothing arrived within the window.
    fn move_blocking(
        &mut self,
        src: &str,
        dst: &str,
        wait: Duration,
    ) -> Result<Option<Vec<u8>>, TransportError>;

    /// Move one item `src -> dst` without waiting. `Ok(None)` when `src` is empty.
    fn move_now(&mut self, src: &str, dst: &str) -> Result<Option<Vec<u8>>, TransportError>;

    /// Current length of `list` (0 for a list that does not exist).
    fn len(&mut self, list: &str) -> Result<u64, TransportError>;

    /// Append `items` to `list` in order, at the end chosen by `side`.
    fn push(&mut self, list: &str, items: &[Vec<u8>], side: PushSide)
        -> Result<(), TransportError>;

    /// Remove `list` entirely.
    fn delete(&mut self, list: &str) -> Result<(), TransportError>;
}
