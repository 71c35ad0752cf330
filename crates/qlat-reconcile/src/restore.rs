//! Restore controller: put quarantined messages back on the observation list.
//!
//! Sequential and best-effort: one `hold -> obs` move at a time until hold
//! is empty. An interrupted restore leaves the remainder in hold; running it
//! again resumes where it stopped.

use std::fmt;

use qlat_transport::{ListTransport, TransportError};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreReport {
    pub moved_back: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreError {
    /// Verify-empty precondition failed; no moves were performed.
    Refused { obs_list: String, len: u64 },
    /// Transport failed part-way. `moved_back` items were already restored.
    Transport {
        moved_back: u64,
        source: TransportError,
    },
}

impl fmt::Display for RestoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestoreError::Refused { obs_list, len } => write!(
                f,
                "refuse restore: observation list '{obs_list}' is not empty (len={len})"
            ),
            RestoreError::Transport { moved_back, source } => {
                write!(f, "restore interrupted after {moved_back} move(s): {source}")
            }
        }
    }
}

impl std::error::Error for RestoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RestoreError::Refused { .. } => None,
            RestoreError::Transport { source, .. } => Some(source),
        }
    }
}

/// Move everything in `hold_list` back onto `obs_list`.
///
/// With `verify_empty`, `obs_list` must be empty first, otherwise
/// [`RestoreError::Refused`] is returned before any move.
pub fn restore<T: ListTransport + ?Sized>(
    transport: &mut T,
    obs_list: &str,
    hold_list: &str,
    verify_empty: bool,
) -> Result<RestoreReport, RestoreError> {
    if verify_empty {
        let len = transport
            .len(obs_list)
            .map_err(|source| RestoreError::Transport {
                moved_back: 0,
                source,
            })?;
        if len != 0 {
            return Err(RestoreError::Refused {
                obs_list: obs_list.to_string(),
                len,
            });
        }
    }

    let mut moved_back: u64 = 0;
    loop {
        match transport.move_now(hold_list, obs_list) {
            Ok(Some(_)) => moved_back += 1,
            Ok(None) => break,
            Err(source) => return Err(RestoreError::Transport { moved_back, source }),
        }
    }

    info!(moved_back, from = hold_list, to = obs_list, "restore complete");
    Ok(RestoreReport { moved_back })
}
