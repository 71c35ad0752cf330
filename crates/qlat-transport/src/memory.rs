//! Deterministic in-memory list transport.
//!
//! Single-threaded: nothing can arrive while a caller is "blocked", so an
//! empty `move_blocking` sleeps for the wait window and then reports empty.
//! That keeps deadline behaviour realistic without a second thread.
//!
//! Failure injection: [`MemoryLists::fail_next`] makes the next operation of
//! any kind return a `TransportError::Command`.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use crate::{ListTransport, PushSide, TransportError};

#[derive(Debug, Clone, Default)]
pub struct MemoryLists {
    lists: BTreeMap<String, VecDeque<Vec<u8>>>,
    pending_failure: Option<String>,
    moves: u64,
}

impl MemoryLists {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot failure for the next transport call.
    pub fn fail_next(&mut self, message: impl Into<String>) {
        self.pending_failure = Some(message.into());
    }

    /// Snapshot of `list`, head first.
    pub fn items(&self, list: &str) -> Vec<Vec<u8>> {
        self.lists
            .get(list)
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Total successful moves performed (blocking and non-blocking).
    pub fn moves(&self) -> u64 {
        self.moves
    }

    fn take_failure(&mut self, op: &'static str) -> Result<(), TransportError> {
        match self.pending_failure.take() {
            Some(message) => Err(TransportError::Command { op, message }),
            None => Ok(()),
        }
    }

    fn pop_tail_push_head(&mut self, src: &str, dst: &str) -> Option<Vec<u8>> {
        let item = self.lists.get_mut(src)?.pop_back()?;
        if self.lists.get(src).is_some_and(|l| l.is_empty()) {
            self.lists.remove(src);
        }
        self.lists
            .entry(dst.to_string())
            .or_default()
            .push_front(item.clone());
        self.moves += 1;
        Some(item)
    }
}

impl ListTransport for MemoryLists {
    fn move_blocking(
        &mut self,
        src: &str,
        dst: &str,
        wait: Duration,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        self.take_failure("move_blocking")?;
        if let Some(item) = self.pop_tail_push_head(src, dst) {
            return Ok(Some(item));
        }
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
        Ok(None)
    }

    fn move_now(&mut self, src: &str, dst: &str) -> Result<Option<Vec<u8>>, TransportError> {
        self.take_failure("move_now")?;
        Ok(self.pop_tail_push_head(src, dst))
    }

    fn len(&mut self, list: &str) -> Result<u64, TransportError> {
        self.take_failure("len")?;
        Ok(self.lists.get(list).map(|l| l.len() as u64).unwrap_or(0))
    }

    fn push(
        &mut self,
        list: &str,
        items: &[Vec<u8>],
        side: PushSide,
    ) -> Result<(), TransportError> {
        self.take_failure("push")?;
        if items.is_empty() {
            return Ok(());
        }
        let l = self.lists.entry(list.to_string()).or_default();
        for item in items {
            match side {
                PushSide::Rpush => l.push_back(item.clone()),
                PushSide::Lpush => l.push_front(item.clone()),
            }
        }
        Ok(())
    }

    fn delete(&mut self, list: &str) -> Result<(), TransportError> {
        self.take_failure("delete")?;
        self.lists.remove(list);
        Ok(())
    }
}
