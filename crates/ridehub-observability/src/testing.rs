//! Test doubles for the log sink
//!
//! [`MemoryLogStore`] records every batch it receives and can be told to fail
//! the next N inserts, which makes re-queue behavior observable.

use crate::event::SystemLogEntry;
use crate::log_sink::{LogStore, LogStoreError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// In-memory [`LogStore`]
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    batches: Mutex<Vec<Vec<SystemLogEntry>>>,
    fail_remaining: AtomicUsize,
    failed_attempts: AtomicUsize,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` inserts fail
    pub fn fail_next(&self, count: usize) {
        self.fail_remaining.store(count, Ordering::SeqCst);
    }

    /// Successful batches received so far
    pub fn batch_count(&self) -> usize {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// All persisted entries, in insert order
    pub fn entries(&self) -> Vec<SystemLogEntry> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .flatten()
            .cloned()
            .collect()
    }

    pub fn failed_attempts(&self) -> usize {
        self.failed_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn insert_logs(&self, entries: &[SystemLogEntry]) -> Result<(), LogStoreError> {
        let should_fail = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            self.failed_attempts.fetch_add(1, Ordering::SeqCst);
            return Err(LogStoreError("injected failure".to_string()));
        }

        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entries.to_vec());
        Ok(())
    }
}
