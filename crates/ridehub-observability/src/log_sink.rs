//! Buffered system log sink
//!
//! Business code hands entries to a [`SystemLogger`], which only enqueues them
//! on a bounded channel. A single [`LogFlusher`] task owns the buffer and
//! writes batches to a [`LogStore`]:
//!
//! ```text
//!   handlers ──try_send──▶ mpsc(channel_capacity) ──▶ LogFlusher ──insert_logs──▶ LogStore
//!                                                     │ buffer ≤ buffer_capacity
//!                                                     └ flush when full, on tick, on close
//! ```
//!
//! Delivery is at-least-once within the re-queue limit: when a batch insert
//! fails, the newest `requeue_limit` entries of that batch go back to the
//! front of the buffer and older ones are dropped.

use crate::clock::Clock;
use crate::event::{LogLevel, SystemLogEntry};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Error reported by a [`LogStore`]
#[derive(Debug, Clone, Error)]
#[error("log store error: {0}")]
pub struct LogStoreError(pub String);

/// Persistent destination of flushed log batches
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn insert_logs(&self, entries: &[SystemLogEntry]) -> Result<(), LogStoreError>;
}

/// Sink tuning, loaded from the `[log_sink]` config table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSinkConfig {
    /// Entries buffered before a forced flush
    pub buffer_capacity: usize,
    /// Timer flush period
    pub flush_interval_secs: u64,
    /// Entries of a failed batch put back for the next attempt
    pub requeue_limit: usize,
    /// Pending entries between loggers and the flusher
    pub channel_capacity: usize,
}

impl Default for LogSinkConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 100,
            flush_interval_secs: 5,
            requeue_limit: 50,
            channel_capacity: 1024,
        }
    }
}

impl LogSinkConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs.max(1))
    }
}

/// In-memory batch owned by the flusher
#[derive(Debug)]
pub struct LogBuffer {
    entries: Vec<SystemLogEntry>,
    capacity: usize,
    requeue_limit: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize, requeue_limit: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            requeue_limit,
        }
    }

    /// Append an entry; returns `true` once the buffer is full
    pub fn push(&mut self, entry: SystemLogEntry) -> bool {
        self.entries.push(entry);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Remove and return everything buffered
    pub fn take(&mut self) -> Vec<SystemLogEntry> {
        std::mem::replace(&mut self.entries, Vec::with_capacity(self.capacity))
    }

    /// Put the tail of a failed batch back in front of newer entries.
    ///
    /// Returns the number of entries dropped.
    pub fn requeue(&mut self, mut failed: Vec<SystemLogEntry>) -> usize {
        let dropped = failed.len().saturating_sub(self.requeue_limit);
        let mut kept = failed.split_off(dropped);
        kept.append(&mut self.entries);
        self.entries = kept;
        dropped
    }

    pub fn entries(&self) -> &[SystemLogEntry] {
        &self.entries
    }
}

/// Cheap, cloneable handle used to emit system log entries.
///
/// Every entry is also mirrored to `tracing` so it shows up in the process
/// log even if the database write never happens.
#[derive(Clone, Debug)]
pub struct SystemLogger {
    tx: mpsc::Sender<SystemLogEntry>,
    clock: Arc<dyn Clock>,
}

impl SystemLogger {
    /// A logger whose entries only reach `tracing`
    pub fn disabled(clock: Arc<dyn Clock>) -> Self {
        let (tx, _rx) = mpsc::channel(1);
        Self { tx, clock }
    }

    pub fn log(
        &self,
        level: LogLevel,
        service: &str,
        message: impl Into<String>,
        metadata: serde_json::Value,
    ) {
        let entry = SystemLogEntry::new(level, service, message, metadata, self.clock.now());
        mirror_to_tracing(&entry);

        match self.tx.try_send(entry) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                metrics::inc_log_entries_dropped();
                tracing::warn!(service, "System log channel full, entry dropped");
            }
            // Flusher gone (shutdown or disabled logger)
            Err(TrySendError::Closed(_)) => {}
        }
    }

    pub fn info(&self, service: &str, message: impl Into<String>, metadata: serde_json::Value) {
        self.log(LogLevel::Info, service, message, metadata);
    }

    pub fn warn(&self, service: &str, message: impl Into<String>, metadata: serde_json::Value) {
        self.log(LogLevel::Warn, service, message, metadata);
    }

    pub fn error(&self, service: &str, message: impl Into<String>, metadata: serde_json::Value) {
        self.log(LogLevel::Error, service, message, metadata);
    }
}

fn mirror_to_tracing(entry: &SystemLogEntry) {
    let service = entry.service.as_str();
    let message = entry.message.as_str();
    let metadata = &entry.metadata;
    match entry.level {
        LogLevel::Debug => tracing::debug!(target: "ridehub::system_log", service, %metadata, "{message}"),
        LogLevel::Info => tracing::info!(target: "ridehub::system_log", service, %metadata, "{message}"),
        LogLevel::Warn => tracing::warn!(target: "ridehub::system_log", service, %metadata, "{message}"),
        LogLevel::Error => tracing::error!(target: "ridehub::system_log", service, %metadata, "{message}"),
    }
}

/// Background consumer that batches entries into the [`LogStore`]
pub struct LogFlusher {
    rx: mpsc::Receiver<SystemLogEntry>,
    buffer: LogBuffer,
    store: Arc<dyn LogStore>,
    flush_interval: Duration,
}

impl LogFlusher {
    /// Main loop; returns after the last [`SystemLogger`] is dropped and the
    /// final flush has been attempted.
    pub async fn run(mut self) {
        let mut ticker =
            tokio::time::interval_at(Instant::now() + self.flush_interval, self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                received = self.rx.recv() => match received {
                    Some(entry) => {
                        if self.buffer.push(entry) {
                            self.flush().await;
                        }
                    }
                    None => {
                        self.flush().await;
                        break;
                    }
                },
                _ = ticker.tick() => self.flush().await,
            }
        }

        if !self.buffer.is_empty() {
            tracing::warn!(
                pending = self.buffer.len(),
                "System log flusher stopped with unflushed entries"
            );
        }
    }

    async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let batch = self.buffer.take();
        match self.store.insert_logs(&batch).await {
            Ok(()) => {
                tracing::trace!(entries = batch.len(), "System log batch flushed");
            }
            Err(e) => {
                metrics::inc_log_flush_failure();
                let attempted = batch.len();
                let dropped = self.buffer.requeue(batch);
                tracing::warn!(
                    error = %e,
                    attempted,
                    requeued = attempted - dropped,
                    dropped,
                    "System log flush failed"
                );
            }
        }
    }
}

/// Create a logger handle and the flusher task feeding `store`
pub fn spawn_system_logger(
    store: Arc<dyn LogStore>,
    config: &LogSinkConfig,
    clock: Arc<dyn Clock>,
) -> (SystemLogger, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let flusher = LogFlusher {
        rx,
        buffer: LogBuffer::new(config.buffer_capacity, config.requeue_limit),
        store,
        flush_interval: config.flush_interval(),
    };
    let handle = tokio::spawn(flusher.run());
    (SystemLogger { tx, clock }, handle)
}
