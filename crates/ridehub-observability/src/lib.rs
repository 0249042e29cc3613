//! RideHub Observability
//!
//! In-process observability for the admin API:
//!
//! - **Rolling API metrics** ([`ApiMetricsCounter`]): request count, latency
//!   and error rate over a live accumulator plus a 60-minute window
//! - **System log sink** ([`SystemLogger`] / [`LogFlusher`]): bounded channel
//!   and background batcher writing to any [`LogStore`]
//! - **Prometheus metrics** ([`metrics`]): request, health and sink series
//!
//! Time-dependent pieces take a [`Clock`] so tests can drive them with a
//! [`ManualClock`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use ridehub_observability::{
//!     spawn_system_logger, testing::MemoryLogStore, ApiMetricsCounter, LogSinkConfig,
//!     SystemClock,
//! };
//! use std::{sync::Arc, time::Duration};
//!
//! # async fn example() {
//! let clock = Arc::new(SystemClock);
//!
//! let counter = Arc::new(ApiMetricsCounter::new(clock.clone()));
//! let _rollover = counter.spawn_rollover(Duration::from_secs(60));
//!
//! let store = Arc::new(MemoryLogStore::new());
//! let (logger, _flusher) = spawn_system_logger(store, &LogSinkConfig::default(), clock);
//!
//! counter.track_request(42, false);
//! logger.info("api", "request served", serde_json::json!({"ms": 42}));
//! # }
//! ```

pub mod api_metrics;
pub mod clock;
pub mod event;
pub mod log_sink;
pub mod metrics;

// Testing utilities
pub mod testing;

pub use api_metrics::{ApiMetrics, ApiMetricsCounter, MinuteBucket, DEFAULT_ROLLOVER_PERIOD, WINDOW_MINUTES};
pub use clock::{Clock, ManualClock, SystemClock};
pub use event::{LogLevel, SystemLogEntry};
pub use log_sink::{
    spawn_system_logger, LogBuffer, LogFlusher, LogSinkConfig, LogStore, LogStoreError,
    SystemLogger,
};
