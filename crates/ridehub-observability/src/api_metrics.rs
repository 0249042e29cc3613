//! Rolling per-minute API metrics
//!
//! [`ApiMetricsCounter`] keeps one live accumulator that every completed
//! request feeds, plus a bounded window of closed minute buckets. A timer task
//! (see [`ApiMetricsCounter::spawn_rollover`]) closes the live accumulator once
//! per period.
//!
//! Accuracy is dashboard-grade: there are no histograms or percentiles, and
//! everything resets when the process restarts.
//!
//! ## Example
//!
//! ```
//! use ridehub_observability::{ApiMetricsCounter, SystemClock};
//! use std::sync::Arc;
//!
//! let counter = ApiMetricsCounter::new(Arc::new(SystemClock));
//! counter.track_request(120, false);
//! counter.track_request(80, true);
//!
//! let snapshot = counter.snapshot();
//! assert_eq!(snapshot.avg_response_time_ms, 100);
//! assert_eq!(snapshot.error_rate, 0.5);
//! ```

use crate::clock::Clock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Maximum number of closed minute buckets retained
pub const WINDOW_MINUTES: usize = 60;

/// Default rollover period
pub const DEFAULT_ROLLOVER_PERIOD: Duration = Duration::from_secs(60);

/// One minute of request activity.
///
/// `error_count <= count` always holds because errors are only counted
/// together with a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinuteBucket {
    /// Minute index since the Unix epoch
    pub minute: i64,
    pub count: u64,
    pub total_response_time_ms: u64,
    pub error_count: u64,
}

impl MinuteBucket {
    fn empty(minute: i64) -> Self {
        Self {
            minute,
            ..Default::default()
        }
    }

    fn absorb(&mut self, other: &MinuteBucket) {
        self.count = self.count.saturating_add(other.count);
        self.total_response_time_ms = self
            .total_response_time_ms
            .saturating_add(other.total_response_time_ms);
        self.error_count = self.error_count.saturating_add(other.error_count);
    }
}

/// Point-in-time view served to the dashboard and the API health check
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiMetrics {
    /// Requests tagged with the current minute
    pub requests_per_minute: u64,
    /// Rounded mean latency of the live accumulator (0 when idle)
    pub avg_response_time_ms: u64,
    /// Errors / requests in the live accumulator (0 when idle)
    pub error_rate: f64,
    /// Requests in the live accumulator plus the retained window
    pub total_requests: u64,
}

#[derive(Debug)]
struct CounterState {
    current: MinuteBucket,
    history: VecDeque<MinuteBucket>,
}

/// In-process rolling request counter.
///
/// Shared as `Arc<ApiMetricsCounter>`; all methods take `&self`.
#[derive(Debug)]
pub struct ApiMetricsCounter {
    clock: Arc<dyn Clock>,
    state: Mutex<CounterState>,
}

impl ApiMetricsCounter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let minute = clock.minute_index();
        Self {
            clock,
            state: Mutex::new(CounterState {
                current: MinuteBucket::empty(minute),
                history: VecDeque::with_capacity(WINDOW_MINUTES + 1),
            }),
        }
    }

    // A panic elsewhere must not disable request tracking.
    fn lock(&self) -> MutexGuard<'_, CounterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one completed request. Never fails.
    pub fn track_request(&self, response_time_ms: u64, is_error: bool) {
        let mut state = self.lock();
        let current = &mut state.current;
        current.count = current.count.saturating_add(1);
        current.total_response_time_ms = current
            .total_response_time_ms
            .saturating_add(response_time_ms);
        if is_error {
            current.error_count = current.error_count.saturating_add(1);
        }
    }

    /// Compute the dashboard figures from the live accumulator
    pub fn snapshot(&self) -> ApiMetrics {
        let now_minute = self.clock.minute_index();
        let state = self.lock();
        let current = &state.current;

        let (avg_response_time_ms, error_rate) = if current.count == 0 {
            (0, 0.0)
        } else {
            let count = current.count as f64;
            (
                (current.total_response_time_ms as f64 / count).round() as u64,
                current.error_count as f64 / count,
            )
        };

        let same_minute: u64 = state
            .history
            .iter()
            .filter(|bucket| bucket.minute == now_minute)
            .map(|bucket| bucket.count)
            .sum();
        let retained: u64 = state.history.iter().map(|bucket| bucket.count).sum();

        ApiMetrics {
            requests_per_minute: current.count + same_minute,
            avg_response_time_ms,
            error_rate,
            total_requests: current.count + retained,
        }
    }

    /// Close the live accumulator into the window and start a fresh one.
    ///
    /// The closed bucket is keyed by the current minute index; a second
    /// rollover within the same minute merges into that bucket. Buckets older
    /// than [`WINDOW_MINUTES`] minutes are evicted.
    pub fn rollover(&self) {
        let now_minute = self.clock.minute_index();
        let mut state = self.lock();

        let mut closed = std::mem::replace(&mut state.current, MinuteBucket::empty(now_minute));
        closed.minute = now_minute;

        match state.history.back_mut() {
            Some(last) if last.minute == now_minute => last.absorb(&closed),
            _ => state.history.push_back(closed),
        }

        let oldest_kept = now_minute - WINDOW_MINUTES as i64;
        while state
            .history
            .front()
            .is_some_and(|bucket| bucket.minute <= oldest_kept)
        {
            state.history.pop_front();
        }
        while state.history.len() > WINDOW_MINUTES {
            state.history.pop_front();
        }

        tracing::trace!(
            minute = now_minute,
            retained = state.history.len(),
            "API metrics rolled over"
        );
    }

    /// Closed buckets, oldest first
    pub fn history(&self) -> Vec<MinuteBucket> {
        self.lock().history.iter().copied().collect()
    }

    /// Copy of the live accumulator
    pub fn current(&self) -> MinuteBucket {
        self.lock().current
    }

    /// Spawn the timer task that calls [`rollover`](Self::rollover) every
    /// `period`. The first rollover happens one period after spawning.
    pub fn spawn_rollover(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let counter = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                counter.rollover();
            }
        })
    }
}
