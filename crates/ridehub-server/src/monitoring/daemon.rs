//! Background health monitor

use super::{CheckMode, HealthEvaluator, HealthReport};
use ridehub_observability::SystemLogger;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Runs periodic checks on a fixed interval, persists them and raises a
/// `warn` system log entry whenever the overall status is not healthy.
pub struct HealthMonitor {
    evaluator: Arc<HealthEvaluator>,
    logger: SystemLogger,
    interval: Duration,
}

impl HealthMonitor {
    pub fn new(evaluator: Arc<HealthEvaluator>, logger: SystemLogger, interval: Duration) -> Self {
        Self {
            evaluator,
            logger,
            interval,
        }
    }

    /// One monitor cycle
    pub async fn tick(&self) -> HealthReport {
        let report = self.evaluator.run_checks(CheckMode::Periodic).await;
        self.evaluator.record(&report).await;

        if !report.overall_status.is_healthy() {
            let degraded: Vec<_> = report
                .checks
                .iter()
                .filter(|c| !c.status.is_healthy())
                .map(|c| json!({ "service": c.service_name, "status": c.status }))
                .collect();
            self.logger.warn(
                "health",
                format!("System health is {}", report.overall_status),
                json!({ "checks": degraded }),
            );
        }

        tracing::debug!(status = %report.overall_status, "Periodic health check complete");
        report
    }

    pub async fn run(self) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// Spawn the monitor; a zero interval disables it
    pub fn spawn(self) -> Option<JoinHandle<()>> {
        if self.interval.is_zero() {
            tracing::info!("Background health monitor disabled");
            return None;
        }
        tracing::info!(interval_secs = self.interval.as_secs(), "Starting background health monitor");
        Some(tokio::spawn(self.run()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_snapshot, FixedSampler, MemoryStore};
    use ridehub_core_health::HealthThresholds;
    use ridehub_observability::{spawn_system_logger, ApiMetricsCounter, LogLevel, LogSinkConfig, SystemClock};

    fn monitor(store: Arc<MemoryStore>, interval: Duration) -> (HealthMonitor, JoinHandle<()>) {
        let clock = Arc::new(SystemClock);
        let evaluator = Arc::new(HealthEvaluator::new(
            store.clone(),
            Arc::new(ApiMetricsCounter::new(clock.clone())),
            Arc::new(FixedSampler::new(sample_snapshot(10.0, 10.0, 10.0))),
            HealthThresholds::default(),
            clock.clone(),
        ));
        let (logger, flusher) = spawn_system_logger(store, &LogSinkConfig::default(), clock);
        (HealthMonitor::new(evaluator, logger, interval), flusher)
    }

    #[tokio::test]
    async fn test_tick_logs_warning_when_degraded() {
        let store = Arc::new(MemoryStore::new());
        store.set_ping_failure(true);
        let (monitor, flusher) = monitor(store.clone(), Duration::from_secs(300));

        let report = monitor.tick().await;
        assert!(!report.overall_status.is_healthy());
        assert_eq!(store.health_checks().len(), report.checks.len());

        drop(monitor);
        flusher.await.unwrap();

        let logs = store.system_logs();
        assert!(logs
            .iter()
            .any(|l| l.service == "health" && l.level == LogLevel::Warn));
    }

    #[tokio::test]
    async fn test_tick_quiet_when_healthy() {
        let store = Arc::new(MemoryStore::new());
        let (monitor, flusher) = monitor(store.clone(), Duration::from_secs(300));

        monitor.tick().await;
        drop(monitor);
        flusher.await.unwrap();

        assert!(store.system_logs().is_empty());
    }

    #[tokio::test]
    async fn test_zero_interval_disables() {
        let store = Arc::new(MemoryStore::new());
        let (monitor, _flusher) = monitor(store, Duration::ZERO);
        assert!(monitor.spawn().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_monitor_runs_on_interval() {
        let store = Arc::new(MemoryStore::new());
        let (monitor, _flusher) = monitor(store.clone(), Duration::from_secs(300));
        let handle = monitor.spawn().unwrap();

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert!(store.health_checks().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.health_checks().len(), 5);

        handle.abort();
    }
}
