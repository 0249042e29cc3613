//! Reduces database, API and host probes into health statuses

use super::resources::{ResourceSampler, ResourceSnapshot, SampleError};
use super::{
    ApiHealth, CheckMode, DatabaseHealth, HealthCheckResult, HealthReport, SERVICE_API,
    SERVICE_CPU, SERVICE_DATABASE, SERVICE_DISK, SERVICE_MEMORY, SERVICE_SYSTEM,
};
use crate::store::{AdminStore, StoreError};
use chrono::{DateTime, Utc};
use ridehub_core_health::{determine_overall_status, HealthThresholds};
use ridehub_observability::{metrics, ApiMetricsCounter, Clock};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::time::Instant;

pub struct HealthEvaluator {
    store: Arc<dyn AdminStore>,
    api_metrics: Arc<ApiMetricsCounter>,
    sampler: Arc<dyn ResourceSampler>,
    thresholds: HealthThresholds,
    clock: Arc<dyn Clock>,
}

impl HealthEvaluator {
    pub fn new(
        store: Arc<dyn AdminStore>,
        api_metrics: Arc<ApiMetricsCounter>,
        sampler: Arc<dyn ResourceSampler>,
        thresholds: HealthThresholds,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            api_metrics,
            sampler,
            thresholds,
            clock,
        }
    }

    pub fn thresholds(&self) -> &HealthThresholds {
        &self.thresholds
    }

    /// Time `SELECT 1` and read the connection count
    ///
    /// A failed query yields `error` with no response time; it is never
    /// surfaced as an `Err`.
    pub async fn check_database_health(&self) -> DatabaseHealth {
        let started = Instant::now();
        let probe = async {
            self.store.ping().await?;
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            let connections = self.store.connection_count().await?;
            Ok::<_, StoreError>((elapsed_ms, connections))
        }
        .await;

        match probe {
            Ok((elapsed_ms, connections)) => DatabaseHealth {
                status: self.thresholds.database.classify(Some(elapsed_ms)),
                response_time_ms: Some(elapsed_ms),
                connections: Some(connections),
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Database health probe failed");
                DatabaseHealth {
                    status: self.thresholds.database.classify(None),
                    response_time_ms: None,
                    connections: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Grade the live metrics window
    pub fn check_api_health(&self) -> ApiHealth {
        let snapshot = self.api_metrics.snapshot();
        ApiHealth {
            status: self
                .thresholds
                .api
                .classify(snapshot.error_rate, snapshot.avg_response_time_ms),
            response_time_ms: snapshot.avg_response_time_ms,
            requests_per_minute: snapshot.requests_per_minute,
            error_rate: snapshot.error_rate,
        }
    }

    pub async fn sample_resources(&self) -> Result<ResourceSnapshot, SampleError> {
        self.sampler.sample().await
    }

    /// One result each for CPU, memory and disk
    pub fn check_resources(
        &self,
        snapshot: &ResourceSnapshot,
        timestamp: DateTime<Utc>,
    ) -> Vec<HealthCheckResult> {
        let cpu = &snapshot.cpu;
        let memory = &snapshot.memory;
        let disk = &snapshot.disk;

        vec![
            HealthCheckResult {
                service_name: SERVICE_CPU.to_string(),
                status: self.thresholds.cpu.classify(cpu.usage_percent),
                response_time_ms: None,
                timestamp,
                detail: detail(json!({
                    "usage_percent": cpu.usage_percent,
                    "cores": cpu.cores,
                    "load_average": cpu.load_average,
                })),
            },
            HealthCheckResult {
                service_name: SERVICE_MEMORY.to_string(),
                status: self.thresholds.memory.classify(memory.usage_percent),
                response_time_ms: None,
                timestamp,
                detail: detail(json!({
                    "usage_percent": memory.usage_percent,
                    "used_bytes": memory.used_bytes,
                    "total_bytes": memory.total_bytes,
                })),
            },
            HealthCheckResult {
                service_name: SERVICE_DISK.to_string(),
                status: self.thresholds.disk.classify(disk.usage_percent),
                response_time_ms: None,
                timestamp,
                detail: detail(json!({
                    "usage_percent": disk.usage_percent,
                    "mount_point": disk.mount_point,
                    "used_bytes": disk.used_bytes,
                    "total_bytes": disk.total_bytes,
                })),
            },
        ]
    }

    /// Run every probe and reduce to an overall status
    ///
    /// A probe that fails outright grades as `error` in periodic mode and
    /// `critical` when an administrator asked for the check.
    pub async fn run_checks(&self, mode: CheckMode) -> HealthReport {
        let now = self.clock.now();
        let mut checks = Vec::with_capacity(5);

        let database = self.check_database_health().await;
        let mut db_detail = Map::new();
        db_detail.insert("connections".into(), json!(database.connections));
        if let Some(error) = &database.error {
            db_detail.insert("error".into(), Value::from(error.clone()));
        }
        checks.push(HealthCheckResult {
            service_name: SERVICE_DATABASE.to_string(),
            status: if database.error.is_some() {
                mode.failure_status()
            } else {
                database.status
            },
            response_time_ms: database.response_time_ms,
            timestamp: now,
            detail: db_detail,
        });

        let api = self.check_api_health();
        checks.push(HealthCheckResult {
            service_name: SERVICE_API.to_string(),
            status: api.status,
            response_time_ms: Some(api.response_time_ms),
            timestamp: now,
            detail: detail(json!({
                "requests_per_minute": api.requests_per_minute,
                "error_rate": api.error_rate,
            })),
        });

        match self.sample_resources().await {
            Ok(snapshot) => checks.extend(self.check_resources(&snapshot, now)),
            Err(e) => {
                tracing::warn!(error = %e, "Resource sampling failed");
                checks.push(HealthCheckResult {
                    service_name: SERVICE_SYSTEM.to_string(),
                    status: mode.failure_status(),
                    response_time_ms: None,
                    timestamp: now,
                    detail: detail(json!({ "error": e.to_string() })),
                });
            }
        }

        let overall_status = determine_overall_status(checks.iter().map(|c| c.status));
        HealthReport {
            overall_status,
            checks,
            checked_at: now,
        }
    }

    /// Persist a run and publish it to the Prometheus gauges
    ///
    /// Persistence failures are logged and otherwise ignored.
    pub async fn record(&self, report: &HealthReport) {
        for check in &report.checks {
            metrics::set_health_status(&check.service_name, check.status.rank());
        }
        metrics::set_health_status("overall", report.overall_status.rank());

        if let Err(e) = self.store.record_health_checks(&report.checks).await {
            tracing::warn!(error = %e, "Failed to persist health checks");
        }
    }
}

impl std::fmt::Debug for HealthEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthEvaluator")
            .field("thresholds", &self.thresholds)
            .finish_non_exhaustive()
    }
}

fn detail(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
