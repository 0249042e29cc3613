//! System health, metrics and log endpoints

use crate::error::{AdminError, AdminResult};
use crate::models::{SystemLogRecord, UserCounts};
use crate::monitoring::{
    CheckMode, CpuUsage, DatabaseHealth, DiskUsage, HealthReport, MemoryUsage,
};
use crate::response::{ok, ApiResponse};
use crate::state::AppState;
use crate::store::LogFilter;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use ridehub_core_health::HealthStatus;
use ridehub_observability::{ApiMetrics, LogLevel};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const DEFAULT_LOG_LIMIT: u32 = 50;
pub const MAX_LOG_LIMIT: u32 = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub status: HealthStatus,
    pub response_time_ms: Option<u64>,
    pub last_check: DateTime<Utc>,
    pub detail: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealthData {
    pub overall_status: HealthStatus,
    pub recent_logs: Vec<SystemLogRecord>,
    pub service_summary: BTreeMap<String, ServiceSummary>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMetricsData {
    pub cpu: CpuUsage,
    pub memory: MemoryUsage,
    pub disk: DiskUsage,
    pub users: UserCounts,
    pub api: ApiMetrics,
    pub database: DatabaseHealth,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub level: Option<String>,
    pub service: Option<String>,
    pub limit: Option<u32>,
}

/// GET /api/admin/system/health
///
/// Runs periodic-mode checks, persists them, and returns them with the most
/// recent warnings and errors. Probe failures show up as statuses.
pub async fn system_health(State(state): State<AppState>) -> Json<ApiResponse<SystemHealthData>> {
    let report = state.evaluator.run_checks(CheckMode::Periodic).await;
    state.evaluator.record(&report).await;

    let limit = state.config.health.recent_logs_limit;
    let recent_logs = match state.store.recent_logs(&LogFilter::recent_problems(limit)).await {
        Ok(logs) => logs,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load recent system logs");
            Vec::new()
        }
    };

    let service_summary = report
        .checks
        .iter()
        .map(|check| {
            (
                check.service_name.clone(),
                ServiceSummary {
                    status: check.status,
                    response_time_ms: check.response_time_ms,
                    last_check: check.timestamp,
                    detail: check.detail.clone(),
                },
            )
        })
        .collect();

    ok(SystemHealthData {
        overall_status: report.overall_status,
        recent_logs,
        service_summary,
        last_updated: report.checked_at,
    })
}

/// POST /api/admin/system/health/check
pub async fn run_health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthReport>> {
    let report = state.evaluator.run_checks(CheckMode::OnDemand).await;
    state.evaluator.record(&report).await;
    tracing::info!(status = %report.overall_status, "On-demand health check complete");
    ok(report)
}

/// GET /api/admin/system/metrics
pub async fn system_metrics(
    State(state): State<AppState>,
) -> AdminResult<Json<ApiResponse<SystemMetricsData>>> {
    let resources = state
        .evaluator
        .sample_resources()
        .await
        .map_err(|e| AdminError::Internal(e.to_string()))?;

    let now = state.clock.now();
    let users = match state.store.user_counts(now.date_naive()).await {
        Ok(counts) => counts,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to count users");
            UserCounts::default()
        }
    };
    let database = state.evaluator.check_database_health().await;

    Ok(ok(SystemMetricsData {
        cpu: resources.cpu,
        memory: resources.memory,
        disk: resources.disk,
        users,
        api: state.api_metrics.snapshot(),
        database,
        timestamp: now,
    }))
}

/// GET /api/admin/system/logs
pub async fn system_logs(
    State(state): State<AppState>,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> AdminResult<Json<ApiResponse<Vec<SystemLogRecord>>>> {
    let Query(query) = query?;

    let levels = match query.level.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        Some(level) => vec![level
            .parse::<LogLevel>()
            .map_err(AdminError::Validation)?],
        None => Vec::new(),
    };
    let filter = LogFilter {
        levels,
        service: query.service.filter(|s| !s.trim().is_empty()),
        limit: query.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT),
    };

    let logs = state.store.recent_logs(&filter).await?;
    Ok(ok(logs))
}
