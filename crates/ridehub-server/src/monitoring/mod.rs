//! Health evaluation: database, API and host resource probes

pub mod daemon;
pub mod evaluator;
pub mod resources;

pub use daemon::HealthMonitor;
pub use evaluator::HealthEvaluator;
pub use resources::{
    CpuUsage, DiskUsage, MemoryUsage, ResourceSampler, ResourceSnapshot, SampleError,
    SysinfoSampler,
};

use chrono::{DateTime, Utc};
use ridehub_core_health::HealthStatus;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Service names used in check results
pub const SERVICE_DATABASE: &str = "database";
pub const SERVICE_API: &str = "api";
pub const SERVICE_CPU: &str = "cpu";
pub const SERVICE_MEMORY: &str = "memory";
pub const SERVICE_DISK: &str = "disk";
pub const SERVICE_SYSTEM: &str = "system";

/// Outcome of one probe, as persisted to `system_health_checks`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub service_name: String,
    pub status: HealthStatus,
    pub response_time_ms: Option<u64>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub detail: Map<String, Value>,
}

/// How a probe failure is graded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    /// Scheduled or dashboard-polled checks
    Periodic,
    /// Administrator-triggered checks
    OnDemand,
}

impl CheckMode {
    pub fn failure_status(&self) -> HealthStatus {
        match self {
            CheckMode::Periodic => HealthStatus::Error,
            CheckMode::OnDemand => HealthStatus::Critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub status: HealthStatus,
    pub response_time_ms: Option<u64>,
    pub connections: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiHealth {
    pub status: HealthStatus,
    pub response_time_ms: u64,
    pub requests_per_minute: u64,
    pub error_rate: f64,
}

/// Every check of one run plus their reduction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub overall_status: HealthStatus,
    pub checks: Vec<HealthCheckResult>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn check(&self, service_name: &str) -> Option<&HealthCheckResult> {
        self.checks.iter().find(|c| c.service_name == service_name)
    }
}
