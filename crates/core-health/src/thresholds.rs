//! Named classification thresholds
//!
//! Every magic number used to turn a reading into a [`HealthStatus`] lives
//! here as a configurable value. The database check deliberately has no
//! latency tier by default while the API check does; both are exposed so the
//! asymmetry is visible and can be changed from configuration.

use crate::status::HealthStatus;
use serde::{Deserialize, Serialize};

/// Default error rate above which the API is critical
pub const DEFAULT_API_CRITICAL_ERROR_RATE: f64 = 0.10;

/// Default error rate above which the API is in error
pub const DEFAULT_API_ERROR_ERROR_RATE: f64 = 0.05;

/// Default average response time (ms) above which the API is in warning
pub const DEFAULT_API_WARNING_RESPONSE_TIME_MS: u64 = 2_000;

/// Default resource usage percentage for a warning
pub const DEFAULT_RESOURCE_WARNING_PERCENT: f64 = 80.0;

/// Default resource usage percentage for critical
pub const DEFAULT_RESOURCE_CRITICAL_PERCENT: f64 = 90.0;

/// Thresholds for the API check.
///
/// Error-rate tiers are evaluated before latency, so a slow API with a high
/// error rate reports the error-rate severity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiThresholds {
    /// `error_rate > critical_error_rate` is critical
    pub critical_error_rate: f64,

    /// `error_rate > error_error_rate` is error
    pub error_error_rate: f64,

    /// `avg_response_time_ms > warning_response_time_ms` is warning
    pub warning_response_time_ms: u64,
}

impl Default for ApiThresholds {
    fn default() -> Self {
        Self {
            critical_error_rate: DEFAULT_API_CRITICAL_ERROR_RATE,
            error_error_rate: DEFAULT_API_ERROR_ERROR_RATE,
            warning_response_time_ms: DEFAULT_API_WARNING_RESPONSE_TIME_MS,
        }
    }
}

impl ApiThresholds {
    /// Classify an error rate (0.0 - 1.0) and average latency
    pub fn classify(&self, error_rate: f64, avg_response_time_ms: u64) -> HealthStatus {
        if error_rate > self.critical_error_rate {
            HealthStatus::Critical
        } else if error_rate > self.error_error_rate {
            HealthStatus::Error
        } else if avg_response_time_ms > self.warning_response_time_ms {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        }
    }
}

/// Thresholds for the database check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseThresholds {
    /// Probe latency (ms) above which a reachable database is a warning.
    ///
    /// `None` keeps a reachable database healthy at any latency.
    pub warning_response_time_ms: Option<u64>,
}

impl DatabaseThresholds {
    /// Classify a probe outcome: `Some(latency)` when the probe succeeded
    pub fn classify(&self, probe_latency_ms: Option<u64>) -> HealthStatus {
        match (probe_latency_ms, self.warning_response_time_ms) {
            (None, _) => HealthStatus::Error,
            (Some(latency), Some(limit)) if latency > limit => HealthStatus::Warning,
            (Some(_), _) => HealthStatus::Healthy,
        }
    }
}

/// Usage-percentage thresholds for CPU, memory and disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceThresholds {
    pub warning_percent: f64,
    pub critical_percent: f64,
}

impl Default for ResourceThresholds {
    fn default() -> Self {
        Self {
            warning_percent: DEFAULT_RESOURCE_WARNING_PERCENT,
            critical_percent: DEFAULT_RESOURCE_CRITICAL_PERCENT,
        }
    }
}

impl ResourceThresholds {
    /// Classify a usage percentage (0.0 - 100.0)
    pub fn classify(&self, usage_percent: f64) -> HealthStatus {
        if usage_percent >= self.critical_percent {
            HealthStatus::Critical
        } else if usage_percent >= self.warning_percent {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        }
    }
}

/// All thresholds, as loaded from the `[health.thresholds]` config table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    pub api: ApiThresholds,
    pub database: DatabaseThresholds,
    pub cpu: ResourceThresholds,
    pub memory: ResourceThresholds,
    pub disk: ResourceThresholds,
}
