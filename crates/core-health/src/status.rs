//! Health severities and severity reduction

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Ordinal health severity.
///
/// Variant order is the severity order, so `Ord` gives
/// `Healthy < Warning < Error < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Everything within thresholds
    #[default]
    Healthy,
    /// Degraded but serving
    Warning,
    /// A component is failing
    Error,
    /// Immediate attention required
    Critical,
}

impl HealthStatus {
    /// All severities, lowest first
    pub const ALL: [HealthStatus; 4] = [
        HealthStatus::Healthy,
        HealthStatus::Warning,
        HealthStatus::Error,
        HealthStatus::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Error => "error",
            HealthStatus::Critical => "critical",
        }
    }

    /// Numeric rank (0 = healthy, 3 = critical), used for gauges
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored status string is not a known severity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown health status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for HealthStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "healthy" => Ok(HealthStatus::Healthy),
            "warning" => Ok(HealthStatus::Warning),
            "error" => Ok(HealthStatus::Error),
            "critical" => Ok(HealthStatus::Critical),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Reduce several statuses to the most severe one.
///
/// Empty input is `Healthy`. The result does not depend on input order.
pub fn determine_overall_status<I>(statuses: I) -> HealthStatus
where
    I: IntoIterator<Item = HealthStatus>,
{
    statuses
        .into_iter()
        .max()
        .unwrap_or(HealthStatus::Healthy)
}
