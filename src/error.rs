/*!
 * Error types for the RideHub CLI
 */

use ridehub_core_health::HealthStatus;
use ridehub_server::ServerError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RideHubError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_UNHEALTHY: i32 = 1;
pub const EXIT_CRITICAL: i32 = 2;
pub const EXIT_FATAL: i32 = 3;

#[derive(Debug, Error)]
pub enum RideHubError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`crate::config::AppConfig`]
    #[error("Invalid config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Any other configuration problem (env overrides, logging setup)
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Failed to start async runtime: {0}")]
    Runtime(std::io::Error),

    #[error(transparent)]
    Server(#[from] ServerError),

    /// A health check finished with an error or critical status
    #[error("System is {0}")]
    Unhealthy(HealthStatus),
}

impl RideHubError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            RideHubError::Unhealthy(HealthStatus::Critical) => EXIT_CRITICAL,
            RideHubError::Unhealthy(_) => EXIT_UNHEALTHY,
            _ => EXIT_FATAL,
        }
    }
}

/// Map a health check outcome to a result: warnings still pass
pub fn health_outcome(status: HealthStatus) -> Result<()> {
    match status {
        HealthStatus::Healthy | HealthStatus::Warning => Ok(()),
        other => Err(RideHubError::Unhealthy(other)),
    }
}
