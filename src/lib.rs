/*!
 * RideHub - ridesharing platform back office
 *
 * Process wiring for the admin API:
 * - TOML configuration with environment overrides
 * - Structured logging (compact stdout or JSON file)
 * - Server startup and one-shot health checks
 *
 * The HTTP service itself lives in `ridehub-server`.
 */

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, LogLevel, LoggingConfig};
pub use error::{Result, RideHubError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Start the admin API on a fresh multi-threaded runtime and block until it
/// shuts down
pub fn serve(config: AppConfig) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().map_err(RideHubError::Runtime)?;
    runtime.block_on(ridehub_server::start_server(config.server))?;
    Ok(())
}

/// Run one on-demand health check and return the report
pub fn check(config: AppConfig) -> Result<ridehub_server::monitoring::HealthReport> {
    let runtime = tokio::runtime::Runtime::new().map_err(RideHubError::Runtime)?;
    Ok(runtime.block_on(ridehub_server::check_once(config.server))?)
}
