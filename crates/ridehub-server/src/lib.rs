//! RideHub Admin API
//!
//! Back-office HTTP service for the RideHub ridesharing platform. Built with
//! Axum on top of a MySQL store.
//!
//! - **System**: health checks, host/API metrics and the persisted system log
//! - **Reporting**: on-demand reports, saved reports and daily analytics
//! - **Management**: users, rides, settings and feature flags

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod monitoring;
pub mod reporting;
pub mod response;
pub mod state;
pub mod store;

pub mod server;

// In-memory store and samplers, used by this crate's tests and downstream ones
pub mod testing;

pub use config::ServerConfig;
pub use error::{AdminError, AdminResult};
pub use server::{build_router, check_once, run_server, ServerError};
pub use state::AppState;

/// Start the admin API server
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    server::run_server(config).await
}
