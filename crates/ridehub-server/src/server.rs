//! Axum router and server lifecycle

use crate::api::{analytics, feature_flags, reports, rides, settings, system, users};
use crate::config::ServerConfig;
use crate::middleware::track_requests;
use crate::monitoring::{CheckMode, HealthReport, SysinfoSampler};
use crate::state::AppState;
use crate::store::{MySqlStore, StoreError};
use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, patch, post, put},
    Json, Router,
};
use ridehub_observability::{metrics, spawn_system_logger, Clock, SystemClock, SystemLogger};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// How long shutdown waits for the log flusher to drain
const FLUSH_GRACE_PERIOD: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("database setup failed: {0}")]
    Store(#[from] StoreError),
}

/// Routes under `/api/admin`
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // System
        .route("/system/health", get(system::system_health))
        .route("/system/health/check", post(system::run_health_check))
        .route("/system/metrics", get(system::system_metrics))
        .route("/system/logs", get(system::system_logs))
        // Reporting
        .route("/reports", get(reports::list_reports))
        .route("/reports/generate", post(reports::generate))
        .route(
            "/reports/:id",
            get(reports::get_report).delete(reports::delete_report),
        )
        .route("/analytics", get(analytics::analytics))
        // Users
        .route("/users", get(users::list_users))
        .route("/users/:id", get(users::get_user))
        .route("/users/:id/status", patch(users::update_user_status))
        // Rides
        .route("/rides", get(rides::list_rides))
        .route("/rides/:id", get(rides::get_ride))
        .route("/rides/:id/status", patch(rides::update_ride_status))
        // Settings and flags
        .route("/settings", get(settings::list_settings))
        .route("/settings/:key", put(settings::upsert_setting))
        .route("/feature-flags", get(feature_flags::list_feature_flags))
        .route(
            "/feature-flags/:name",
            put(feature_flags::update_feature_flag),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(parse_origins(origins))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

async fn liveness() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "ridehub-admin",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn prometheus_metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::metrics_text(),
    )
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "Route not found" })),
    )
}

/// Full application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/api/health", get(liveness))
        .route("/metrics", get(prometheus_metrics))
        .nest("/api/admin", admin_routes())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Run the admin API until Ctrl-C
///
/// The MySQL pool connects lazily, so the server starts (and reports the
/// database as unhealthy) while the database is down.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    tracing::info!("Starting RideHub admin API v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(MySqlStore::connect_lazy(
        &config.database.url,
        config.database.max_connections,
        config.database.acquire_timeout(),
    )?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let (logger, flusher) = spawn_system_logger(store.clone(), &config.log_sink, clock.clone());
    let sampler = Arc::new(SysinfoSampler::new(config.health.disk_path.clone()));
    let state = AppState::new(store, sampler, logger, clock, config);

    let rollover = state
        .api_metrics
        .spawn_rollover(state.config.metrics.rollover_interval());
    let monitor = state.health_monitor().spawn();

    let addr = state.config.bind_addr();
    let app = build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    tracing::info!("RideHub admin API listening on http://{}", addr);
    tracing::info!("   Health: http://{}/api/health", addr);
    tracing::info!("   Metrics: http://{}/metrics", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    rollover.abort();
    if let Some(monitor) = monitor {
        monitor.abort();
    }

    // Dropping the last logger lets the flusher write what is buffered
    drop(state);
    if tokio::time::timeout(FLUSH_GRACE_PERIOD, flusher).await.is_err() {
        tracing::warn!("System log flusher did not finish before shutdown");
    }

    tracing::info!("RideHub admin API stopped");
    Ok(())
}

/// Run one on-demand health check against the configured database
///
/// Used by the CLI; the result is persisted like any other check.
pub async fn check_once(config: ServerConfig) -> Result<HealthReport, ServerError> {
    let store = Arc::new(MySqlStore::connect_lazy(
        &config.database.url,
        config.database.max_connections,
        config.database.acquire_timeout(),
    )?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let sampler = Arc::new(SysinfoSampler::new(config.health.disk_path.clone()));
    let logger = SystemLogger::disabled(clock.clone());
    let state = AppState::new(store, sampler, logger, clock, config);

    let report = state.evaluator.run_checks(CheckMode::OnDemand).await;
    state.evaluator.record(&report).await;
    Ok(report)
}
