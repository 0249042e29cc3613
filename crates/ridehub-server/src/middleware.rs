//! Request metrics middleware

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use ridehub_observability::{metrics, LogLevel};
use serde_json::json;
use std::time::Instant;

/// Paths scraped by infrastructure; kept out of the API window and the sink
const UNTRACKED_PATHS: &[&str] = &["/api/health", "/metrics"];

/// Feed every request into the rolling API metrics, Prometheus and the
/// system log sink
///
/// 4xx and 5xx responses count as errors. Sink entries are `info` below 400,
/// `warn` for 4xx and `error` for 5xx, under service `api`.
pub async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    if UNTRACKED_PATHS.contains(&path.as_str()) {
        return response;
    }

    let elapsed = started.elapsed();
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    let status = response.status();
    let is_error = status.is_client_error() || status.is_server_error();

    state.api_metrics.track_request(elapsed_ms, is_error);
    metrics::observe_http_request(method.as_str(), status.as_u16(), elapsed.as_secs_f64());

    let level = if status.is_server_error() {
        LogLevel::Error
    } else if status.is_client_error() {
        LogLevel::Warn
    } else {
        LogLevel::Info
    };
    state.logger.log(
        level,
        "api",
        format!("{} {} {}", method, path, status.as_u16()),
        json!({
            "method": method.as_str(),
            "path": path,
            "status": status.as_u16(),
            "response_time_ms": elapsed_ms,
        }),
    );

    response
}
