/*!
 * Integration tests for the system health, metrics and log endpoints
 *
 * Each test drives the full router (middleware included) against an
 * in-memory store, a fixed resource sampler and a manual clock.
 */

mod common;

use axum::http::StatusCode;
use common::TestApp;
use ridehub_observability::{LogLevel, LogStore, SystemLogEntry};
use ridehub_server::models::{UserRole, UserStatus};
use ridehub_server::testing::{at, user, FailingSampler};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_liveness_is_untracked() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    // Liveness probes stay out of the API window
    assert_eq!(app.state.api_metrics.snapshot().total_requests, 0);
}

#[tokio::test]
async fn test_system_health_all_healthy() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/admin/system/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let data = &body["data"];
    assert_eq!(data["overall_status"], "healthy");
    for service in ["database", "api", "cpu", "memory", "disk"] {
        assert_eq!(
            data["service_summary"][service]["status"], "healthy",
            "service {service}"
        );
    }
    assert!(data["recent_logs"].as_array().unwrap().is_empty());

    // Every check of the run is persisted
    assert_eq!(app.store.health_checks().len(), 5);
}

#[tokio::test]
async fn test_database_down_grades_by_mode() {
    let app = TestApp::new();
    app.store.set_ping_failure(true);

    let (status, body) = app.get("/api/admin/system/health").await;
    assert_eq!(status, StatusCode::OK);
    let database = &body["data"]["service_summary"]["database"];
    assert_eq!(database["status"], "error");
    assert!(database["response_time_ms"].is_null());
    assert_eq!(body["data"]["overall_status"], "error");

    let (status, body) = app.post("/api/admin/system/health/check", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["overall_status"], "critical");
    let checks = body["data"]["checks"].as_array().unwrap();
    let database = checks
        .iter()
        .find(|c| c["service_name"] == "database")
        .unwrap();
    assert_eq!(database["status"], "critical");
}

#[tokio::test]
async fn test_health_survives_sampler_failure() {
    let app = TestApp::with_sampler(Arc::new(FailingSampler));

    let (status, body) = app.get("/api/admin/system/health").await;
    assert_eq!(status, StatusCode::OK);

    let summary = body["data"]["service_summary"].as_object().unwrap();
    assert!(summary.contains_key("system"));
    assert!(!summary.contains_key("cpu"));
    assert_eq!(summary["database"]["status"], "healthy");
}

#[tokio::test]
async fn test_system_metrics_reports_counts_and_api_window() {
    let app = TestApp::new();
    app.store
        .insert_user(user(1, UserRole::Driver, UserStatus::Active, at(2024, 3, 10)));
    app.store
        .insert_user(user(2, UserRole::Passenger, UserStatus::Pending, at(2024, 2, 1)));

    // One success and one 404 before the metrics call
    let (status, _) = app.get("/api/admin/users").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get("/api/admin/users/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get("/api/admin/system/metrics").await;
    assert_eq!(status, StatusCode::OK);

    let data = &body["data"];
    assert_eq!(data["cpu"]["usage_percent"], 10.0);
    assert_eq!(data["memory"]["usage_percent"], 20.0);
    assert_eq!(data["disk"]["usage_percent"], 30.0);

    assert_eq!(data["users"]["total"], 2);
    assert_eq!(data["users"]["active"], 1);
    assert_eq!(data["users"]["new_today"], 1);
    assert_eq!(data["users"]["drivers"], 1);

    assert_eq!(data["api"]["total_requests"], 2);
    assert_eq!(data["api"]["error_rate"], 0.5);
    assert_eq!(data["database"]["status"], "healthy");
}

#[tokio::test]
async fn test_system_metrics_fails_without_resources() {
    let app = TestApp::with_sampler(Arc::new(FailingSampler));

    let (status, body) = app.get("/api/admin/system/metrics").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Internal server error");
}

#[tokio::test]
async fn test_system_metrics_zero_users_when_store_fails() {
    let app = TestApp::new();
    app.store.set_query_failure(true);

    let (status, body) = app.get("/api/admin/system/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["users"]["total"], 0);
}

#[tokio::test]
async fn test_system_logs_filters_by_level_and_service() {
    let app = TestApp::new();
    let entries = vec![
        SystemLogEntry::new(LogLevel::Error, "payments", "charge failed", json!({}), at(2024, 3, 9)),
        SystemLogEntry::new(LogLevel::Info, "payments", "charge ok", json!({}), at(2024, 3, 9)),
        SystemLogEntry::new(LogLevel::Error, "matching", "no drivers", json!({}), at(2024, 3, 9)),
    ];
    app.store.insert_logs(&entries).await.unwrap();

    let (status, body) = app
        .get("/api/admin/system/logs?level=error&service=payments")
        .await;
    assert_eq!(status, StatusCode::OK);

    let logs = body["data"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["message"], "charge failed");
    assert_eq!(logs[0]["level"], "error");
}

#[tokio::test]
async fn test_system_logs_rejects_unknown_level() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/admin/system/logs?level=loud").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_recent_problems_appear_in_health() {
    let app = TestApp::new();
    let entries = vec![
        SystemLogEntry::new(LogLevel::Warn, "matching", "slow match", json!({}), at(2024, 3, 9)),
        SystemLogEntry::new(LogLevel::Info, "matching", "matched", json!({}), at(2024, 3, 9)),
    ];
    app.store.insert_logs(&entries).await.unwrap();

    let (_, body) = app.get("/api/admin/system/health").await;
    let logs = body["data"]["recent_logs"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["message"], "slow match");
}

#[tokio::test]
async fn test_requests_reach_the_log_sink() {
    let app = TestApp::new();

    let (status, _) = app.get("/api/admin/users/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let record = app
        .wait_for_log("api", |r| r.message.contains("/api/admin/users/42"))
        .await;
    assert_eq!(record.level, LogLevel::Warn);
    assert_eq!(record.metadata["status"], 404);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/admin/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}
