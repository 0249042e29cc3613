/*!
 * Integration tests for report generation, saved reports and analytics
 */

mod common;

use axum::http::StatusCode;
use common::TestApp;
use ridehub_server::models::{BookingStatus, RideStatus, UserRole, UserStatus};
use ridehub_server::testing::{at, booking, ride, user};
use serde_json::{json, Value};

fn seed(app: &TestApp) {
    let store = &app.store;
    store.insert_user(user(1, UserRole::Driver, UserStatus::Active, at(2024, 1, 5)));
    store.insert_user(user(2, UserRole::Passenger, UserStatus::Active, at(2024, 3, 8)));
    store.insert_user(user(3, UserRole::Passenger, UserStatus::Suspended, at(2024, 3, 9)));
    store.insert_user(user(4, UserRole::Driver, UserStatus::Pending, at(2024, 3, 9)));

    store.insert_ride(ride(10, 1, RideStatus::Completed, at(2024, 3, 8)));
    store.insert_ride(ride(11, 4, RideStatus::Scheduled, at(2024, 3, 9)));

    store.insert_booking(booking(1, 10, 20.0, BookingStatus::Completed, at(2024, 3, 8)));
    store.insert_booking(booking(2, 10, 30.0, BookingStatus::Confirmed, at(2024, 3, 9)));
    store.insert_booking(booking(3, 11, 15.0, BookingStatus::Refunded, at(2024, 3, 9)));
}

fn metric(point: &Value, name: &str) -> f64 {
    point[name].as_f64().unwrap_or_else(|| panic!("metric {name} missing in {point}"))
}

#[tokio::test]
async fn test_generate_requires_report_type() {
    let app = TestApp::new();

    let (status, body) = app.post("/api/admin/reports/generate", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("reportType"));

    let (status, body) = app
        .post("/api/admin/reports/generate", json!({ "reportType": "weather" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Invalid report type"));

    assert!(app.store.reports().is_empty());
}

#[tokio::test]
async fn test_generate_rejects_non_json_format() {
    let app = TestApp::new();

    let (status, _) = app
        .post(
            "/api/admin/reports/generate",
            json!({ "reportType": "financial", "format": "pdf" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_rejects_malformed_body() {
    let app = TestApp::new();

    let (status, body) = app
        .post("/api/admin/reports/generate", json!(["not", "an", "object"]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_generate_user_analytics_report() {
    let app = TestApp::new();
    seed(&app);

    let (status, body) = app
        .post(
            "/api/admin/reports/generate",
            json!({ "reportType": "user_analytics", "dateRange": "7d" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let data = &body["data"];
    assert_eq!(data["reportType"], "user_analytics");
    assert_eq!(data["dateRange"], "7d");
    assert_eq!(data["generatedBy"], "alice");
    assert!(data["reportId"].is_i64());

    let report = &data["report"];
    assert_eq!(report["reportType"], "user_analytics");
    assert_eq!(report["period"]["startDate"], "2024-03-03");
    assert_eq!(report["period"]["endDate"], "2024-03-10");

    let summary = &report["summary"];
    assert_eq!(summary["total_users"], 4);
    assert_eq!(summary["new_users"], 3);
    assert_eq!(summary["active_users"], 2);
    assert_eq!(summary["suspended_users"], 1);

    // Saved copy and audit trail
    let saved = app.store.reports();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].generated_by, "alice");
    assert_eq!(saved[0].data, *report);

    let audit = app.wait_for_log("audit", |r| r.metadata["entity"] == "report").await;
    assert_eq!(audit.metadata["admin"], "alice");
    assert_eq!(audit.metadata["action"], "generate");
}

#[tokio::test]
async fn test_generate_unknown_period_falls_back_to_week() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/api/admin/reports/generate",
            json!({ "reportType": "ride_analytics", "dateRange": "fortnight" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["dateRange"], "7d");
    assert_eq!(body["data"]["report"]["summary"]["total_rides"], 0);
}

#[tokio::test]
async fn test_generate_financial_report_with_driver_filter() {
    let app = TestApp::new();
    seed(&app);

    let (status, body) = app
        .post(
            "/api/admin/reports/generate",
            json!({
                "reportType": "financial",
                "dateRange": "30d",
                "filters": { "driverId": 1 }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let summary = &body["data"]["report"]["summary"];
    assert_eq!(summary["total_bookings"], 2);
    assert_eq!(summary["paid_bookings"], 2);
    assert_eq!(summary["gross_revenue"], 50.0);
    assert_eq!(summary["refunded_bookings"], 0);
}

#[tokio::test]
async fn test_generate_still_answers_when_save_fails() {
    let app = TestApp::new();
    app.store.drop_table("reports");

    let (status, body) = app
        .post(
            "/api/admin/reports/generate",
            json!({ "reportType": "system_performance" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].get("reportId").is_none());
}

#[tokio::test]
async fn test_generate_fails_when_store_is_down() {
    let app = TestApp::new();
    app.store.set_query_failure(true);

    let (status, body) = app
        .post("/api/admin/reports/generate", json!({ "reportType": "financial" }))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Internal server error");
}

#[tokio::test]
async fn test_saved_report_lifecycle() {
    let app = TestApp::new();
    seed(&app);

    let (_, body) = app
        .post("/api/admin/reports/generate", json!({ "reportType": "ride_analytics" }))
        .await;
    let id = body["data"]["reportId"].as_i64().unwrap();

    let (status, body) = app.get("/api/admin/reports").await;
    assert_eq!(status, StatusCode::OK);
    let reports = body["data"].as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["id"], id);
    assert_eq!(reports[0]["report_type"], "ride_analytics");

    let (status, body) = app.get(&format!("/api/admin/reports/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["data"]["summary"]["total_rides"], 2);

    let (status, body) = app.delete(&format!("/api/admin/reports/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], true);

    let (status, _) = app.get(&format!("/api/admin/reports/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.delete(&format!("/api/admin/reports/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_report_id_must_be_numeric() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/admin/reports/latest").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_analytics_daily_users() {
    let app = TestApp::new();
    seed(&app);

    let (status, body) = app.get("/api/admin/analytics?type=users&period=7d").await;
    assert_eq!(status, StatusCode::OK);

    let data = &body["data"];
    assert_eq!(data["type"], "users");
    assert_eq!(data["period"], "7d");

    let points = data["data"].as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["date"], "2024-03-08");
    assert_eq!(metric(&points[0], "new_users"), 1.0);
    assert_eq!(points[1]["date"], "2024-03-09");
    assert_eq!(metric(&points[1], "new_users"), 2.0);
    assert_eq!(metric(&points[1], "drivers"), 1.0);
    assert_eq!(metric(&points[1], "passengers"), 1.0);
}

#[tokio::test]
async fn test_analytics_revenue_counts_paid_bookings_only() {
    let app = TestApp::new();
    seed(&app);

    let (status, body) = app.get("/api/admin/analytics?type=revenue").await;
    assert_eq!(status, StatusCode::OK);

    let points = body["data"]["data"].as_array().unwrap();
    let total: f64 = points.iter().map(|p| metric(p, "revenue")).sum();
    assert_eq!(total, 50.0);
}

#[tokio::test]
async fn test_analytics_missing_table_returns_zero_series() {
    let app = TestApp::new();
    app.store.drop_table("rides");

    let (status, body) = app.get("/api/admin/analytics?type=rides&period=30d").await;
    assert_eq!(status, StatusCode::OK);

    let data = &body["data"];
    assert_eq!(data["type"], "rides");
    let points = data["data"].as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["date"], "2024-02-09");
    assert_eq!(points[1]["date"], "2024-03-10");
    for point in points {
        assert_eq!(metric(point, "rides"), 0.0);
        assert_eq!(metric(point, "completed"), 0.0);
        assert_eq!(metric(point, "cancelled"), 0.0);
    }
}

#[tokio::test]
async fn test_analytics_query_failure_returns_zero_series() {
    let app = TestApp::new();
    app.store.set_query_failure(true);

    let (status, body) = app.get("/api/admin/analytics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["type"], "users");
    assert_eq!(body["data"]["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_analytics_rejects_unknown_type() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/admin/analytics?type=weather").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_analytics_blank_parameters_use_defaults() {
    let app = TestApp::new();
    seed(&app);

    let (status, body) = app.get("/api/admin/analytics?type=&period=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["type"], "users");
    assert_eq!(body["data"]["period"], "7d");
    assert_eq!(body["data"]["data"].as_array().unwrap().len(), 2);
}
