/*!
 * Integration tests for user, ride, settings and feature flag management
 */

mod common;

use axum::http::StatusCode;
use common::TestApp;
use ridehub_server::models::{RideStatus, UserRole, UserStatus};
use ridehub_server::testing::{at, flag, ride, user};
use serde_json::json;

fn seed_users(app: &TestApp) {
    let store = &app.store;
    store.insert_user(user(1, UserRole::Driver, UserStatus::Active, at(2024, 3, 1)));
    store.insert_user(user(2, UserRole::Passenger, UserStatus::Active, at(2024, 3, 2)));
    store.insert_user(user(3, UserRole::Passenger, UserStatus::Suspended, at(2024, 3, 3)));
    store.insert_user(user(4, UserRole::Admin, UserStatus::Active, at(2024, 3, 4)));
}

#[tokio::test]
async fn test_list_users_paginates_newest_first() {
    let app = TestApp::new();
    seed_users(&app);

    let (status, body) = app.get("/api/admin/users?page=1&limit=3").await;
    assert_eq!(status, StatusCode::OK);

    let page = &body["data"];
    assert_eq!(page["total"], 4);
    assert_eq!(page["page"], 1);
    assert_eq!(page["limit"], 3);
    let items = page["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["id"], 4);

    let (_, body) = app.get("/api/admin/users?page=2&limit=3").await;
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], 1);
}

#[tokio::test]
async fn test_list_users_filters() {
    let app = TestApp::new();
    seed_users(&app);

    let (_, body) = app.get("/api/admin/users?role=passenger").await;
    assert_eq!(body["data"]["total"], 2);

    let (_, body) = app.get("/api/admin/users?role=passenger&status=suspended").await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"], 3);

    let (_, body) = app.get("/api/admin/users?search=USER2@").await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["email"], "user2@example.com");

    // Blank filters are ignored
    let (_, body) = app.get("/api/admin/users?role=&status=").await;
    assert_eq!(body["data"]["total"], 4);
}

#[tokio::test]
async fn test_list_users_rejects_unknown_role() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/admin/users?role=pilot").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_get_user() {
    let app = TestApp::new();
    seed_users(&app);

    let (status, body) = app.get("/api/admin/users/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "passenger");

    let (status, body) = app.get("/api/admin/users/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User 99 not found");
}

#[tokio::test]
async fn test_update_user_status_is_audited() {
    let app = TestApp::new();
    seed_users(&app);

    let (status, body) = app
        .patch(
            "/api/admin/users/2/status",
            json!({ "status": "suspended", "reason": "chargeback" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "suspended");

    let (_, body) = app.get("/api/admin/users/2").await;
    assert_eq!(body["data"]["status"], "suspended");

    let audit = app.wait_for_log("audit", |r| r.metadata["entity"] == "user").await;
    assert_eq!(audit.metadata["admin"], "alice");
    assert_eq!(audit.metadata["entity_id"], 2);
    assert_eq!(audit.metadata["changes"]["status"], "suspended");
    assert_eq!(audit.metadata["changes"]["reason"], "chargeback");
}

#[tokio::test]
async fn test_update_user_status_validation() {
    let app = TestApp::new();
    seed_users(&app);

    let (status, _) = app
        .patch("/api/admin/users/2/status", json!({ "status": "deleted" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.patch("/api/admin/users/2/status", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .patch("/api/admin/users/77/status", json!({ "status": "active" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rides_list_filter_and_status() {
    let app = TestApp::new();
    app.store
        .insert_ride(ride(1, 10, RideStatus::Scheduled, at(2024, 3, 1)));
    app.store
        .insert_ride(ride(2, 10, RideStatus::Completed, at(2024, 3, 2)));
    app.store
        .insert_ride(ride(3, 20, RideStatus::Scheduled, at(2024, 3, 3)));

    let (status, body) = app.get("/api/admin/rides?driver_id=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);

    let (_, body) = app.get("/api/admin/rides?status=scheduled").await;
    assert_eq!(body["data"]["total"], 2);

    let (status, _) = app.get("/api/admin/rides?status=flying").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .patch("/api/admin/rides/3/status", json!({ "status": "cancelled" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");

    let (status, _) = app.get("/api/admin/rides/404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_settings_upsert_and_list() {
    let app = TestApp::new();

    let (status, body) = app
        .put(
            "/api/admin/settings/max_seats",
            json!({ "value": 4, "description": "Seats per ride" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["key"], "max_seats");
    assert_eq!(body["data"]["value"], "4");
    assert_eq!(body["data"]["updated_by"], "alice");

    // Second write replaces the value
    let (status, body) = app
        .put("/api/admin/settings/max_seats", json!({ "value": "6" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["value"], "6");

    let (_, body) = app.get("/api/admin/settings").await;
    let settings = body["data"].as_array().unwrap();
    assert_eq!(settings.len(), 1);
    assert_eq!(settings[0]["value"], "6");

    app.wait_for_log("audit", |r| r.metadata["entity"] == "setting")
        .await;
}

#[tokio::test]
async fn test_settings_validation() {
    let app = TestApp::new();

    let (status, body) = app.put("/api/admin/settings/max_seats", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "value is required");

    let long_key = "k".repeat(101);
    let (status, _) = app
        .put(&format!("/api/admin/settings/{long_key}"), json!({ "value": 1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_feature_flag_update() {
    let app = TestApp::new();
    app.store.insert_flag(flag("instant_booking", false, 0));

    let (status, body) = app
        .put(
            "/api/admin/feature-flags/instant_booking",
            json!({ "enabled": true, "rollout_percentage": 25 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["enabled"], true);
    assert_eq!(body["data"]["rollout_percentage"], 25);

    // Omitted rollout keeps the stored value
    let (_, body) = app
        .put(
            "/api/admin/feature-flags/instant_booking",
            json!({ "enabled": false }),
        )
        .await;
    assert_eq!(body["data"]["enabled"], false);
    assert_eq!(body["data"]["rollout_percentage"], 25);

    let (_, body) = app.get("/api/admin/feature-flags").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_feature_flag_validation() {
    let app = TestApp::new();
    app.store.insert_flag(flag("instant_booking", false, 0));

    let (status, body) = app
        .put(
            "/api/admin/feature-flags/instant_booking",
            json!({ "enabled": true, "rollout_percentage": 150 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("between 0 and 100"));

    let (status, _) = app
        .put("/api/admin/feature-flags/ghost", json!({ "enabled": true }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
