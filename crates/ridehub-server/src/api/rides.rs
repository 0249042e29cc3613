//! Ride management endpoints

use super::users::{parse_filter, UpdateStatusRequest};
use super::{audit, AdminActor};
use crate::error::{AdminError, AdminResult};
use crate::models::{Page, Ride, RideStatus};
use crate::response::{ok, ApiResponse};
use crate::state::AppState;
use crate::store::{Pagination, RideFilter};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Default, Deserialize)]
pub struct RideListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub driver_id: Option<i64>,
}

/// GET /api/admin/rides
pub async fn list_rides(
    State(state): State<AppState>,
    query: Result<Query<RideListQuery>, QueryRejection>,
) -> AdminResult<Json<ApiResponse<Page<Ride>>>> {
    let Query(query) = query?;

    let filter = RideFilter {
        pagination: Pagination::new(query.page, query.limit),
        status: parse_filter::<RideStatus>(query.status.as_deref())?,
        driver_id: query.driver_id,
    };

    Ok(ok(state.store.list_rides(&filter).await?))
}

/// GET /api/admin/rides/:id
pub async fn get_ride(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AdminResult<Json<ApiResponse<Ride>>> {
    let Path(id) = id?;
    state
        .store
        .get_ride(id)
        .await?
        .map(ok)
        .ok_or_else(|| AdminError::not_found(format!("Ride {} not found", id)))
}

/// PATCH /api/admin/rides/:id/status
pub async fn update_ride_status(
    State(state): State<AppState>,
    admin: AdminActor,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> AdminResult<Json<ApiResponse<Ride>>> {
    let Path(id) = id?;
    let Json(request) = payload?;
    let status: RideStatus = request.status.parse().map_err(AdminError::Validation)?;

    let ride = state
        .store
        .update_ride_status(id, status)
        .await?
        .ok_or_else(|| AdminError::not_found(format!("Ride {} not found", id)))?;

    audit(
        &state,
        &admin,
        "update_status",
        "ride",
        json!(id),
        json!({ "status": status, "reason": request.reason }),
    );
    Ok(ok(ride))
}
