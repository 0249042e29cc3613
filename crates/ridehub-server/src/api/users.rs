//! User management endpoints

use super::{audit, AdminActor};
use crate::error::{AdminError, AdminResult};
use crate::models::{Page, User, UserRole, UserStatus};
use crate::response::{ok, ApiResponse};
use crate::state::AppState;
use crate::store::{Pagination, UserFilter};
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
pub struct UserListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Parse an optional enum filter, treating blank as absent
pub(crate) fn parse_filter<T>(raw: Option<&str>) -> AdminResult<Option<T>>
where
    T: std::str::FromStr<Err = String>,
{
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<T>().map_err(AdminError::Validation))
        .transpose()
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    query: Result<Query<UserListQuery>, QueryRejection>,
) -> AdminResult<Json<ApiResponse<Page<User>>>> {
    let Query(query) = query?;

    let filter = UserFilter {
        pagination: Pagination::new(query.page, query.limit),
        search: query.search,
        role: parse_filter::<UserRole>(query.role.as_deref())?,
        status: parse_filter::<UserStatus>(query.status.as_deref())?,
    };

    Ok(ok(state.store.list_users(&filter).await?))
}

/// GET /api/admin/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AdminResult<Json<ApiResponse<User>>> {
    let Path(id) = id?;
    state
        .store
        .get_user(id)
        .await?
        .map(ok)
        .ok_or_else(|| AdminError::not_found(format!("User {} not found", id)))
}

/// PATCH /api/admin/users/:id/status
pub async fn update_user_status(
    State(state): State<AppState>,
    admin: AdminActor,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> AdminResult<Json<ApiResponse<User>>> {
    let Path(id) = id?;
    let Json(request) = payload?;
    let status: UserStatus = request.status.parse().map_err(AdminError::Validation)?;

    let user = state
        .store
        .update_user_status(id, status)
        .await?
        .ok_or_else(|| AdminError::not_found(format!("User {} not found", id)))?;

    audit(
        &state,
        &admin,
        "update_status",
        "user",
        json!(id),
        json!({ "status": status, "reason": request.reason }),
    );
    Ok(ok(user))
}
