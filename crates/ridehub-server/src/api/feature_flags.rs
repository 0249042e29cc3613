//! Feature flag endpoints

use super::{audit, AdminActor};
use crate::error::{AdminError, AdminResult};
use crate::models::FeatureFlag;
use crate::response::{ok, ApiResponse};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct UpdateFlagRequest {
    pub enabled: bool,
    #[serde(default)]
    pub rollout_percentage: Option<i64>,
}

fn validate_rollout(rollout: Option<i64>) -> AdminResult<Option<u8>> {
    rollout
        .map(|pct| {
            u8::try_from(pct)
                .ok()
                .filter(|pct| *pct <= 100)
                .ok_or_else(|| {
                    AdminError::validation(format!(
                        "rollout_percentage must be between 0 and 100, got {}",
                        pct
                    ))
                })
        })
        .transpose()
}

/// GET /api/admin/feature-flags
pub async fn list_feature_flags(
    State(state): State<AppState>,
) -> AdminResult<Json<ApiResponse<Vec<FeatureFlag>>>> {
    Ok(ok(state.store.list_feature_flags().await?))
}

/// PUT /api/admin/feature-flags/:name
pub async fn update_feature_flag(
    State(state): State<AppState>,
    admin: AdminActor,
    Path(name): Path<String>,
    payload: Result<Json<UpdateFlagRequest>, JsonRejection>,
) -> AdminResult<Json<ApiResponse<FeatureFlag>>> {
    let Json(request) = payload?;
    let rollout = validate_rollout(request.rollout_percentage)?;

    let flag = state
        .store
        .update_feature_flag(&name, request.enabled, rollout)
        .await?
        .ok_or_else(|| AdminError::not_found(format!("Feature flag '{}' not found", name)))?;

    audit(
        &state,
        &admin,
        "update",
        "feature_flag",
        json!(name),
        json!({ "enabled": request.enabled, "rollout_percentage": rollout }),
    );
    Ok(ok(flag))
}
