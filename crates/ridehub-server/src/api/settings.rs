//! System settings endpoints

use super::{audit, AdminActor};
use crate::error::{AdminError, AdminResult};
use crate::models::Setting;
use crate::response::{ok, ApiResponse};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

pub const MAX_KEY_LEN: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct UpsertSettingRequest {
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Settings are stored as text; scalars keep their literal form and
/// structured values are stored as JSON.
fn setting_value(value: Option<Value>) -> AdminResult<String> {
    match value {
        None | Some(Value::Null) => Err(AdminError::validation("value is required")),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Ok(other.to_string()),
    }
}

fn validate_key(key: &str) -> AdminResult<&str> {
    let key = key.trim();
    if key.is_empty() {
        return Err(AdminError::validation("Setting key must not be empty"));
    }
    if key.chars().count() > MAX_KEY_LEN {
        return Err(AdminError::validation(format!(
            "Setting key must be at most {} characters",
            MAX_KEY_LEN
        )));
    }
    Ok(key)
}

/// GET /api/admin/settings
pub async fn list_settings(
    State(state): State<AppState>,
) -> AdminResult<Json<ApiResponse<Vec<Setting>>>> {
    Ok(ok(state.store.list_settings().await?))
}

/// PUT /api/admin/settings/:key
pub async fn upsert_setting(
    State(state): State<AppState>,
    admin: AdminActor,
    Path(key): Path<String>,
    payload: Result<Json<UpsertSettingRequest>, JsonRejection>,
) -> AdminResult<Json<ApiResponse<Setting>>> {
    let Json(request) = payload?;
    let key = validate_key(&key)?;
    let value = setting_value(request.value)?;

    let setting = state
        .store
        .upsert_setting(key, &value, request.description.as_deref(), &admin.0)
        .await?;

    audit(
        &state,
        &admin,
        "upsert",
        "setting",
        json!(key),
        json!({ "value": value }),
    );
    Ok(ok(setting))
}
