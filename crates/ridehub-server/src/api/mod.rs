//! Admin API endpoints

pub mod analytics;
pub mod feature_flags;
pub mod reports;
pub mod rides;
pub mod settings;
pub mod system;
pub mod users;

use crate::state::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde_json::{json, Value};
use std::convert::Infallible;

/// Header set by the upstream auth proxy
pub const ADMIN_HEADER: &str = "x-admin-user";
pub const DEFAULT_ADMIN: &str = "admin";

/// The administrator performing the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminActor(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AdminActor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let name = parts
            .headers
            .get(ADMIN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_ADMIN);
        Ok(AdminActor(name.to_string()))
    }
}

/// Record a mutation in the system log under service `audit`
pub(crate) fn audit(state: &AppState, admin: &AdminActor, action: &str, entity: &str, id: Value, changes: Value) {
    state.logger.info(
        "audit",
        format!("{} {} {}", action, entity, id),
        json!({
            "admin": admin.0,
            "action": action,
            "entity": entity,
            "entity_id": id,
            "changes": changes,
        }),
    );
}
