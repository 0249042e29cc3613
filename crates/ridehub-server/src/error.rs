//! Error types for the admin API

use crate::store::StoreError;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AdminError {
    pub fn validation(message: impl Into<String>) -> Self {
        AdminError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AdminError::NotFound(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AdminError::Validation(_) => StatusCode::BAD_REQUEST,
            AdminError::NotFound(_) => StatusCode::NOT_FOUND,
            AdminError::Store(_) | AdminError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AdminError::Validation(msg) | AdminError::NotFound(msg) => msg.clone(),
            AdminError::Store(_) | AdminError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                "Internal server error".to_string()
            }
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

impl From<JsonRejection> for AdminError {
    fn from(rejection: JsonRejection) -> Self {
        AdminError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AdminError {
    fn from(rejection: QueryRejection) -> Self {
        AdminError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AdminError {
    fn from(rejection: PathRejection) -> Self {
        AdminError::Validation(rejection.body_text())
    }
}

pub type AdminResult<T> = Result<T, AdminError>;
