//! Success envelope shared by every admin endpoint

use axum::Json;
use serde::{Deserialize, Serialize};

/// `{ "success": true, "data": ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}
