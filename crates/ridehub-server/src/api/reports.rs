//! Report generation and saved reports

use super::{audit, AdminActor};
use crate::error::{AdminError, AdminResult};
use crate::models::{NewReport, SavedReport};
use crate::reporting::{generate_report, RangePreset, Report, ReportFilters, ReportType};
use crate::response::{ok, ApiResponse};
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const DEFAULT_REPORT_LIST_LIMIT: u32 = 20;
pub const MAX_REPORT_LIST_LIMIT: u32 = 100;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportRequest {
    pub report_type: Option<String>,
    pub date_range: Option<String>,
    #[serde(default)]
    pub filters: ReportFilters,
    /// Only `json` is produced
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedReport {
    pub report: Report,
    pub generated_at: DateTime<Utc>,
    pub generated_by: String,
    pub report_type: ReportType,
    pub date_range: RangePreset,
    /// Id of the saved copy; absent when saving failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportListQuery {
    pub limit: Option<u32>,
}

/// POST /api/admin/reports/generate
pub async fn generate(
    State(state): State<AppState>,
    admin: AdminActor,
    payload: Result<Json<GenerateReportRequest>, JsonRejection>,
) -> AdminResult<Json<ApiResponse<GeneratedReport>>> {
    let Json(request) = payload?;

    let report_type: ReportType = request
        .report_type
        .as_deref()
        .ok_or_else(|| AdminError::validation("reportType is required"))?
        .parse()
        .map_err(AdminError::Validation)?;

    if let Some(format) = request.format.as_deref() {
        if !format.eq_ignore_ascii_case("json") {
            return Err(AdminError::validation(format!(
                "Unsupported report format '{}'. Only 'json' is available",
                format
            )));
        }
    }

    let preset = RangePreset::parse(request.date_range.as_deref().unwrap_or_default());
    let now = state.clock.now();
    let range = preset.resolve(now);

    let report = generate_report(&*state.store, report_type, range, &request.filters).await?;

    let saved = NewReport {
        report_type: report_type.as_str().to_string(),
        date_range: preset.as_str().to_string(),
        filters: serde_json::to_value(&request.filters).unwrap_or_default(),
        data: serde_json::to_value(&report).unwrap_or_default(),
        generated_by: admin.0.clone(),
        created_at: now,
    };
    let report_id = match state.store.save_report(&saved).await {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!(error = %e, report_type = %report_type, "Failed to save generated report");
            None
        }
    };

    audit(
        &state,
        &admin,
        "generate",
        "report",
        json!(report_id),
        json!({ "report_type": report_type, "date_range": preset }),
    );

    Ok(ok(GeneratedReport {
        report,
        generated_at: now,
        generated_by: admin.0,
        report_type,
        date_range: preset,
        report_id,
    }))
}

/// GET /api/admin/reports
pub async fn list_reports(
    State(state): State<AppState>,
    query: Result<Query<ReportListQuery>, QueryRejection>,
) -> AdminResult<Json<ApiResponse<Vec<SavedReport>>>> {
    let Query(query) = query?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_REPORT_LIST_LIMIT)
        .clamp(1, MAX_REPORT_LIST_LIMIT);
    Ok(ok(state.store.list_reports(limit).await?))
}

/// GET /api/admin/reports/:id
pub async fn get_report(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AdminResult<Json<ApiResponse<SavedReport>>> {
    let Path(id) = id?;
    state
        .store
        .get_report(id)
        .await?
        .map(ok)
        .ok_or_else(|| AdminError::not_found(format!("Report {} not found", id)))
}

/// DELETE /api/admin/reports/:id
pub async fn delete_report(
    State(state): State<AppState>,
    admin: AdminActor,
    id: Result<Path<i64>, PathRejection>,
) -> AdminResult<Json<ApiResponse<serde_json::Value>>> {
    let Path(id) = id?;
    if !state.store.delete_report(id).await? {
        return Err(AdminError::not_found(format!("Report {} not found", id)));
    }
    audit(&state, &admin, "delete", "report", json!(id), json!(null));
    Ok(ok(json!({ "id": id, "deleted": true })))
}
