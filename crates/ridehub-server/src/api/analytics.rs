//! Per-day analytics for dashboard charts

use crate::error::{AdminError, AdminResult};
use crate::reporting::{daily_series, AnalyticsSeries, AnalyticsType, RangePreset};
use crate::response::{ok, ApiResponse};
use crate::state::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub period: Option<String>,
}

/// GET /api/admin/analytics?type=&period=
///
/// `type` defaults to `users` and `period` to `7d`; a blank value counts as
/// absent. An unknown `type` is rejected, an unknown `period` falls back.
pub async fn analytics(
    State(state): State<AppState>,
    query: Result<Query<AnalyticsQuery>, QueryRejection>,
) -> AdminResult<Json<ApiResponse<AnalyticsSeries>>> {
    let Query(query) = query?;

    let kind = match query.kind.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        Some(kind) => kind.parse::<AnalyticsType>().map_err(AdminError::Validation)?,
        None => AnalyticsType::Users,
    };
    let period = RangePreset::parse(query.period.as_deref().unwrap_or_default());
    let range = period.resolve(state.clock.now());

    let data = daily_series(&*state.store, kind, &range).await;
    Ok(ok(AnalyticsSeries { kind, period, data }))
}
