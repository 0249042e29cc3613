//! Per-day analytics breakdowns for the dashboard charts

use super::date_range::{DateRange, RangePreset};
use crate::store::ReportingStore;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsType {
    Users,
    Rides,
    Bookings,
    Revenue,
}

impl AnalyticsType {
    pub const ALL: [AnalyticsType; 4] = [
        AnalyticsType::Users,
        AnalyticsType::Rides,
        AnalyticsType::Bookings,
        AnalyticsType::Revenue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyticsType::Users => "users",
            AnalyticsType::Rides => "rides",
            AnalyticsType::Bookings => "bookings",
            AnalyticsType::Revenue => "revenue",
        }
    }

    /// Source table of the breakdown
    pub fn table(&self) -> &'static str {
        match self {
            AnalyticsType::Users => "users",
            AnalyticsType::Rides => "rides",
            AnalyticsType::Bookings | AnalyticsType::Revenue => "bookings",
        }
    }

    /// Metric keys present on every data point
    pub fn metrics(&self) -> &'static [&'static str] {
        match self {
            AnalyticsType::Users => &["new_users", "drivers", "passengers"],
            AnalyticsType::Rides => &["rides", "completed", "cancelled"],
            AnalyticsType::Bookings => &["bookings", "seats", "confirmed"],
            AnalyticsType::Revenue => &["revenue", "paid_bookings"],
        }
    }
}

impl fmt::Display for AnalyticsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalyticsType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalyticsType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| {
                format!(
                    "Invalid analytics type '{}'. Expected one of: users, rides, bookings, revenue",
                    s
                )
            })
    }
}

/// One day of a breakdown: `{date, <metric>: <value>, ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub metrics: Map<String, Value>,
}

impl DailyPoint {
    /// A point with every metric of `kind` set to zero
    pub fn zeroed(kind: AnalyticsType, date: NaiveDate) -> Self {
        let metrics = kind
            .metrics()
            .iter()
            .map(|name| (name.to_string(), Value::from(0)))
            .collect();
        Self { date, metrics }
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).and_then(Value::as_f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSeries {
    #[serde(rename = "type")]
    pub kind: AnalyticsType,
    pub period: RangePreset,
    pub data: Vec<DailyPoint>,
}

/// Two zeroed points at the range boundaries
///
/// Stands in for real data when the source table is missing or the
/// breakdown query fails, so the chart always has something to draw.
pub fn synthetic_series(kind: AnalyticsType, range: &DateRange) -> Vec<DailyPoint> {
    vec![
        DailyPoint::zeroed(kind, range.start_date),
        DailyPoint::zeroed(kind, range.end_date),
    ]
}

/// Per-day breakdown of `kind` over `range`
///
/// Never fails: a missing table or a failed query degrades to
/// [`synthetic_series`]. Callers cannot tell those apart from an empty range.
pub async fn daily_series<S>(store: &S, kind: AnalyticsType, range: &DateRange) -> Vec<DailyPoint>
where
    S: ReportingStore + ?Sized,
{
    match store.table_exists(kind.table()).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(table = kind.table(), "Analytics table missing, returning zero series");
            return synthetic_series(kind, range);
        }
        Err(e) => {
            tracing::warn!(table = kind.table(), error = %e, "Table lookup failed, returning zero series");
            return synthetic_series(kind, range);
        }
    }

    match store.daily_breakdown(kind, range).await {
        Ok(points) if points.is_empty() => synthetic_series(kind, range),
        Ok(points) => points,
        Err(e) => {
            tracing::warn!(kind = %kind, error = %e, "Analytics query failed, returning zero series");
            synthetic_series(kind, range)
        }
    }
}
