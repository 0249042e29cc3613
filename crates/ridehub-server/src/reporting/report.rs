//! Summary reports over a date range

use super::date_range::DateRange;
use crate::models::UserRole;
use crate::store::{ReportingStore, StoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    UserAnalytics,
    RideAnalytics,
    Financial,
    SystemPerformance,
}

impl ReportType {
    pub const ALL: [ReportType; 4] = [
        ReportType::UserAnalytics,
        ReportType::RideAnalytics,
        ReportType::Financial,
        ReportType::SystemPerformance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::UserAnalytics => "user_analytics",
            ReportType::RideAnalytics => "ride_analytics",
            ReportType::Financial => "financial",
            ReportType::SystemPerformance => "system_performance",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| {
                format!(
                    "Invalid report type '{}'. Expected one of: user_analytics, ride_analytics, financial, system_performance",
                    s
                )
            })
    }
}

/// Optional narrowing applied on top of the date range
///
/// `role` scopes user analytics; `driver_id` scopes ride and financial
/// reports. Filters that do not apply to a report type are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserAnalyticsSummary {
    pub total_users: i64,
    pub new_users: i64,
    pub active_users: i64,
    pub drivers: i64,
    pub passengers: i64,
    pub suspended_users: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RideAnalyticsSummary {
    pub total_rides: i64,
    pub completed_rides: i64,
    pub cancelled_rides: i64,
    pub scheduled_rides: i64,
    pub seats_offered: i64,
    pub avg_price_per_seat: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub total_bookings: i64,
    pub paid_bookings: i64,
    pub gross_revenue: f64,
    pub avg_booking_value: f64,
    pub refunded_bookings: i64,
    pub refunded_amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemPerformanceSummary {
    pub log_entries: i64,
    pub error_logs: i64,
    pub warning_logs: i64,
    pub health_checks: i64,
    pub failed_health_checks: i64,
    pub avg_check_response_time_ms: f64,
}

/// The single aggregate row of a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportSummary {
    UserAnalytics(UserAnalyticsSummary),
    RideAnalytics(RideAnalyticsSummary),
    Financial(FinancialSummary),
    SystemPerformance(SystemPerformanceSummary),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub summary: ReportSummary,
    pub period: DateRange,
    pub report_type: ReportType,
}

/// Run the aggregate for `report_type` over `range`
pub async fn generate_report<S>(
    store: &S,
    report_type: ReportType,
    range: DateRange,
    filters: &ReportFilters,
) -> StoreResult<Report>
where
    S: ReportingStore + ?Sized,
{
    let summary = match report_type {
        ReportType::UserAnalytics => {
            ReportSummary::UserAnalytics(store.user_summary(&range, filters).await?)
        }
        ReportType::RideAnalytics => {
            ReportSummary::RideAnalytics(store.ride_summary(&range, filters).await?)
        }
        ReportType::Financial => {
            ReportSummary::Financial(store.financial_summary(&range, filters).await?)
        }
        ReportType::SystemPerformance => {
            ReportSummary::SystemPerformance(store.system_performance_summary(&range).await?)
        }
    };

    tracing::debug!(
        report_type = %report_type,
        start = %range.start_date,
        end = %range.end_date,
        "Report generated"
    );

    Ok(Report {
        summary,
        period: range,
        report_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_type_parsing() {
        assert_eq!("financial".parse::<ReportType>(), Ok(ReportType::Financial));
        assert_eq!(
            " system_performance ".parse::<ReportType>(),
            Ok(ReportType::SystemPerformance)
        );
        assert!("revenue".parse::<ReportType>().is_err());
    }

    #[test]
    fn test_filters_deserialize_camel_case() {
        let filters: ReportFilters =
            serde_json::from_value(serde_json::json!({"role": "driver", "driverId": 7})).unwrap();
        assert_eq!(filters.role, Some(UserRole::Driver));
        assert_eq!(filters.driver_id, Some(7));

        let empty: ReportFilters = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(empty, ReportFilters::default());
    }

    #[test]
    fn test_report_serializes_summary_inline() {
        let report = Report {
            summary: ReportSummary::Financial(FinancialSummary {
                total_bookings: 3,
                gross_revenue: 45.5,
                ..Default::default()
            }),
            period: DateRange {
                start_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            },
            report_type: ReportType::Financial,
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["reportType"], "financial");
        assert_eq!(json["summary"]["total_bookings"], 3);
        assert_eq!(json["period"]["startDate"], "2024-01-01");
    }
}
