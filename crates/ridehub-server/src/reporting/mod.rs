//! Reporting aggregator: summary reports and analytics breakdowns

pub mod analytics;
pub mod date_range;
pub mod report;

pub use analytics::{daily_series, synthetic_series, AnalyticsSeries, AnalyticsType, DailyPoint};
pub use date_range::{parse_date_range, DateRange, RangePreset};
pub use report::{
    generate_report, FinancialSummary, Report, ReportFilters, ReportSummary, ReportType,
    RideAnalyticsSummary, SystemPerformanceSummary, UserAnalyticsSummary,
};
