//! Persistence seam for the admin API
//!
//! Handlers and the health evaluator talk to narrow async traits; the MySQL
//! implementation lives in [`mysql`], and [`crate::testing::MemoryStore`]
//! implements the same traits for tests.

pub mod mysql;

pub use mysql::MySqlStore;

use crate::models::{
    FeatureFlag, NewReport, Page, Ride, RideStatus, SavedReport, Setting, SystemLogRecord, User,
    UserCounts, UserRole, UserStatus,
};
use crate::monitoring::HealthCheckResult;
use crate::reporting::{
    AnalyticsType, DailyPoint, DateRange, FinancialSummary, ReportFilters, RideAnalyticsSummary,
    SystemPerformanceSummary, UserAnalyticsSummary,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use ridehub_observability::{LogLevel, LogStore};
use thiserror::Error;

/// Upper bound on any listing page size
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid stored value: {0}")]
    Decode(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// 1-based page and clamped page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub pagination: Pagination,
    /// Substring match over first name, last name and email
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct RideFilter {
    pub pagination: Pagination,
    pub status: Option<RideStatus>,
    pub driver_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct LogFilter {
    pub levels: Vec<LogLevel>,
    pub service: Option<String>,
    pub limit: u32,
}

impl LogFilter {
    /// The most recent warnings and errors
    pub fn recent_problems(limit: u32) -> Self {
        Self {
            levels: vec![LogLevel::Warn, LogLevel::Error],
            service: None,
            limit,
        }
    }
}

impl Default for LogFilter {
    fn default() -> Self {
        Self {
            levels: Vec::new(),
            service: None,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    /// `SELECT 1`
    async fn ping(&self) -> StoreResult<()>;

    /// Open server connections (`Threads_connected`)
    async fn connection_count(&self) -> StoreResult<u64>;
}

#[async_trait]
pub trait ReportingStore: Send + Sync {
    async fn table_exists(&self, table: &str) -> StoreResult<bool>;

    async fn user_summary(
        &self,
        range: &DateRange,
        filters: &ReportFilters,
    ) -> StoreResult<UserAnalyticsSummary>;

    async fn ride_summary(
        &self,
        range: &DateRange,
        filters: &ReportFilters,
    ) -> StoreResult<RideAnalyticsSummary>;

    async fn financial_summary(
        &self,
        range: &DateRange,
        filters: &ReportFilters,
    ) -> StoreResult<FinancialSummary>;

    async fn system_performance_summary(
        &self,
        range: &DateRange,
    ) -> StoreResult<SystemPerformanceSummary>;

    /// One point per day that has data, oldest first
    async fn daily_breakdown(
        &self,
        kind: AnalyticsType,
        range: &DateRange,
    ) -> StoreResult<Vec<DailyPoint>>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn save_report(&self, report: &NewReport) -> StoreResult<i64>;
    async fn list_reports(&self, limit: u32) -> StoreResult<Vec<SavedReport>>;
    async fn get_report(&self, id: i64) -> StoreResult<Option<SavedReport>>;
    /// Returns false when no report had `id`
    async fn delete_report(&self, id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait MonitoringStore: Send + Sync {
    async fn record_health_checks(&self, checks: &[HealthCheckResult]) -> StoreResult<()>;
    async fn recent_logs(&self, filter: &LogFilter) -> StoreResult<Vec<SystemLogRecord>>;
    async fn user_counts(&self, today: NaiveDate) -> StoreResult<UserCounts>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list_users(&self, filter: &UserFilter) -> StoreResult<Page<User>>;
    async fn get_user(&self, id: i64) -> StoreResult<Option<User>>;
    /// Returns the updated user, or `None` when no user had `id`
    async fn update_user_status(&self, id: i64, status: UserStatus) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait RideStore: Send + Sync {
    async fn list_rides(&self, filter: &RideFilter) -> StoreResult<Page<Ride>>;
    async fn get_ride(&self, id: i64) -> StoreResult<Option<Ride>>;
    async fn update_ride_status(&self, id: i64, status: RideStatus) -> StoreResult<Option<Ride>>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn list_settings(&self) -> StoreResult<Vec<Setting>>;
    async fn upsert_setting(
        &self,
        key: &str,
        value: &str,
        description: Option<&str>,
        updated_by: &str,
    ) -> StoreResult<Setting>;
}

#[async_trait]
pub trait FeatureFlagStore: Send + Sync {
    async fn list_feature_flags(&self) -> StoreResult<Vec<FeatureFlag>>;
    /// Returns `None` when no flag is named `name`
    async fn update_feature_flag(
        &self,
        name: &str,
        enabled: bool,
        rollout_percentage: Option<u8>,
    ) -> StoreResult<Option<FeatureFlag>>;
}

/// Everything the admin API needs from persistence
pub trait AdminStore:
    DatabaseProbe
    + ReportingStore
    + ReportStore
    + MonitoringStore
    + UserStore
    + RideStore
    + SettingsStore
    + FeatureFlagStore
    + LogStore
{
}

impl<T> AdminStore for T where
    T: DatabaseProbe
        + ReportingStore
        + ReportStore
        + MonitoringStore
        + UserStore
        + RideStore
        + SettingsStore
        + FeatureFlagStore
        + LogStore
{
}
