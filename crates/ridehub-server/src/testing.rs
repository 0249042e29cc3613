//! In-memory store and samplers for tests
//!
//! [`MemoryStore`] implements every store trait over plain vectors, mirroring
//! the aggregate semantics of the MySQL queries, and exposes knobs to inject
//! ping failures, slow pings, query failures and missing tables.

use crate::models::{
    Booking, BookingStatus, FeatureFlag, NewReport, Page, Ride, RideStatus, SavedReport, Setting,
    SystemLogRecord, User, UserCounts, UserRole, UserStatus,
};
use crate::monitoring::{
    CpuUsage, DiskUsage, HealthCheckResult, MemoryUsage, ResourceSampler, ResourceSnapshot,
    SampleError,
};
use crate::reporting::{
    AnalyticsType, DailyPoint, DateRange, FinancialSummary, ReportFilters, RideAnalyticsSummary,
    SystemPerformanceSummary, UserAnalyticsSummary,
};
use crate::store::{
    DatabaseProbe, FeatureFlagStore, LogFilter, MonitoringStore, RideFilter, RideStore,
    ReportStore, ReportingStore, SettingsStore, StoreError, StoreResult, UserFilter, UserStore,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use ridehub_core_health::HealthStatus;
use ridehub_observability::{LogLevel, LogStore, LogStoreError, SystemLogEntry};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    rides: Vec<Ride>,
    bookings: Vec<Booking>,
    settings: BTreeMap<String, Setting>,
    flags: BTreeMap<String, FeatureFlag>,
    reports: Vec<SavedReport>,
    logs: Vec<SystemLogRecord>,
    health_checks: Vec<HealthCheckResult>,
    next_report_id: i64,
    next_log_id: i64,
}

#[derive(Debug, Default)]
struct Faults {
    ping_failure: bool,
    ping_delay: Duration,
    query_failure: bool,
    missing_tables: HashSet<String>,
    connections: u64,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    faults: Mutex<Faults>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.faults().query_failure {
            Err(StoreError::Unavailable("injected query failure".to_string()))
        } else {
            Ok(())
        }
    }

    pub fn set_ping_failure(&self, fail: bool) {
        self.faults().ping_failure = fail;
    }

    pub fn set_ping_delay(&self, delay: Duration) {
        self.faults().ping_delay = delay;
    }

    /// Make every query other than the ping fail
    pub fn set_query_failure(&self, fail: bool) {
        self.faults().query_failure = fail;
    }

    pub fn drop_table(&self, table: &str) {
        self.faults().missing_tables.insert(table.to_string());
    }

    pub fn set_connection_count(&self, connections: u64) {
        self.faults().connections = connections;
    }

    pub fn insert_user(&self, user: User) {
        self.tables().users.push(user);
    }

    pub fn insert_ride(&self, ride: Ride) {
        self.tables().rides.push(ride);
    }

    pub fn insert_booking(&self, booking: Booking) {
        self.tables().bookings.push(booking);
    }

    pub fn insert_setting(&self, setting: Setting) {
        self.tables().settings.insert(setting.key.clone(), setting);
    }

    pub fn insert_flag(&self, flag: FeatureFlag) {
        self.tables().flags.insert(flag.name.clone(), flag);
    }

    pub fn health_checks(&self) -> Vec<HealthCheckResult> {
        self.tables().health_checks.clone()
    }

    pub fn system_logs(&self) -> Vec<SystemLogRecord> {
        self.tables().logs.clone()
    }

    pub fn reports(&self) -> Vec<SavedReport> {
        self.tables().reports.clone()
    }
}

fn page_of<T: Clone>(items: Vec<T>, page: u32, limit: u32, offset: u64) -> Page<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(limit as usize)
        .collect();
    Page {
        items,
        total,
        page,
        limit,
    }
}

fn count<T>(items: &[&T], pred: impl Fn(&T) -> bool) -> i64 {
    items.iter().filter(|item| pred(**item)).count() as i64
}

#[async_trait]
impl DatabaseProbe for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        let (fail, delay) = {
            let faults = self.faults();
            (faults.ping_failure, faults.ping_delay)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }

    async fn connection_count(&self) -> StoreResult<u64> {
        Ok(self.faults().connections)
    }
}

#[async_trait]
impl ReportingStore for MemoryStore {
    async fn table_exists(&self, table: &str) -> StoreResult<bool> {
        self.check_available()?;
        Ok(!self.faults().missing_tables.contains(table))
    }

    async fn user_summary(
        &self,
        range: &DateRange,
        filters: &ReportFilters,
    ) -> StoreResult<UserAnalyticsSummary> {
        self.check_available()?;
        let tables = self.tables();
        let users: Vec<&User> = tables
            .users
            .iter()
            .filter(|u| u.created_at.date_naive() <= range.end_date)
            .filter(|u| filters.role.map_or(true, |role| u.role == role))
            .collect();

        Ok(UserAnalyticsSummary {
            total_users: users.len() as i64,
            new_users: count(&users, |u| u.created_at.date_naive() >= range.start_date),
            active_users: count(&users, |u| u.status == UserStatus::Active),
            drivers: count(&users, |u| u.role == UserRole::Driver),
            passengers: count(&users, |u| u.role == UserRole::Passenger),
            suspended_users: count(&users, |u| u.status == UserStatus::Suspended),
        })
    }

    async fn ride_summary(
        &self,
        range: &DateRange,
        filters: &ReportFilters,
    ) -> StoreResult<RideAnalyticsSummary> {
        self.check_available()?;
        let tables = self.tables();
        let rides: Vec<&Ride> = tables
            .rides
            .iter()
            .filter(|r| range.contains(r.created_at.date_naive()))
            .filter(|r| filters.driver_id.map_or(true, |id| r.driver_id == id))
            .collect();

        let avg_price_per_seat = if rides.is_empty() {
            0.0
        } else {
            rides.iter().map(|r| r.price_per_seat).sum::<f64>() / rides.len() as f64
        };

        Ok(RideAnalyticsSummary {
            total_rides: rides.len() as i64,
            completed_rides: count(&rides, |r| r.status == RideStatus::Completed),
            cancelled_rides: count(&rides, |r| r.status == RideStatus::Cancelled),
            scheduled_rides: count(&rides, |r| r.status == RideStatus::Scheduled),
            seats_offered: rides.iter().map(|r| i64::from(r.available_seats)).sum(),
            avg_price_per_seat,
        })
    }

    async fn financial_summary(
        &self,
        range: &DateRange,
        filters: &ReportFilters,
    ) -> StoreResult<FinancialSummary> {
        self.check_available()?;
        let tables = self.tables();
        let driver_rides: Option<HashSet<i64>> = filters.driver_id.map(|driver_id| {
            tables
                .rides
                .iter()
                .filter(|r| r.driver_id == driver_id)
                .map(|r| r.id)
                .collect()
        });
        let bookings: Vec<&Booking> = tables
            .bookings
            .iter()
            .filter(|b| range.contains(b.created_at.date_naive()))
            .filter(|b| driver_rides.as_ref().map_or(true, |ids| ids.contains(&b.ride_id)))
            .collect();

        let paid: Vec<f64> = bookings
            .iter()
            .filter(|b| b.status.is_paid())
            .map(|b| b.total_price)
            .collect();
        let gross_revenue: f64 = paid.iter().sum();
        let refunded_amount = bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Refunded)
            .map(|b| b.total_price)
            .sum();

        Ok(FinancialSummary {
            total_bookings: bookings.len() as i64,
            paid_bookings: paid.len() as i64,
            gross_revenue,
            avg_booking_value: if paid.is_empty() {
                0.0
            } else {
                gross_revenue / paid.len() as f64
            },
            refunded_bookings: count(&bookings, |b| b.status == BookingStatus::Refunded),
            refunded_amount,
        })
    }

    async fn system_performance_summary(
        &self,
        range: &DateRange,
    ) -> StoreResult<SystemPerformanceSummary> {
        self.check_available()?;
        let tables = self.tables();
        let logs: Vec<&SystemLogRecord> = tables
            .logs
            .iter()
            .filter(|l| range.contains(l.created_at.date_naive()))
            .collect();
        let checks: Vec<&HealthCheckResult> = tables
            .health_checks
            .iter()
            .filter(|c| range.contains(c.timestamp.date_naive()))
            .collect();

        let timed: Vec<u64> = checks.iter().filter_map(|c| c.response_time_ms).collect();
        let avg_check_response_time_ms = if timed.is_empty() {
            0.0
        } else {
            timed.iter().sum::<u64>() as f64 / timed.len() as f64
        };

        Ok(SystemPerformanceSummary {
            log_entries: logs.len() as i64,
            error_logs: count(&logs, |l| l.level == LogLevel::Error),
            warning_logs: count(&logs, |l| l.level == LogLevel::Warn),
            health_checks: checks.len() as i64,
            failed_health_checks: count(&checks, |c| c.status >= HealthStatus::Error),
            avg_check_response_time_ms,
        })
    }

    async fn daily_breakdown(
        &self,
        kind: AnalyticsType,
        range: &DateRange,
    ) -> StoreResult<Vec<DailyPoint>> {
        self.check_available()?;
        let tables = self.tables();
        let mut days: BTreeMap<NaiveDate, Vec<(&str, f64)>> = BTreeMap::new();

        match kind {
            AnalyticsType::Users => {
                for u in tables.users.iter().filter(|u| range.contains(u.created_at.date_naive())) {
                    days.entry(u.created_at.date_naive()).or_default().extend([
                        ("new_users", 1.0),
                        ("drivers", f64::from(u8::from(u.role == UserRole::Driver))),
                        ("passengers", f64::from(u8::from(u.role == UserRole::Passenger))),
                    ]);
                }
            }
            AnalyticsType::Rides => {
                for r in tables.rides.iter().filter(|r| range.contains(r.created_at.date_naive())) {
                    days.entry(r.created_at.date_naive()).or_default().extend([
                        ("rides", 1.0),
                        ("completed", f64::from(u8::from(r.status == RideStatus::Completed))),
                        ("cancelled", f64::from(u8::from(r.status == RideStatus::Cancelled))),
                    ]);
                }
            }
            AnalyticsType::Bookings => {
                for b in tables.bookings.iter().filter(|b| range.contains(b.created_at.date_naive())) {
                    days.entry(b.created_at.date_naive()).or_default().extend([
                        ("bookings", 1.0),
                        ("seats", f64::from(b.seats)),
                        ("confirmed", f64::from(u8::from(b.status == BookingStatus::Confirmed))),
                    ]);
                }
            }
            AnalyticsType::Revenue => {
                for b in tables
                    .bookings
                    .iter()
                    .filter(|b| range.contains(b.created_at.date_naive()) && b.status.is_paid())
                {
                    days.entry(b.created_at.date_naive())
                        .or_default()
                        .extend([("revenue", b.total_price), ("paid_bookings", 1.0)]);
                }
            }
        }

        Ok(days
            .into_iter()
            .map(|(date, contributions)| {
                let mut totals: Map<String, Value> = Map::new();
                for name in kind.metrics() {
                    let sum: f64 = contributions
                        .iter()
                        .filter(|(metric, _)| metric == name)
                        .map(|(_, v)| v)
                        .sum();
                    let value = if *name == "revenue" {
                        Value::from(sum)
                    } else {
                        Value::from(sum as i64)
                    };
                    totals.insert(name.to_string(), value);
                }
                DailyPoint {
                    date,
                    metrics: totals,
                }
            })
            .collect())
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn save_report(&self, report: &NewReport) -> StoreResult<i64> {
        self.check_available()?;
        if self.faults().missing_tables.contains("reports") {
            return Err(StoreError::Unavailable("table 'reports' doesn't exist".to_string()));
        }
        let mut tables = self.tables();
        tables.next_report_id += 1;
        let id = tables.next_report_id;
        tables.reports.push(SavedReport {
            id,
            report_type: report.report_type.clone(),
            date_range: report.date_range.clone(),
            filters: report.filters.clone(),
            data: report.data.clone(),
            generated_by: report.generated_by.clone(),
            created_at: report.created_at,
        });
        Ok(id)
    }

    async fn list_reports(&self, limit: u32) -> StoreResult<Vec<SavedReport>> {
        self.check_available()?;
        let mut reports = self.tables().reports.clone();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        reports.truncate(limit as usize);
        Ok(reports)
    }

    async fn get_report(&self, id: i64) -> StoreResult<Option<SavedReport>> {
        self.check_available()?;
        Ok(self.tables().reports.iter().find(|r| r.id == id).cloned())
    }

    async fn delete_report(&self, id: i64) -> StoreResult<bool> {
        self.check_available()?;
        let mut tables = self.tables();
        let before = tables.reports.len();
        tables.reports.retain(|r| r.id != id);
        Ok(tables.reports.len() < before)
    }
}

#[async_trait]
impl MonitoringStore for MemoryStore {
    async fn record_health_checks(&self, checks: &[HealthCheckResult]) -> StoreResult<()> {
        self.check_available()?;
        self.tables().health_checks.extend_from_slice(checks);
        Ok(())
    }

    async fn recent_logs(&self, filter: &LogFilter) -> StoreResult<Vec<SystemLogRecord>> {
        self.check_available()?;
        let mut logs: Vec<SystemLogRecord> = self
            .tables()
            .logs
            .iter()
            .filter(|l| filter.levels.is_empty() || filter.levels.contains(&l.level))
            .filter(|l| filter.service.as_ref().map_or(true, |s| &l.service == s))
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        logs.truncate(filter.limit as usize);
        Ok(logs)
    }

    async fn user_counts(&self, today: NaiveDate) -> StoreResult<UserCounts> {
        self.check_available()?;
        let tables = self.tables();
        let users: Vec<&User> = tables.users.iter().collect();
        Ok(UserCounts {
            total: users.len() as i64,
            active: count(&users, |u| u.status == UserStatus::Active),
            new_today: count(&users, |u| u.created_at.date_naive() == today),
            drivers: count(&users, |u| u.role == UserRole::Driver),
            passengers: count(&users, |u| u.role == UserRole::Passenger),
        })
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn list_users(&self, filter: &UserFilter) -> StoreResult<Page<User>> {
        self.check_available()?;
        let search = filter
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let mut users: Vec<User> = self
            .tables()
            .users
            .iter()
            .filter(|u| filter.role.map_or(true, |role| u.role == role))
            .filter(|u| filter.status.map_or(true, |status| u.status == status))
            .filter(|u| {
                search.as_ref().map_or(true, |needle| {
                    [&u.first_name, &u.last_name, &u.email]
                        .iter()
                        .any(|field| field.to_lowercase().contains(needle.as_str()))
                })
            })
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let p = filter.pagination;
        Ok(page_of(users, p.page, p.limit, p.offset()))
    }

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        self.check_available()?;
        Ok(self.tables().users.iter().find(|u| u.id == id).cloned())
    }

    async fn update_user_status(&self, id: i64, status: UserStatus) -> StoreResult<Option<User>> {
        self.check_available()?;
        let mut tables = self.tables();
        Ok(tables.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.status = status;
            u.clone()
        }))
    }
}

#[async_trait]
impl RideStore for MemoryStore {
    async fn list_rides(&self, filter: &RideFilter) -> StoreResult<Page<Ride>> {
        self.check_available()?;
        let mut rides: Vec<Ride> = self
            .tables()
            .rides
            .iter()
            .filter(|r| filter.status.map_or(true, |status| r.status == status))
            .filter(|r| filter.driver_id.map_or(true, |id| r.driver_id == id))
            .cloned()
            .collect();
        rides.sort_by(|a, b| b.departure_time.cmp(&a.departure_time).then(b.id.cmp(&a.id)));

        let p = filter.pagination;
        Ok(page_of(rides, p.page, p.limit, p.offset()))
    }

    async fn get_ride(&self, id: i64) -> StoreResult<Option<Ride>> {
        self.check_available()?;
        Ok(self.tables().rides.iter().find(|r| r.id == id).cloned())
    }

    async fn update_ride_status(&self, id: i64, status: RideStatus) -> StoreResult<Option<Ride>> {
        self.check_available()?;
        let mut tables = self.tables();
        Ok(tables.rides.iter_mut().find(|r| r.id == id).map(|r| {
            r.status = status;
            r.clone()
        }))
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn list_settings(&self) -> StoreResult<Vec<Setting>> {
        self.check_available()?;
        Ok(self.tables().settings.values().cloned().collect())
    }

    async fn upsert_setting(
        &self,
        key: &str,
        value: &str,
        description: Option<&str>,
        updated_by: &str,
    ) -> StoreResult<Setting> {
        self.check_available()?;
        let mut tables = self.tables();
        let existing_description = tables.settings.get(key).and_then(|s| s.description.clone());
        let setting = Setting {
            key: key.to_string(),
            value: value.to_string(),
            description: description.map(str::to_string).or(existing_description),
            updated_at: Utc::now(),
            updated_by: Some(updated_by.to_string()),
        };
        tables.settings.insert(key.to_string(), setting.clone());
        Ok(setting)
    }
}

#[async_trait]
impl FeatureFlagStore for MemoryStore {
    async fn list_feature_flags(&self) -> StoreResult<Vec<FeatureFlag>> {
        self.check_available()?;
        Ok(self.tables().flags.values().cloned().collect())
    }

    async fn update_feature_flag(
        &self,
        name: &str,
        enabled: bool,
        rollout_percentage: Option<u8>,
    ) -> StoreResult<Option<FeatureFlag>> {
        self.check_available()?;
        let mut tables = self.tables();
        Ok(tables.flags.get_mut(name).map(|flag| {
            flag.enabled = enabled;
            if let Some(rollout) = rollout_percentage {
                flag.rollout_percentage = rollout;
            }
            flag.updated_at = Utc::now();
            flag.clone()
        }))
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn insert_logs(&self, entries: &[SystemLogEntry]) -> Result<(), LogStoreError> {
        if self.faults().query_failure {
            return Err(LogStoreError("injected query failure".to_string()));
        }
        let mut tables = self.tables();
        for entry in entries {
            tables.next_log_id += 1;
            let id = tables.next_log_id;
            tables.logs.push(SystemLogRecord {
                id,
                level: entry.level,
                service: entry.service.clone(),
                message: entry.message.clone(),
                metadata: entry.metadata.clone(),
                created_at: entry.created_at,
            });
        }
        Ok(())
    }
}

/// Sampler returning a fixed snapshot
#[derive(Debug, Clone)]
pub struct FixedSampler(ResourceSnapshot);

impl FixedSampler {
    pub fn new(snapshot: ResourceSnapshot) -> Self {
        Self(snapshot)
    }
}

#[async_trait]
impl ResourceSampler for FixedSampler {
    async fn sample(&self) -> Result<ResourceSnapshot, SampleError> {
        Ok(self.0.clone())
    }
}

/// Sampler that always fails
#[derive(Debug, Clone, Copy)]
pub struct FailingSampler;

#[async_trait]
impl ResourceSampler for FailingSampler {
    async fn sample(&self) -> Result<ResourceSnapshot, SampleError> {
        Err(SampleError::NoDisk("/".to_string()))
    }
}

/// Snapshot with the given CPU, memory and disk usage percentages
pub fn sample_snapshot(cpu: f64, memory: f64, disk: f64) -> ResourceSnapshot {
    const GIB: u64 = 1024 * 1024 * 1024;
    let used = |pct: f64, total: u64| (total as f64 * pct / 100.0) as u64;
    ResourceSnapshot {
        cpu: CpuUsage {
            usage_percent: cpu,
            cores: 8,
            load_average: [0.5, 0.4, 0.3],
        },
        memory: MemoryUsage {
            total_bytes: 16 * GIB,
            used_bytes: used(memory, 16 * GIB),
            usage_percent: memory,
        },
        disk: DiskUsage {
            mount_point: "/".to_string(),
            total_bytes: 500 * GIB,
            used_bytes: used(disk, 500 * GIB),
            usage_percent: disk,
        },
    }
}

/// Noon UTC on the given day
pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn user(id: i64, role: UserRole, status: UserStatus, created_at: DateTime<Utc>) -> User {
    User {
        id,
        first_name: format!("User{}", id),
        last_name: "Tester".to_string(),
        email: format!("user{}@example.com", id),
        phone: None,
        role,
        status,
        created_at,
        last_login: None,
    }
}

pub fn ride(id: i64, driver_id: i64, status: RideStatus, created_at: DateTime<Utc>) -> Ride {
    Ride {
        id,
        driver_id,
        origin: "Lisbon".to_string(),
        destination: "Porto".to_string(),
        departure_time: created_at,
        price_per_seat: 15.0,
        available_seats: 3,
        status,
        created_at,
    }
}

pub fn booking(
    id: i64,
    ride_id: i64,
    total_price: f64,
    status: BookingStatus,
    created_at: DateTime<Utc>,
) -> Booking {
    Booking {
        id,
        ride_id,
        passenger_id: 100 + id,
        seats: 1,
        total_price,
        status,
        created_at,
    }
}

pub fn flag(name: &str, enabled: bool, rollout_percentage: u8) -> FeatureFlag {
    FeatureFlag {
        name: name.to_string(),
        description: None,
        enabled,
        rollout_percentage,
        updated_at: at(2024, 1, 1),
    }
}
