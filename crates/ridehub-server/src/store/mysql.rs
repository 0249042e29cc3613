//! MySQL-backed store

use super::{
    DatabaseProbe, FeatureFlagStore, LogFilter, MonitoringStore, RideFilter, RideStore,
    ReportStore, ReportingStore, SettingsStore, StoreError, StoreResult, UserFilter, UserStore,
};
use crate::models::{
    FeatureFlag, NewReport, Page, Ride, RideStatus, SavedReport, Setting, SystemLogRecord, User,
    UserCounts, UserStatus,
};
use crate::monitoring::HealthCheckResult;
use crate::reporting::{
    AnalyticsType, DailyPoint, DateRange, FinancialSummary, ReportFilters, RideAnalyticsSummary,
    SystemPerformanceSummary, UserAnalyticsSummary,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use ridehub_observability::{LogStore, LogStoreError, SystemLogEntry};
use serde_json::{Map, Value};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::types::Json;
use sqlx::{MySql, QueryBuilder, Row};
use std::str::FromStr;
use std::time::Duration;

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, phone, role, status, created_at, last_login";

const RIDE_COLUMNS: &str = "id, driver_id, origin, destination, departure_time, \
     CAST(price_per_seat AS DOUBLE) AS price_per_seat, available_seats, status, created_at";

const REPORT_COLUMNS: &str =
    "id, report_type, date_range, filters, data, generated_by, created_at";

const FLAG_COLUMNS: &str = "name, description, is_enabled, \
     CAST(rollout_percentage AS SIGNED) AS rollout_percentage, updated_at";

const SETTING_COLUMNS: &str =
    "setting_key, setting_value, description, updated_at, updated_by";

const CONNECTION_COUNT_SQL: &str = "SHOW STATUS LIKE 'Threads_connected'";

const TABLE_EXISTS_SQL: &str = "SELECT COUNT(*) AS n FROM information_schema.TABLES \
     WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?";

const SETTING_UPSERT_SQL: &str = r#"
    INSERT INTO system_settings (setting_key, setting_value, description, updated_at, updated_by)
    VALUES (?, ?, ?, ?, ?)
    ON DUPLICATE KEY UPDATE
        setting_value = VALUES(setting_value),
        description = COALESCE(VALUES(description), description),
        updated_at = VALUES(updated_at),
        updated_by = VALUES(updated_by)
"#;

/// Every subquery takes the `(start, end)` pair, in order
const SYSTEM_PERFORMANCE_SQL: &str = r#"
    SELECT
      (SELECT COUNT(*) FROM system_logs
        WHERE DATE(created_at) BETWEEN ? AND ?) AS log_entries,
      (SELECT COUNT(*) FROM system_logs
        WHERE level = 'error' AND DATE(created_at) BETWEEN ? AND ?) AS error_logs,
      (SELECT COUNT(*) FROM system_logs
        WHERE level = 'warn' AND DATE(created_at) BETWEEN ? AND ?) AS warning_logs,
      (SELECT COUNT(*) FROM system_health_checks
        WHERE DATE(checked_at) BETWEEN ? AND ?) AS health_checks,
      (SELECT COUNT(*) FROM system_health_checks
        WHERE status IN ('error', 'critical') AND DATE(checked_at) BETWEEN ? AND ?) AS failed_health_checks,
      (SELECT CAST(COALESCE(AVG(response_time_ms), 0) AS DOUBLE) FROM system_health_checks
        WHERE DATE(checked_at) BETWEEN ? AND ?) AS avg_check_response_time_ms
"#;

const SYSTEM_PERFORMANCE_RANGES: usize = 6;

/// Store over a lazily-connected `MySqlPool`
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Build the pool without connecting; the first query opens a connection
    pub fn connect_lazy(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> StoreResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(url)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn parse_column<T>(row: &MySqlRow, column: &str) -> StoreResult<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(StoreError::Decode)
}

fn json_column(row: &MySqlRow, column: &str) -> StoreResult<Value> {
    let value: Option<Value> = row.try_get(column)?;
    Ok(value.unwrap_or(Value::Null))
}

fn user_from_row(row: &MySqlRow) -> StoreResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        role: parse_column(row, "role")?,
        status: parse_column(row, "status")?,
        created_at: row.try_get("created_at")?,
        last_login: row.try_get("last_login")?,
    })
}

fn ride_from_row(row: &MySqlRow) -> StoreResult<Ride> {
    Ok(Ride {
        id: row.try_get("id")?,
        driver_id: row.try_get("driver_id")?,
        origin: row.try_get("origin")?,
        destination: row.try_get("destination")?,
        departure_time: row.try_get("departure_time")?,
        price_per_seat: row.try_get("price_per_seat")?,
        available_seats: row.try_get("available_seats")?,
        status: parse_column(row, "status")?,
        created_at: row.try_get("created_at")?,
    })
}

fn setting_from_row(row: &MySqlRow) -> StoreResult<Setting> {
    Ok(Setting {
        key: row.try_get("setting_key")?,
        value: row.try_get("setting_value")?,
        description: row.try_get("description")?,
        updated_at: row.try_get("updated_at")?,
        updated_by: row.try_get("updated_by")?,
    })
}

fn flag_from_row(row: &MySqlRow) -> StoreResult<FeatureFlag> {
    let rollout: i64 = row.try_get("rollout_percentage")?;
    Ok(FeatureFlag {
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        enabled: row.try_get("is_enabled")?,
        rollout_percentage: u8::try_from(rollout.clamp(0, 100)).unwrap_or(100),
        updated_at: row.try_get("updated_at")?,
    })
}

fn report_from_row(row: &MySqlRow) -> StoreResult<SavedReport> {
    Ok(SavedReport {
        id: row.try_get("id")?,
        report_type: row.try_get("report_type")?,
        date_range: row.try_get("date_range")?,
        filters: json_column(row, "filters")?,
        data: json_column(row, "data")?,
        generated_by: row.try_get("generated_by")?,
        created_at: row.try_get("created_at")?,
    })
}

fn log_from_row(row: &MySqlRow) -> StoreResult<SystemLogRecord> {
    Ok(SystemLogRecord {
        id: row.try_get("id")?,
        level: parse_column(row, "level")?,
        service: row.try_get("service")?,
        message: row.try_get("message")?,
        metadata: json_column(row, "metadata")?,
        created_at: row.try_get("created_at")?,
    })
}

fn push_user_filters(qb: &mut QueryBuilder<'_, MySql>, filter: &UserFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(search) = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let pattern = format!("%{}%", search);
        qb.push(" AND (first_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR last_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR email LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
}

fn push_ride_filters(qb: &mut QueryBuilder<'_, MySql>, filter: &RideFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(driver_id) = filter.driver_id {
        qb.push(" AND driver_id = ").push_bind(driver_id);
    }
}

/// Decode the metrics of an analytics row; counts are integers, amounts doubles
fn daily_point_from_row(kind: AnalyticsType, row: &MySqlRow) -> StoreResult<DailyPoint> {
    let date: NaiveDate = row.try_get("day")?;
    let mut metrics = Map::new();
    for name in kind.metrics() {
        let value = match row.try_get::<i64, _>(*name) {
            Ok(v) => Value::from(v),
            Err(_) => Value::from(row.try_get::<f64, _>(*name)?),
        };
        metrics.insert(name.to_string(), value);
    }
    Ok(DailyPoint { date, metrics })
}

fn breakdown_sql(kind: AnalyticsType) -> &'static str {
    match kind {
        AnalyticsType::Users => {
            r#"
            SELECT DATE(created_at) AS day,
                   COUNT(*) AS new_users,
                   CAST(COALESCE(SUM(role = 'driver'), 0) AS SIGNED) AS drivers,
                   CAST(COALESCE(SUM(role = 'passenger'), 0) AS SIGNED) AS passengers
            FROM users
            WHERE DATE(created_at) BETWEEN ? AND ?
            GROUP BY DATE(created_at)
            ORDER BY day
            "#
        }
        AnalyticsType::Rides => {
            r#"
            SELECT DATE(created_at) AS day,
                   COUNT(*) AS rides,
                   CAST(COALESCE(SUM(status = 'completed'), 0) AS SIGNED) AS completed,
                   CAST(COALESCE(SUM(status = 'cancelled'), 0) AS SIGNED) AS cancelled
            FROM rides
            WHERE DATE(created_at) BETWEEN ? AND ?
            GROUP BY DATE(created_at)
            ORDER BY day
            "#
        }
        AnalyticsType::Bookings => {
            r#"
            SELECT DATE(created_at) AS day,
                   COUNT(*) AS bookings,
                   CAST(COALESCE(SUM(seats), 0) AS SIGNED) AS seats,
                   CAST(COALESCE(SUM(status = 'confirmed'), 0) AS SIGNED) AS confirmed
            FROM bookings
            WHERE DATE(created_at) BETWEEN ? AND ?
            GROUP BY DATE(created_at)
            ORDER BY day
            "#
        }
        AnalyticsType::Revenue => {
            r#"
            SELECT DATE(created_at) AS day,
                   CAST(COALESCE(SUM(total_price), 0) AS DOUBLE) AS revenue,
                   COUNT(*) AS paid_bookings
            FROM bookings
            WHERE DATE(created_at) BETWEEN ? AND ?
              AND status IN ('confirmed', 'completed')
            GROUP BY DATE(created_at)
            ORDER BY day
            "#
        }
    }
}

fn user_summary_query(range: &DateRange, filters: &ReportFilters) -> QueryBuilder<'static, MySql> {
    let mut qb = QueryBuilder::<MySql>::new(
        r#"
        SELECT COUNT(*) AS total_users,
               CAST(COALESCE(SUM(DATE(created_at) >= "#,
    );
    qb.push_bind(range.start_date);
    qb.push(
        r#"), 0) AS SIGNED) AS new_users,
               CAST(COALESCE(SUM(status = 'active'), 0) AS SIGNED) AS active_users,
               CAST(COALESCE(SUM(role = 'driver'), 0) AS SIGNED) AS drivers,
               CAST(COALESCE(SUM(role = 'passenger'), 0) AS SIGNED) AS passengers,
               CAST(COALESCE(SUM(status = 'suspended'), 0) AS SIGNED) AS suspended_users
        FROM users
        WHERE DATE(created_at) <= "#,
    );
    qb.push_bind(range.end_date);
    if let Some(role) = filters.role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
    qb
}

fn ride_summary_query(range: &DateRange, filters: &ReportFilters) -> QueryBuilder<'static, MySql> {
    let mut qb = QueryBuilder::<MySql>::new(
        r#"
        SELECT COUNT(*) AS total_rides,
               CAST(COALESCE(SUM(status = 'completed'), 0) AS SIGNED) AS completed_rides,
               CAST(COALESCE(SUM(status = 'cancelled'), 0) AS SIGNED) AS cancelled_rides,
               CAST(COALESCE(SUM(status = 'scheduled'), 0) AS SIGNED) AS scheduled_rides,
               CAST(COALESCE(SUM(available_seats), 0) AS SIGNED) AS seats_offered,
               CAST(COALESCE(AVG(price_per_seat), 0) AS DOUBLE) AS avg_price_per_seat
        FROM rides
        WHERE DATE(created_at) BETWEEN "#,
    );
    qb.push_bind(range.start_date)
        .push(" AND ")
        .push_bind(range.end_date);
    if let Some(driver_id) = filters.driver_id {
        qb.push(" AND driver_id = ").push_bind(driver_id);
    }
    qb
}

fn financial_summary_query(
    range: &DateRange,
    filters: &ReportFilters,
) -> QueryBuilder<'static, MySql> {
    let mut qb = QueryBuilder::<MySql>::new(
        r#"
        SELECT COUNT(*) AS total_bookings,
               CAST(COALESCE(SUM(status IN ('confirmed', 'completed')), 0) AS SIGNED) AS paid_bookings,
               CAST(COALESCE(SUM(CASE WHEN status IN ('confirmed', 'completed') THEN total_price ELSE 0 END), 0) AS DOUBLE) AS gross_revenue,
               CAST(COALESCE(AVG(CASE WHEN status IN ('confirmed', 'completed') THEN total_price END), 0) AS DOUBLE) AS avg_booking_value,
               CAST(COALESCE(SUM(status = 'refunded'), 0) AS SIGNED) AS refunded_bookings,
               CAST(COALESCE(SUM(CASE WHEN status = 'refunded' THEN total_price ELSE 0 END), 0) AS DOUBLE) AS refunded_amount
        FROM bookings
        WHERE DATE(created_at) BETWEEN "#,
    );
    qb.push_bind(range.start_date)
        .push(" AND ")
        .push_bind(range.end_date);
    if let Some(driver_id) = filters.driver_id {
        qb.push(" AND ride_id IN (SELECT id FROM rides WHERE driver_id = ")
            .push_bind(driver_id)
            .push(")");
    }
    qb
}

#[async_trait]
impl DatabaseProbe for MySqlStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn connection_count(&self) -> StoreResult<u64> {
        let row = sqlx::query(CONNECTION_COUNT_SQL)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(0);
        };
        let raw: String = row.try_get("Value")?;
        raw.trim()
            .parse()
            .map_err(|e| StoreError::Decode(format!("Threads_connected '{}': {}", raw, e)))
    }
}

#[async_trait]
impl ReportingStore for MySqlStore {
    async fn table_exists(&self, table: &str) -> StoreResult<bool> {
        let row = sqlx::query(TABLE_EXISTS_SQL)
            .bind(table)
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = row.try_get("n")?;
        Ok(n > 0)
    }

    async fn user_summary(
        &self,
        range: &DateRange,
        filters: &ReportFilters,
    ) -> StoreResult<UserAnalyticsSummary> {
        let mut qb = user_summary_query(range, filters);
        let row = qb.build().fetch_one(&self.pool).await?;
        Ok(UserAnalyticsSummary {
            total_users: row.try_get("total_users")?,
            new_users: row.try_get("new_users")?,
            active_users: row.try_get("active_users")?,
            drivers: row.try_get("drivers")?,
            passengers: row.try_get("passengers")?,
            suspended_users: row.try_get("suspended_users")?,
        })
    }

    async fn ride_summary(
        &self,
        range: &DateRange,
        filters: &ReportFilters,
    ) -> StoreResult<RideAnalyticsSummary> {
        let mut qb = ride_summary_query(range, filters);
        let row = qb.build().fetch_one(&self.pool).await?;
        Ok(RideAnalyticsSummary {
            total_rides: row.try_get("total_rides")?,
            completed_rides: row.try_get("completed_rides")?,
            cancelled_rides: row.try_get("cancelled_rides")?,
            scheduled_rides: row.try_get("scheduled_rides")?,
            seats_offered: row.try_get("seats_offered")?,
            avg_price_per_seat: row.try_get("avg_price_per_seat")?,
        })
    }

    async fn financial_summary(
        &self,
        range: &DateRange,
        filters: &ReportFilters,
    ) -> StoreResult<FinancialSummary> {
        let mut qb = financial_summary_query(range, filters);
        let row = qb.build().fetch_one(&self.pool).await?;
        Ok(FinancialSummary {
            total_bookings: row.try_get("total_bookings")?,
            paid_bookings: row.try_get("paid_bookings")?,
            gross_revenue: row.try_get("gross_revenue")?,
            avg_booking_value: row.try_get("avg_booking_value")?,
            refunded_bookings: row.try_get("refunded_bookings")?,
            refunded_amount: row.try_get("refunded_amount")?,
        })
    }

    async fn system_performance_summary(
        &self,
        range: &DateRange,
    ) -> StoreResult<SystemPerformanceSummary> {
        let mut query = sqlx::query(SYSTEM_PERFORMANCE_SQL);
        for _ in 0..SYSTEM_PERFORMANCE_RANGES {
            query = query.bind(range.start_date).bind(range.end_date);
        }
        let row = query.fetch_one(&self.pool).await?;

        Ok(SystemPerformanceSummary {
            log_entries: row.try_get("log_entries")?,
            error_logs: row.try_get("error_logs")?,
            warning_logs: row.try_get("warning_logs")?,
            health_checks: row.try_get("health_checks")?,
            failed_health_checks: row.try_get("failed_health_checks")?,
            avg_check_response_time_ms: row.try_get("avg_check_response_time_ms")?,
        })
    }

    async fn daily_breakdown(
        &self,
        kind: AnalyticsType,
        range: &DateRange,
    ) -> StoreResult<Vec<DailyPoint>> {
        let rows = sqlx::query(breakdown_sql(kind))
            .bind(range.start_date)
            .bind(range.end_date)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| daily_point_from_row(kind, row))
            .collect()
    }
}

#[async_trait]
impl ReportStore for MySqlStore {
    async fn save_report(&self, report: &NewReport) -> StoreResult<i64> {
        let result = sqlx::query(
            "INSERT INTO reports (report_type, date_range, filters, data, generated_by, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&report.report_type)
        .bind(&report.date_range)
        .bind(Json(&report.filters))
        .bind(Json(&report.data))
        .bind(&report.generated_by)
        .bind(report.created_at)
        .execute(&self.pool)
        .await?;

        i64::try_from(result.last_insert_id())
            .map_err(|e| StoreError::Decode(format!("report id out of range: {}", e)))
    }

    async fn list_reports(&self, limit: u32) -> StoreResult<Vec<SavedReport>> {
        let sql = format!(
            "SELECT {} FROM reports ORDER BY created_at DESC, id DESC LIMIT ?",
            REPORT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(report_from_row).collect()
    }

    async fn get_report(&self, id: i64) -> StoreResult<Option<SavedReport>> {
        let sql = format!("SELECT {} FROM reports WHERE id = ?", REPORT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(report_from_row).transpose()
    }

    async fn delete_report(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM reports WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl MonitoringStore for MySqlStore {
    async fn record_health_checks(&self, checks: &[HealthCheckResult]) -> StoreResult<()> {
        if checks.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::<MySql>::new(
            "INSERT INTO system_health_checks (service_name, status, response_time_ms, details, checked_at) ",
        );
        qb.push_values(checks, |mut b, check| {
            b.push_bind(check.service_name.clone())
                .push_bind(check.status.as_str())
                .push_bind(check.response_time_ms)
                .push_bind(Json(check.detail.clone()))
                .push_bind(check.timestamp);
        });
        qb.build().execute(&self.pool).await?;
        Ok(())
    }

    async fn recent_logs(&self, filter: &LogFilter) -> StoreResult<Vec<SystemLogRecord>> {
        let mut qb = QueryBuilder::<MySql>::new(
            "SELECT id, level, service, message, metadata, created_at FROM system_logs WHERE 1 = 1",
        );
        if !filter.levels.is_empty() {
            qb.push(" AND level IN (");
            let mut levels = qb.separated(", ");
            for level in &filter.levels {
                levels.push_bind(level.as_str());
            }
            levels.push_unseparated(")");
        }
        if let Some(service) = &filter.service {
            qb.push(" AND service = ").push_bind(service.clone());
        }
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(filter.limit);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(log_from_row).collect()
    }

    async fn user_counts(&self, today: NaiveDate) -> StoreResult<UserCounts> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   CAST(COALESCE(SUM(status = 'active'), 0) AS SIGNED) AS active,
                   CAST(COALESCE(SUM(DATE(created_at) = ?), 0) AS SIGNED) AS new_today,
                   CAST(COALESCE(SUM(role = 'driver'), 0) AS SIGNED) AS drivers,
                   CAST(COALESCE(SUM(role = 'passenger'), 0) AS SIGNED) AS passengers
            FROM users
            "#,
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserCounts {
            total: row.try_get("total")?,
            active: row.try_get("active")?,
            new_today: row.try_get("new_today")?,
            drivers: row.try_get("drivers")?,
            passengers: row.try_get("passengers")?,
        })
    }
}

#[async_trait]
impl UserStore for MySqlStore {
    async fn list_users(&self, filter: &UserFilter) -> StoreResult<Page<User>> {
        let mut count = QueryBuilder::<MySql>::new("SELECT COUNT(*) AS total FROM users");
        push_user_filters(&mut count, filter);
        let total: i64 = count.build().fetch_one(&self.pool).await?.try_get("total")?;

        let mut select = QueryBuilder::<MySql>::new(format!("SELECT {} FROM users", USER_COLUMNS));
        push_user_filters(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(filter.pagination.limit)
            .push(" OFFSET ")
            .push_bind(filter.pagination.offset());

        let rows = select.build().fetch_all(&self.pool).await?;
        let items = rows.iter().map(user_from_row).collect::<StoreResult<Vec<_>>>()?;

        Ok(Page {
            items,
            total: u64::try_from(total).unwrap_or(0),
            page: filter.pagination.page,
            limit: filter.pagination.limit,
        })
    }

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_user_status(&self, id: i64, status: UserStatus) -> StoreResult<Option<User>> {
        // MySQL reports 0 affected rows for a no-op update, so re-read instead
        sqlx::query("UPDATE users SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.get_user(id).await
    }
}

#[async_trait]
impl RideStore for MySqlStore {
    async fn list_rides(&self, filter: &RideFilter) -> StoreResult<Page<Ride>> {
        let mut count = QueryBuilder::<MySql>::new("SELECT COUNT(*) AS total FROM rides");
        push_ride_filters(&mut count, filter);
        let total: i64 = count.build().fetch_one(&self.pool).await?.try_get("total")?;

        let mut select = QueryBuilder::<MySql>::new(format!("SELECT {} FROM rides", RIDE_COLUMNS));
        push_ride_filters(&mut select, filter);
        select
            .push(" ORDER BY departure_time DESC, id DESC LIMIT ")
            .push_bind(filter.pagination.limit)
            .push(" OFFSET ")
            .push_bind(filter.pagination.offset());

        let rows = select.build().fetch_all(&self.pool).await?;
        let items = rows.iter().map(ride_from_row).collect::<StoreResult<Vec<_>>>()?;

        Ok(Page {
            items,
            total: u64::try_from(total).unwrap_or(0),
            page: filter.pagination.page,
            limit: filter.pagination.limit,
        })
    }

    async fn get_ride(&self, id: i64) -> StoreResult<Option<Ride>> {
        let sql = format!("SELECT {} FROM rides WHERE id = ?", RIDE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(ride_from_row).transpose()
    }

    async fn update_ride_status(&self, id: i64, status: RideStatus) -> StoreResult<Option<Ride>> {
        sqlx::query("UPDATE rides SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.get_ride(id).await
    }
}

#[async_trait]
impl SettingsStore for MySqlStore {
    async fn list_settings(&self) -> StoreResult<Vec<Setting>> {
        let sql = format!(
            "SELECT {} FROM system_settings ORDER BY setting_key",
            SETTING_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(setting_from_row).collect()
    }

    async fn upsert_setting(
        &self,
        key: &str,
        value: &str,
        description: Option<&str>,
        updated_by: &str,
    ) -> StoreResult<Setting> {
        sqlx::query(SETTING_UPSERT_SQL)
            .bind(key)
            .bind(value)
            .bind(description)
            .bind(Utc::now())
            .bind(updated_by)
            .execute(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {} FROM system_settings WHERE setting_key = ?",
            SETTING_COLUMNS
        );
        let row = sqlx::query(&sql).bind(key).fetch_one(&self.pool).await?;
        setting_from_row(&row)
    }
}

#[async_trait]
impl FeatureFlagStore for MySqlStore {
    async fn list_feature_flags(&self) -> StoreResult<Vec<FeatureFlag>> {
        let sql = format!("SELECT {} FROM feature_flags ORDER BY name", FLAG_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(flag_from_row).collect()
    }

    async fn update_feature_flag(
        &self,
        name: &str,
        enabled: bool,
        rollout_percentage: Option<u8>,
    ) -> StoreResult<Option<FeatureFlag>> {
        sqlx::query(
            "UPDATE feature_flags \
             SET is_enabled = ?, rollout_percentage = COALESCE(?, rollout_percentage), updated_at = ? \
             WHERE name = ?",
        )
        .bind(enabled)
        .bind(rollout_percentage)
        .bind(Utc::now())
        .bind(name)
        .execute(&self.pool)
        .await?;

        let sql = format!("SELECT {} FROM feature_flags WHERE name = ?", FLAG_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(flag_from_row).transpose()
    }
}

#[async_trait]
impl LogStore for MySqlStore {
    async fn insert_logs(&self, entries: &[SystemLogEntry]) -> Result<(), LogStoreError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::<MySql>::new(
            "INSERT INTO system_logs (level, service, message, metadata, created_at) ",
        );
        qb.push_values(entries, |mut b, entry| {
            b.push_bind(entry.level.as_str())
                .push_bind(entry.service.clone())
                .push_bind(entry.message.clone())
                .push_bind(Json(entry.metadata.clone()))
                .push_bind(entry.created_at);
        });

        qb.build()
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| LogStoreError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use serde::Serialize;

    fn week() -> DateRange {
        DateRange {
            start_date: NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
        }
    }

    fn placeholders(sql: &str) -> usize {
        sql.matches('?').count()
    }

    /// Every serialized field of `T` must be selected under the same alias
    fn assert_selects_fields<T: Serialize + Default>(sql: &str) {
        let fields = serde_json::to_value(T::default()).unwrap();
        for name in fields.as_object().unwrap().keys() {
            assert!(
                sql.contains(&format!("AS {}", name)),
                "missing alias {name} in {sql}"
            );
        }
    }

    #[test]
    fn test_user_summary_bounds_are_inclusive() {
        let qb = user_summary_query(&week(), &ReportFilters::default());
        let sql = qb.sql();

        assert!(sql.contains("SUM(DATE(created_at) >= ?)"));
        assert!(sql.contains("WHERE DATE(created_at) <= ?"));
        assert!(!sql.contains("role = ?"));
        assert_eq!(placeholders(sql), 2);
        assert_selects_fields::<UserAnalyticsSummary>(sql);
    }

    #[test]
    fn test_user_summary_role_filter() {
        let filters = ReportFilters {
            role: Some(UserRole::Driver),
            driver_id: Some(7),
        };
        let qb = user_summary_query(&week(), &filters);
        let sql = qb.sql();

        assert!(sql.trim_end().ends_with("AND role = ?"));
        // driver_id does not apply to user reports
        assert!(!sql.contains("driver_id"));
        assert_eq!(placeholders(sql), 3);
    }

    #[test]
    fn test_ride_summary_query() {
        let qb = ride_summary_query(&week(), &ReportFilters::default());
        assert!(qb.sql().contains("FROM rides"));
        assert!(qb.sql().contains("WHERE DATE(created_at) BETWEEN ? AND ?"));
        assert_eq!(placeholders(qb.sql()), 2);
        assert_selects_fields::<RideAnalyticsSummary>(qb.sql());

        let filters = ReportFilters {
            driver_id: Some(7),
            ..ReportFilters::default()
        };
        let qb = ride_summary_query(&week(), &filters);
        assert!(qb.sql().trim_end().ends_with("AND driver_id = ?"));
        assert_eq!(placeholders(qb.sql()), 3);
    }

    #[test]
    fn test_financial_summary_filters_by_driver_rides() {
        let qb = financial_summary_query(&week(), &ReportFilters::default());
        assert!(qb.sql().contains("FROM bookings"));
        assert!(qb.sql().contains("WHERE DATE(created_at) BETWEEN ? AND ?"));
        assert_eq!(placeholders(qb.sql()), 2);
        assert_selects_fields::<FinancialSummary>(qb.sql());

        let filters = ReportFilters {
            driver_id: Some(1),
            ..ReportFilters::default()
        };
        let qb = financial_summary_query(&week(), &filters);
        assert!(qb
            .sql()
            .contains("AND ride_id IN (SELECT id FROM rides WHERE driver_id = ?)"));
        assert_eq!(placeholders(qb.sql()), 3);
    }

    #[test]
    fn test_system_performance_binds_one_range_per_subquery() {
        let sql = SYSTEM_PERFORMANCE_SQL;
        assert_eq!(placeholders(sql), SYSTEM_PERFORMANCE_RANGES * 2);
        assert_eq!(
            sql.matches("BETWEEN ? AND ?").count(),
            SYSTEM_PERFORMANCE_RANGES
        );
        assert_selects_fields::<SystemPerformanceSummary>(sql);
    }

    #[test]
    fn test_daily_breakdown_groups_by_day() {
        let cases = [
            (AnalyticsType::Users, "FROM users"),
            (AnalyticsType::Rides, "FROM rides"),
            (AnalyticsType::Bookings, "FROM bookings"),
            (AnalyticsType::Revenue, "FROM bookings"),
        ];
        for (kind, table) in cases {
            let sql = breakdown_sql(kind);
            assert!(sql.contains(table), "{kind}: {sql}");
            assert!(sql.contains("SELECT DATE(created_at) AS day"), "{kind}");
            assert!(sql.contains("WHERE DATE(created_at) BETWEEN ? AND ?"), "{kind}");
            assert!(sql.contains("GROUP BY DATE(created_at)"), "{kind}");
            assert!(sql.contains("ORDER BY day"), "{kind}");
            assert_eq!(placeholders(sql), 2, "{kind}");
            for metric in kind.metrics() {
                assert!(sql.contains(&format!("AS {}", metric)), "{kind}: {metric}");
            }
        }
    }

    #[test]
    fn test_revenue_breakdown_counts_paid_bookings_only() {
        let sql = breakdown_sql(AnalyticsType::Revenue);
        assert!(sql.contains("status IN ('confirmed', 'completed')"));
    }

    #[test]
    fn test_table_lookup_is_scoped_to_current_database() {
        assert!(TABLE_EXISTS_SQL.contains("information_schema.TABLES"));
        assert!(TABLE_EXISTS_SQL.contains("TABLE_SCHEMA = DATABASE()"));
        assert!(TABLE_EXISTS_SQL.contains("AS n"));
        assert_eq!(placeholders(TABLE_EXISTS_SQL), 1);
        assert!(CONNECTION_COUNT_SQL.contains("Threads_connected"));
    }

    #[test]
    fn test_setting_upsert_keeps_description_when_absent() {
        assert_eq!(placeholders(SETTING_UPSERT_SQL), 5);
        assert!(SETTING_UPSERT_SQL.contains("ON DUPLICATE KEY UPDATE"));
        assert!(SETTING_UPSERT_SQL.contains("description = COALESCE(VALUES(description), description)"));
        for column in SETTING_COLUMNS.split(", ") {
            assert!(SETTING_UPSERT_SQL.contains(column), "{column}");
        }
    }
}
