//! Domain records served by the admin API

use chrono::{DateTime, Utc};
use ridehub_observability::LogLevel;
use serde::{Deserialize, Serialize};

/// Implements `as_str`, `Display` and `FromStr` for a lowercase string enum
/// that maps one-to-one onto a SQL `VARCHAR`/`ENUM` column.
macro_rules! column_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        "invalid {}: '{}' (expected one of: {})",
                        stringify!($name),
                        other,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Driver,
    Passenger,
    Admin,
}

column_enum!(UserRole {
    Driver => "driver",
    Passenger => "passenger",
    Admin => "admin",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Pending,
    Suspended,
    Banned,
}

column_enum!(UserStatus {
    Active => "active",
    Pending => "pending",
    Suspended => "suspended",
    Banned => "banned",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RideStatus {
    Scheduled,
    Active,
    Completed,
    Cancelled,
}

column_enum!(RideStatus {
    Scheduled => "scheduled",
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    Refunded,
}

column_enum!(BookingStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Completed => "completed",
    Cancelled => "cancelled",
    Refunded => "refunded",
});

impl BookingStatus {
    /// Bookings that count toward revenue
    pub fn is_paid(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ride {
    pub id: i64,
    pub driver_id: i64,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub price_per_seat: f64,
    pub available_seats: i32,
    pub status: RideStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub ride_id: i64,
    pub passenger_id: i64,
    pub seats: i32,
    pub total_price: f64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

/// A `system_settings` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFlag {
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub rollout_percentage: u8,
    pub updated_at: DateTime<Utc>,
}

/// A generated report persisted in the `reports` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedReport {
    pub id: i64,
    pub report_type: String,
    pub date_range: String,
    pub filters: serde_json::Value,
    pub data: serde_json::Value,
    pub generated_by: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for [`SavedReport`]
#[derive(Debug, Clone)]
pub struct NewReport {
    pub report_type: String,
    pub date_range: String,
    pub filters: serde_json::Value,
    pub data: serde_json::Value,
    pub generated_by: String,
    pub created_at: DateTime<Utc>,
}

/// A persisted `system_logs` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemLogRecord {
    pub id: i64,
    pub level: LogLevel,
    pub service: String,
    pub message: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// User totals shown on the metrics page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCounts {
    pub total: i64,
    pub active: i64,
    pub new_today: i64,
    pub drivers: i64,
    pub passengers: i64,
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            0
        } else {
            self.total.div_ceil(u64::from(self.limit))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_enum_round_trip_and_error() {
        assert_eq!("Suspended".parse::<UserStatus>(), Ok(UserStatus::Suspended));
        assert_eq!(RideStatus::Cancelled.as_str(), "cancelled");

        let err = "deleted".parse::<UserStatus>().unwrap_err();
        assert!(err.contains("active, pending, suspended, banned"));
    }

    #[test]
    fn test_paid_booking_statuses() {
        assert!(BookingStatus::Confirmed.is_paid());
        assert!(BookingStatus::Completed.is_paid());
        assert!(!BookingStatus::Refunded.is_paid());
    }

    #[test]
    fn test_total_pages() {
        let page: Page<u8> = Page {
            items: vec![],
            total: 41,
            page: 1,
            limit: 20,
        };
        assert_eq!(page.total_pages(), 3);
    }
}
