//! Named lookback windows ("1d", "7d", "30d", "90d")

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A supported lookback window
///
/// Parsing is lenient: anything unrecognized falls back to seven days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RangePreset {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "7d")]
    #[default]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
    #[serde(rename = "90d")]
    NinetyDays,
}

impl RangePreset {
    pub fn parse(label: &str) -> Self {
        match label.trim() {
            "1d" => RangePreset::OneDay,
            "30d" => RangePreset::ThirtyDays,
            "90d" => RangePreset::NinetyDays,
            _ => RangePreset::SevenDays,
        }
    }

    pub fn days(&self) -> u64 {
        match self {
            RangePreset::OneDay => 1,
            RangePreset::SevenDays => 7,
            RangePreset::ThirtyDays => 30,
            RangePreset::NinetyDays => 90,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RangePreset::OneDay => "1d",
            RangePreset::SevenDays => "7d",
            RangePreset::ThirtyDays => "30d",
            RangePreset::NinetyDays => "90d",
        }
    }

    /// Resolve the preset against `now`
    pub fn resolve(&self, now: DateTime<Utc>) -> DateRange {
        let end_date = now.date_naive();
        let start_date = end_date
            .checked_sub_days(Days::new(self.days()))
            .unwrap_or(NaiveDate::MIN);
        DateRange {
            start_date,
            end_date,
        }
    }
}

impl fmt::Display for RangePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive calendar-day range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Every day in the range, oldest first
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start_date
            .iter_days()
            .take_while(move |day| *day <= self.end_date)
    }
}

/// Map a range label to concrete dates ending today
pub fn parse_date_range(label: &str, now: DateTime<Utc>) -> DateRange {
    RangePreset::parse(label).resolve(now)
}
