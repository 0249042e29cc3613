//! RideHub Core Health: pure-logic health classification
//!
//! # Overview
//!
//! This crate turns raw probe readings into one of four ordinal severities and
//! reduces many severities into a single "worst case" status:
//!
//! - **Severity**: [`HealthStatus`] with the total order
//!   `healthy < warning < error < critical`
//! - **Thresholds**: [`ApiThresholds`], [`DatabaseThresholds`] and
//!   [`ResourceThresholds`], all named configuration values
//! - **Reduction**: [`determine_overall_status`]
//!
//! # Key Principles
//!
//! Like the rest of the `core-*` crates this one has zero knowledge of
//! databases, HTTP or the operating system. Callers collect readings and feed
//! them in; the crate only classifies.
//!
//! # Example
//!
//! ```
//! use ridehub_core_health::{determine_overall_status, ApiThresholds, HealthStatus};
//!
//! let api = ApiThresholds::default().classify(0.02, 2_500);
//! assert_eq!(api, HealthStatus::Warning);
//!
//! let overall = determine_overall_status([HealthStatus::Healthy, api]);
//! assert_eq!(overall, HealthStatus::Warning);
//! ```

pub mod status;
pub mod thresholds;

pub use status::{determine_overall_status, HealthStatus, ParseStatusError};
pub use thresholds::{ApiThresholds, DatabaseThresholds, HealthThresholds, ResourceThresholds};
