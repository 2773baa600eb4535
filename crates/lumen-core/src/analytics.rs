//! Dashboard query parameter and result shapes.
//!
//! The store crate implements these against DuckDB; the server crate only
//! translates HTTP queries into them.

use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Fixed lookback window for dashboard queries.
///
/// Parsing fails closed: anything outside the four known values is an
/// error, never an unbounded scan. The live-visitor count is the only
/// query not parameterized by a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
    Quarter,
}

#[derive(Debug, Error)]
#[error("period must be one of: 24h, 7d, 30d, 90d")]
pub struct InvalidPeriod;

impl FromStr for Period {
    type Err = InvalidPeriod;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "24h" => Ok(Period::Day),
            "7d" => Ok(Period::Week),
            "30d" => Ok(Period::Month),
            "90d" => Ok(Period::Quarter),
            _ => Err(InvalidPeriod),
        }
    }
}

impl Period {
    pub fn lookback_hours(self) -> i64 {
        match self {
            Period::Day => 24,
            Period::Week => 7 * 24,
            Period::Month => 30 * 24,
            Period::Quarter => 90 * 24,
        }
    }

    /// Timeseries bucket width: hourly for 24h, daily otherwise.
    pub fn bucket(self) -> Granularity {
        match self {
            Period::Day => Granularity::Hour,
            _ => Granularity::Day,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Day => "24h",
            Period::Week => "7d",
            Period::Month => "30d",
            Period::Quarter => "90d",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Hour,
    Day,
}

/// Single-row site summary over a period. Pageview rows only.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub visitors: i64,
    pub pageviews: i64,
    /// Mean pageview duration in milliseconds.
    pub avg_duration_ms: f64,
    /// Percentage (0–100) of pageviews flagged as bounces.
    pub bounce_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeseriesPoint {
    /// Bucket start, "YYYY-MM-DD HH:00:00" (hourly) or "YYYY-MM-DD" (daily).
    pub bucket: String,
    pub visitors: i64,
    pub pageviews: i64,
}

/// One grouped row of the top-pages / top-sources lists.
#[derive(Debug, Clone, Serialize)]
pub struct TopRow {
    pub key: String,
    pub visitors: i64,
    pub pageviews: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountryRow {
    pub country: String,
    pub visitors: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceRow {
    pub device_type: String,
    pub visitors: i64,
}

/// Per-vital percentile summary over a period.
#[derive(Debug, Clone, Serialize)]
pub struct VitalStat {
    pub vital_name: String,
    pub p75: f64,
    pub p95: f64,
    /// Percentage (0–100) of samples the client rated "good".
    pub good_pct: f64,
    pub samples: i64,
}
