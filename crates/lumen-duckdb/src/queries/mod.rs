//! Dashboard aggregate queries, one module per shape.
//!
//! Invariant: every statement here is scoped by `site_id = ?` AND a
//! bounded time window derived from a parsed [`Period`] — no query can
//! span sites or scan unbounded history.

pub mod geo;
pub mod live;
pub mod overview;
pub mod timeseries;
pub mod toplist;
pub mod vitals;

use chrono::Utc;
use lumen_core::analytics::Period;

/// Inclusive window start for a lookback period, as a DuckDB timestamp
/// literal (second precision, UTC).
pub(crate) fn window_start(period: Period) -> String {
    let cutoff = Utc::now() - chrono::Duration::hours(period.lookback_hours());
    cutoff.format("%Y-%m-%d %H:%M:%S").to_string()
}
