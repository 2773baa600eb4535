use anyhow::Result;
use chrono::Utc;

use crate::DuckDbBackend;

/// The live counter's trailing window. Fixed — this is the one dashboard
/// query not parameterized by a period.
const LIVE_WINDOW_MINUTES: i64 = 5;

impl DuckDbBackend {
    /// Unique visitors active in the trailing five minutes.
    pub async fn get_live_visitors(&self, site_id: &str) -> Result<i64> {
        let conn = self.conn.lock().await;
        let cutoff = Utc::now() - chrono::Duration::minutes(LIVE_WINDOW_MINUTES);
        let cutoff_str = cutoff.format("%Y-%m-%d %H:%M:%S").to_string();

        let count: i64 = conn
            .prepare(
                "SELECT COUNT(DISTINCT visitor_id) FROM events \
                 WHERE site_id = ?1 AND created_at > ?2",
            )?
            .query_row(duckdb::params![site_id, cutoff_str], |row| row.get(0))?;

        Ok(count)
    }
}
