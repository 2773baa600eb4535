use anyhow::Result;

use lumen_core::analytics::{Overview, Period};

use crate::queries::window_start;
use crate::DuckDbBackend;

impl DuckDbBackend {
    /// Site summary over a period: unique visitors, pageviews, mean
    /// pageview duration, bounce rate. Pageview rows only — custom events,
    /// vitals and errors never inflate traffic numbers.
    pub async fn get_overview(&self, site_id: &str, period: Period) -> Result<Overview> {
        let conn = self.conn.lock().await;
        let start = window_start(period);

        let mut stmt = conn.prepare(
            r#"SELECT
                   COUNT(DISTINCT visitor_id)             AS visitors,
                   COUNT(*)                               AS pageviews,
                   COALESCE(AVG(duration_ms), 0)          AS avg_duration_ms,
                   CASE WHEN COUNT(*) = 0 THEN 0.0
                        ELSE ROUND(100.0 * SUM(is_bounce) / COUNT(*), 2)
                   END                                    AS bounce_rate
               FROM events
               WHERE site_id = ?1
                 AND event_type = 'pageview'
                 AND created_at >= ?2"#,
        )?;

        let overview = stmt.query_row(duckdb::params![site_id, start], |row| {
            Ok(Overview {
                visitors: row.get(0)?,
                pageviews: row.get(1)?,
                avg_duration_ms: row.get(2)?,
                bounce_rate: row.get(3)?,
            })
        })?;

        Ok(overview)
    }
}
