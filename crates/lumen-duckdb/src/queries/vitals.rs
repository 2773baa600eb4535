use anyhow::Result;

use lumen_core::analytics::{Period, VitalStat};

use crate::queries::window_start;
use crate::DuckDbBackend;

impl DuckDbBackend {
    /// Per-vital percentile summary: p75, p95 and the share of samples the
    /// client rated "good". Only `type = 'vital'` rows participate.
    pub async fn get_vitals(&self, site_id: &str, period: Period) -> Result<Vec<VitalStat>> {
        let conn = self.conn.lock().await;
        let start = window_start(period);

        let mut stmt = conn.prepare(
            r#"SELECT
                   vital_name,
                   quantile_cont(vital_value, 0.75) AS p75,
                   quantile_cont(vital_value, 0.95) AS p95,
                   ROUND(100.0 * SUM(CASE WHEN vital_rating = 'good' THEN 1 ELSE 0 END)
                         / COUNT(*), 2)             AS good_pct,
                   COUNT(*)                         AS samples
               FROM events
               WHERE site_id = ?1
                 AND event_type = 'vital'
                 AND created_at >= ?2
                 AND vital_name <> ''
               GROUP BY vital_name
               ORDER BY vital_name"#,
        )?;

        let rows = stmt.query_map(duckdb::params![site_id, start], |row| {
            Ok(VitalStat {
                vital_name: row.get(0)?,
                p75: row.get(1)?,
                p95: row.get(2)?,
                good_pct: row.get(3)?,
                samples: row.get(4)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
