use anyhow::Result;

use lumen_core::analytics::{Granularity, Period, TimeseriesPoint};

use crate::queries::window_start;
use crate::DuckDbBackend;

impl DuckDbBackend {
    /// Visitors + pageviews per bucket, ascending: hourly buckets for the
    /// 24h period, daily otherwise. Buckets with no rows are omitted — a
    /// quiet site yields an empty series, not an error.
    pub async fn get_timeseries(
        &self,
        site_id: &str,
        period: Period,
    ) -> Result<Vec<TimeseriesPoint>> {
        let conn = self.conn.lock().await;
        let start = window_start(period);

        // Bucket label format is fixed per granularity; only these two
        // whitelisted fragments are ever interpolated into the SQL.
        let bucket_expr = match period.bucket() {
            Granularity::Hour => "strftime(created_at, '%Y-%m-%d %H:00:00')",
            Granularity::Day => "strftime(created_at, '%Y-%m-%d')",
        };

        let sql = format!(
            r#"SELECT
                   {bucket_expr}              AS bucket,
                   COUNT(DISTINCT visitor_id) AS visitors,
                   COUNT(*)                   AS pageviews
               FROM events
               WHERE site_id = ?1
                 AND event_type = 'pageview'
                 AND created_at >= ?2
               GROUP BY bucket
               ORDER BY bucket"#
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(duckdb::params![site_id, start], |row| {
            Ok(TimeseriesPoint {
                bucket: row.get(0)?,
                visitors: row.get(1)?,
                pageviews: row.get(2)?,
            })
        })?;

        let mut series = Vec::new();
        for row in rows {
            series.push(row?);
        }
        Ok(series)
    }
}
