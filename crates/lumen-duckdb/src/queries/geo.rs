use anyhow::Result;

use lumen_core::analytics::{CountryRow, DeviceRow, Period};

use crate::queries::window_start;
use crate::DuckDbBackend;

/// Country lists are capped; device lists are not (three-ish values).
const COUNTRY_LIMIT: i64 = 50;

impl DuckDbBackend {
    /// Unique visitors per country, descending, capped at 50 rows.
    /// Rows without a GeoIP resolution (empty country) are excluded.
    pub async fn get_countries(&self, site_id: &str, period: Period) -> Result<Vec<CountryRow>> {
        let conn = self.conn.lock().await;
        let start = window_start(period);

        let mut stmt = conn.prepare(
            r#"SELECT country, COUNT(DISTINCT visitor_id) AS visitors
               FROM events
               WHERE site_id = ?1
                 AND event_type = 'pageview'
                 AND created_at >= ?2
                 AND country <> ''
               GROUP BY country
               ORDER BY visitors DESC
               LIMIT ?3"#,
        )?;

        let rows = stmt.query_map(duckdb::params![site_id, start, COUNTRY_LIMIT], |row| {
            Ok(CountryRow {
                country: row.get(0)?,
                visitors: row.get(1)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Unique visitors per device class, descending.
    pub async fn get_devices(&self, site_id: &str, period: Period) -> Result<Vec<DeviceRow>> {
        let conn = self.conn.lock().await;
        let start = window_start(period);

        let mut stmt = conn.prepare(
            r#"SELECT device_type, COUNT(DISTINCT visitor_id) AS visitors
               FROM events
               WHERE site_id = ?1
                 AND event_type = 'pageview'
                 AND created_at >= ?2
               GROUP BY device_type
               ORDER BY visitors DESC"#,
        )?;

        let rows = stmt.query_map(duckdb::params![site_id, start], |row| {
            Ok(DeviceRow {
                device_type: row.get(0)?,
                visitors: row.get(1)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
