use anyhow::Result;

use lumen_core::analytics::{Period, TopRow};

use crate::queries::window_start;
use crate::DuckDbBackend;

/// Default and ceiling for caller-supplied top-list limits.
pub const DEFAULT_TOP_LIMIT: i64 = 20;
pub const MAX_TOP_LIMIT: i64 = 100;

impl DuckDbBackend {
    /// Most-visited paths over a period, by unique visitors descending.
    pub async fn get_top_pages(
        &self,
        site_id: &str,
        period: Period,
        limit: Option<i64>,
    ) -> Result<Vec<TopRow>> {
        self.top_by_column("path", site_id, period, limit).await
    }

    /// Top referrer sources over a period, by unique visitors descending.
    /// "Direct" is a source like any other here.
    pub async fn get_top_sources(
        &self,
        site_id: &str,
        period: Period,
        limit: Option<i64>,
    ) -> Result<Vec<TopRow>> {
        self.top_by_column("referrer_source", site_id, period, limit)
            .await
    }

    /// Shared grouped-count query. `column` is a compile-time constant from
    /// the two public wrappers — never caller input. Tie order within equal
    /// visitor counts follows the store's grouping order.
    async fn top_by_column(
        &self,
        column: &'static str,
        site_id: &str,
        period: Period,
        limit: Option<i64>,
    ) -> Result<Vec<TopRow>> {
        let conn = self.conn.lock().await;
        let start = window_start(period);
        let limit = limit.unwrap_or(DEFAULT_TOP_LIMIT).clamp(1, MAX_TOP_LIMIT);

        let sql = format!(
            r#"SELECT
                   {column}                   AS key,
                   COUNT(DISTINCT visitor_id) AS visitors,
                   COUNT(*)                   AS pageviews
               FROM events
               WHERE site_id = ?1
                 AND event_type = 'pageview'
                 AND created_at >= ?2
               GROUP BY key
               ORDER BY visitors DESC
               LIMIT ?3"#
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(duckdb::params![site_id, start, limit], |row| {
            Ok(TopRow {
                key: row.get(0)?,
                visitors: row.get(1)?,
                pageviews: row.get(2)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
