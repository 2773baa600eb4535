use std::sync::Arc;

use anyhow::Result;
use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::info;

use lumen_core::event::NormalizedRow;

use crate::schema::init_sql;

/// The DuckDB analytical store.
///
/// DuckDB is single-writer: concurrent reads are fine, but concurrent
/// writes contend. The connection lives behind `Arc<tokio::sync::Mutex<_>>`
/// so the async runtime serialises writes through the buffer-flush task
/// while the struct stays cheap to clone across axum handlers.
///
/// Writes are best-effort by contract: the ingestion response never waits
/// on them, and a failed or timed-out batch is logged and dropped upstream.
pub struct DuckDbBackend {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl DuckDbBackend {
    /// Open (or create) a DuckDB database file at `path`.
    ///
    /// `memory_limit` is a DuckDB size string such as `"1GB"` or `"512MB"`.
    /// Runs the schema init SQL so all tables and indexes exist.
    pub fn open(path: &str, memory_limit: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(&init_sql(memory_limit))?;
        info!(
            "DuckDB opened at {} with memory_limit={}, threads=2",
            path, memory_limit
        );
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an **in-memory** database. Intended for tests — data is
    /// discarded when the struct is dropped.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(&init_sql("1GB"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert a batch of normalized rows in a single transaction.
    ///
    /// Called by the buffer-flush background task; one fsync per batch
    /// instead of N. Returns immediately (no-op) if `rows` is empty.
    pub async fn insert_rows(&self, rows: &[NormalizedRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        for row in rows {
            tx.execute(
                r#"INSERT INTO events (
                    site_id, event_type, url, path, hostname,
                    referrer, referrer_source,
                    utm_source, utm_medium, utm_campaign, utm_term, utm_content,
                    country, region, city,
                    browser, browser_version, os, os_version, device_type,
                    visitor_id, session_id,
                    duration_ms, is_bounce, is_new,
                    vital_name, vital_value, vital_rating,
                    event_name, event_meta, error_message,
                    created_at
                ) VALUES (
                    ?1,  ?2,  ?3,  ?4,  ?5,
                    ?6,  ?7,
                    ?8,  ?9,  ?10, ?11, ?12,
                    ?13, ?14, ?15,
                    ?16, ?17, ?18, ?19, ?20,
                    ?21, ?22,
                    ?23, ?24, ?25,
                    ?26, ?27, ?28,
                    ?29, ?30, ?31,
                    ?32
                )"#,
                duckdb::params![
                    row.site_id,
                    row.event_type,
                    row.url,
                    row.path,
                    row.hostname,
                    row.referrer,
                    row.referrer_source,
                    row.utm_source,
                    row.utm_medium,
                    row.utm_campaign,
                    row.utm_term,
                    row.utm_content,
                    row.country,
                    row.region,
                    row.city,
                    row.browser,
                    row.browser_version,
                    row.os,
                    row.os_version,
                    row.device_type,
                    row.visitor_id,
                    row.session_id,
                    row.duration_ms,
                    row.is_bounce,
                    row.is_new,
                    row.vital_name,
                    row.vital_value,
                    row.vital_rating,
                    row.event_name,
                    row.event_meta,
                    row.error_message,
                    row.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                ],
            )?;
        }

        tx.commit()?;
        tracing::debug!(count = rows.len(), "inserted event batch");
        Ok(())
    }

    /// Execute `SELECT 1` as a lightweight liveness check.
    ///
    /// Called by the `/health` endpoint. Errors when the connection is
    /// unavailable (file locked, disk full, etc.).
    pub async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("SELECT 1")?;
        Ok(())
    }

    /// Acquire the connection lock for direct queries.
    ///
    /// Intended for integration tests that need to verify stored data.
    /// Production code uses the typed methods.
    pub async fn conn_for_test(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
