use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use lumen_core::sites::SiteRegistry;

use crate::DuckDbBackend;

impl DuckDbBackend {
    /// Insert or update a site row with a fixed id.
    ///
    /// Used for the default-site seed at startup and for test fixtures.
    /// `ON CONFLICT` makes it safe to run on every boot.
    pub async fn seed_site(&self, id: &str, domain: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO sites (id, name, domain, created_at, updated_at)
               VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
               ON CONFLICT (id) DO UPDATE SET domain = EXCLUDED.domain,
                                              updated_at = CURRENT_TIMESTAMP"#,
            duckdb::params![id, domain, domain],
        )?;
        Ok(())
    }

    /// Create a site with a generated `site_<short-uuid>` id and return it.
    pub async fn create_site(&self, name: &str, domain: &str) -> Result<String> {
        let id = format!("site_{}", &Uuid::new_v4().simple().to_string()[..10]);
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO sites (id, name, domain, created_at, updated_at)
               VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)"#,
            duckdb::params![id, name, domain],
        )?;
        Ok(id)
    }
}

#[async_trait]
impl SiteRegistry for DuckDbBackend {
    async fn resolve_by_domain(&self, domain: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT id FROM sites WHERE domain = ?1 LIMIT 1")?;
        let mut rows = stmt.query(duckdb::params![domain])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    async fn exists(&self, site_id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT COUNT(*) FROM sites WHERE id = ?1")?;
        let count: i64 = stmt.query_row(duckdb::params![site_id], |row| row.get(0))?;
        Ok(count > 0)
    }
}
