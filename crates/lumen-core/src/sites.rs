//! Sites-registry collaborator boundary.
//!
//! Ingestion needs exactly two questions answered: "which site owns this
//! domain?" and "does this site id exist?". A resolved id is trusted for
//! the rest of the request — the registry is not re-consulted per write.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait SiteRegistry: Send + Sync {
    /// Map a tracked domain to its site id. `None` when no site matches.
    async fn resolve_by_domain(&self, domain: &str) -> Result<Option<String>>;

    /// Whether a site with this id exists.
    async fn exists(&self, site_id: &str) -> Result<bool>;
}
