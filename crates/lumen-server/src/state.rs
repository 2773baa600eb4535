use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, warn};

use lumen_core::{config::Config, event::NormalizedRow, sites::SiteRegistry};
use lumen_duckdb::DuckDbBackend;

use crate::geo::GeoResolver;
use crate::live::LiveStream;
use crate::rate_limit::IngestRateLimiter;

/// Shared application state injected into every axum handler via
/// [`axum::extract::State`]. Heavy resources live behind `Arc`.
pub struct AppState {
    /// The DuckDB store. Internally `Arc<tokio::sync::Mutex<Connection>>`,
    /// already async-safe and cheap to share.
    pub db: Arc<DuckDbBackend>,

    /// Parsed configuration, loaded once at startup.
    pub config: Arc<Config>,

    /// In-memory row buffer between ingestion and the store.
    ///
    /// Lock, extend, release on the write side; lock, `std::mem::take`,
    /// release on the flush side — the DB write itself never runs under
    /// this lock, so collect requests are never blocked by an insert.
    buffer: Mutex<Vec<NormalizedRow>>,

    /// In-process cache of known-valid site ids. Populated lazily on first
    /// sight; never invalidated during a run (sites are not deleted at
    /// runtime).
    site_cache: RwLock<HashSet<String>>,

    /// Per-site ingestion admission gate.
    pub rate_limiter: Arc<IngestRateLimiter>,

    /// Live pageview pub/sub bus.
    pub live: Arc<LiveStream>,

    /// GeoIP collaborator.
    pub geo: Arc<GeoResolver>,
}

impl AppState {
    pub fn new(db: DuckDbBackend, config: Config, geo: GeoResolver) -> Self {
        let rate_limiter = Arc::new(IngestRateLimiter::new(
            config.rate_limit_max,
            config.rate_limit_window(),
        ));
        let live = Arc::new(LiveStream::new(config.live_channel_capacity));
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
            buffer: Mutex::new(Vec::new()),
            site_cache: RwLock::new(HashSet::new()),
            rate_limiter,
            live,
            geo: Arc::new(geo),
        }
    }

    /// Return `true` if the site id is known to exist. Cache first, store
    /// on a miss.
    pub async fn is_valid_site(&self, site_id: &str) -> bool {
        {
            let cache = self.site_cache.read().await;
            if cache.contains(site_id) {
                return true;
            }
        }

        match self.db.exists(site_id).await {
            Ok(true) => {
                self.site_cache.write().await.insert(site_id.to_string());
                true
            }
            Ok(false) => false,
            Err(e) => {
                error!(site_id, error = %e, "site existence lookup failed");
                false
            }
        }
    }

    /// Resolve a submission's target site: explicit `site_id` wins, else
    /// the domain is looked up through the registry. `None` means the
    /// submission should be dropped.
    pub async fn resolve_site(
        &self,
        site_id: Option<&str>,
        domain: Option<&str>,
    ) -> Option<String> {
        if let Some(id) = site_id {
            if self.is_valid_site(id).await {
                return Some(id.to_string());
            }
            return None;
        }

        let domain = domain?;
        match self.db.resolve_by_domain(domain).await {
            Ok(Some(id)) => {
                self.site_cache.write().await.insert(id.clone());
                Some(id)
            }
            Ok(None) => None,
            Err(e) => {
                error!(domain, error = %e, "domain resolution failed");
                None
            }
        }
    }

    /// Append rows to the buffer without awaiting the store.
    ///
    /// The buffer is hard-capped: rows beyond the cap are dropped with a
    /// warning rather than queued without bound — sustained overload
    /// sheds load instead of leaking memory. Crossing the flush threshold
    /// triggers an immediate background flush.
    pub async fn push_rows(self: Arc<Self>, mut rows: Vec<NormalizedRow>) {
        let should_flush = {
            let mut buffer = self.buffer.lock().await;
            let room = self.config.buffer_hard_cap.saturating_sub(buffer.len());
            if rows.len() > room {
                warn!(
                    dropped = rows.len() - room,
                    "row buffer at hard cap; shedding load"
                );
                rows.truncate(room);
            }
            buffer.extend(rows);
            buffer.len() >= self.config.buffer_max_size
        };

        if should_flush {
            tokio::spawn(async move {
                self.flush_buffer().await;
            });
        }
    }

    /// Drain the buffer and write pending rows to the store.
    ///
    /// Best-effort by contract: a failed or timed-out insert is logged at
    /// error level (the one failure operators need to see) and the rows
    /// are gone. Nothing upstream ever waits on this.
    pub async fn flush_buffer(&self) {
        let batch: Vec<NormalizedRow> = {
            let mut buffer = self.buffer.lock().await;
            std::mem::take(&mut *buffer)
        };

        if batch.is_empty() {
            return;
        }

        match tokio::time::timeout(self.config.insert_timeout(), self.db.insert_rows(&batch)).await
        {
            Ok(Ok(())) => {
                debug!(count = batch.len(), "row buffer flushed");
            }
            Ok(Err(e)) => {
                error!(count = batch.len(), error = %e, "row insert failed; batch lost");
            }
            Err(_) => {
                error!(
                    count = batch.len(),
                    timeout_ms = self.config.insert_timeout_ms,
                    "row insert timed out; batch lost"
                );
            }
        }
    }

    /// Background loop: flush the buffer on a fixed interval.
    pub async fn run_flush_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.buffer_flush_interval());
        loop {
            ticker.tick().await;
            self.flush_buffer().await;
        }
    }
}
