use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Per-site fixed-window admission gate for the ingestion endpoint.
///
/// Owned, injected state: constructed once at startup, held in `AppState`,
/// and instantiated fresh per test — there is no process-global map.
///
/// Fixed window, not sliding: the counter resets the first time `admit`
/// runs after the window's expiry, so a burst straddling a window boundary
/// can admit up to 2× the nominal rate over a short span. That is the
/// documented contract of this gate (see the boundary test), and each
/// process instance enforces its own limit — horizontal scaling multiplies
/// the effective ceiling.
///
/// Entries live in memory only and reset on restart; this is an abuse
/// guard, not a billing meter.
pub struct IngestRateLimiter {
    entries: Mutex<HashMap<String, WindowEntry>>,
    max_per_window: u32,
    window: Duration,
}

struct WindowEntry {
    count: u32,
    window_expires: Instant,
}

impl IngestRateLimiter {
    pub fn new(max_per_window: u32, window: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_per_window,
            window,
        }
    }

    /// Whether this site's request is admitted. Never awaits and never
    /// holds the lock across anything slow — admission is one map probe.
    pub fn admit(&self, site_id: &str) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("rate limiter mutex poisoned");

        let entry = entries
            .entry(site_id.to_string())
            .or_insert_with(|| WindowEntry {
                count: 0,
                window_expires: now + self.window,
            });

        if now >= entry.window_expires {
            entry.count = 1;
            entry.window_expires = now + self.window;
            return true;
        }

        if entry.count >= self.max_per_window {
            return false;
        }
        entry.count += 1;
        true
    }

    /// Drop entries whose window has already expired. Returns the number
    /// removed. Shares the admission lock, so it cannot race `admit`
    /// destructively; memory stays bounded to recently active sites.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("rate limiter mutex poisoned");
        let before = entries.len();
        entries.retain(|_, entry| entry.window_expires > now);
        before - entries.len()
    }

    /// Background loop: sweep expired entries on a fixed interval.
    pub async fn run_sweep_loop(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let removed = self.sweep();
            if removed > 0 {
                tracing::debug!(removed, "swept expired rate-limit entries");
            }
        }
    }

    #[cfg(test)]
    fn tracked_sites(&self) -> usize {
        self.entries.lock().expect("rate limiter mutex poisoned").len()
    }
}
