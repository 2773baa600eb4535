use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::broadcast;

/// The one message shape on the live bus: "a pageview just happened".
#[derive(Debug, Clone, Serialize)]
pub struct LivePageview {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub path: String,
    pub country: String,
    pub browser: String,
    pub device_type: String,
    pub ts: String,
}

impl LivePageview {
    pub fn new(path: String, country: String, browser: String, device_type: String, ts: String) -> Self {
        Self {
            kind: "pageview",
            path,
            country,
            browser,
            device_type,
            ts,
        }
    }
}

/// In-process pub/sub bus fanning pageview notifications out to open
/// dashboard connections, one broadcast topic per site.
///
/// Strictly ephemeral: no backlog and no replay — a subscriber that
/// connects after a publish never sees it, and a lagged subscriber skips
/// whatever it missed. Dropping a receiver deregisters it; a topic whose
/// last subscriber left is pruned on the next publish to that site.
///
/// Single-process only. A multi-instance deployment needs an external
/// broker in place of this bus.
pub struct LiveStream {
    topics: Mutex<HashMap<String, broadcast::Sender<LivePageview>>>,
    capacity: usize,
}

impl LiveStream {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Fire-and-forget publish to a site's subscribers. A site with no
    /// topic (nobody ever subscribed) is a no-op.
    pub fn publish(&self, site_id: &str, message: LivePageview) {
        let mut topics = self.topics.lock().expect("live topic map poisoned");
        if let Some(sender) = topics.get(site_id) {
            if sender.send(message).is_err() {
                // Last subscriber is gone; drop the idle topic.
                topics.remove(site_id);
            }
        }
    }

    /// Subscribe to one site's feed, creating the topic on demand.
    pub fn subscribe(&self, site_id: &str) -> broadcast::Receiver<LivePageview> {
        let mut topics = self.topics.lock().expect("live topic map poisoned");
        topics
            .entry(site_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub fn subscriber_count(&self, site_id: &str) -> usize {
        let topics = self.topics.lock().expect("live topic map poisoned");
        topics
            .get(site_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}
