use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The payload the tracking snippet sends to POST /api/collect.
///
/// One of `site_id` / `domain` must be present; `site_id` wins when both are.
/// Unknown JSON fields are ignored — the browser SDK may be newer than the
/// server, and the endpoint is public, so strictness buys nothing here.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestPayload {
    pub site_id: Option<String>,
    pub domain: Option<String>,
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

/// Event kind as sent on the wire (`"type"` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Pageview,
    Custom,
    Vital,
    Error,
}

impl EventKind {
    /// Column value stored in the `event_type` column.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Pageview => "pageview",
            EventKind::Custom => "custom",
            EventKind::Vital => "vital",
            EventKind::Error => "error",
        }
    }
}

/// One raw browser-submitted event.
///
/// Fields irrelevant to the tagged kind are ignored during normalization,
/// never rejected — a pageview carrying a stray `vital_value` is still a
/// valid pageview.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub url: String,
    pub referrer: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
    pub duration_ms: Option<i64>,
    /// Web-vital fields (kind = vital).
    pub vital_name: Option<String>,
    pub vital_value: Option<f64>,
    pub vital_rating: Option<String>,
    /// Custom-event fields (kind = custom). `meta` is a flat string map.
    pub event_name: Option<String>,
    pub meta: Option<BTreeMap<String, String>>,
    /// Error-event field (kind = error).
    pub error_message: Option<String>,
}

/// The stored version of an event — mirrors the DuckDB `events` table
/// columns exactly. Every column is NOT NULL: optional inputs are filled
/// with their typed zero value so each row is self-contained and no lookup
/// is needed to interpret it later.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedRow {
    pub site_id: String,
    pub event_type: String,
    pub url: String,
    pub path: String,
    pub hostname: String,
    pub referrer: String,
    pub referrer_source: String,
    pub utm_source: String,
    pub utm_medium: String,
    pub utm_campaign: String,
    pub utm_term: String,
    pub utm_content: String,
    pub country: String,
    pub region: String,
    pub city: String,
    pub browser: String,
    pub browser_version: String,
    pub os: String,
    pub os_version: String,
    pub device_type: String,
    /// 16 hex chars, rotates daily. Never reversible to IP/UA.
    pub visitor_id: String,
    /// 16 hex chars, rotates hourly.
    pub session_id: String,
    pub duration_ms: i64,
    /// Reserved; computed by a downstream collaborator. Always 0 here.
    pub is_bounce: i64,
    /// Reserved; computed by a downstream collaborator. Always 0 here.
    pub is_new: i64,
    pub vital_name: String,
    pub vital_value: f64,
    pub vital_rating: String,
    pub event_name: String,
    /// JSON-serialized flat string map; `{}` when the event carries none.
    pub event_meta: String,
    pub error_message: String,
    /// Assigned at ingestion time (server clock, UTC, second precision).
    pub created_at: DateTime<Utc>,
}
