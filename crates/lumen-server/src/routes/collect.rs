use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;

use lumen_core::{
    event::IngestPayload,
    identity::{session_token, visitor_token},
    normalize::{normalize, RequestContext},
    useragent,
};

use crate::live::LivePageview;
use crate::state::AppState;

/// Why a submission produced no rows. Internal only — every reason maps
/// to the same outward response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MalformedPayload,
    UnknownSite,
    RateLimited,
    BotTraffic,
}

impl DropReason {
    fn as_str(self) -> &'static str {
        match self {
            DropReason::MalformedPayload => "malformed_payload",
            DropReason::UnknownSite => "unknown_site",
            DropReason::RateLimited => "rate_limited",
            DropReason::BotTraffic => "bot_traffic",
        }
    }
}

/// Terminal state of one submission. Expected rejections are values, not
/// errors — nothing in this pipeline throws for control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Accepted { rows: usize },
    Dropped(DropReason),
}

/// `POST /api/collect` — ingest one submission from the browser SDK.
///
/// Always answers `204 No Content`, whatever happened inside: a malformed,
/// unknown-site, rate-limited or bot request is indistinguishable from an
/// accepted one from the outside (anti-enumeration), and the SDK's beacon
/// never needs to handle a failure. Storage and the live publish are both
/// fire-and-forget — the response does not wait on either.
pub async fn collect(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    match ingest(&state, &headers, peer, &body).await {
        IngestOutcome::Accepted { rows } => {
            tracing::debug!(rows, "submission accepted");
        }
        IngestOutcome::Dropped(reason) => {
            // Debug level on purpose: adversarial traffic must not be able
            // to flood operator logs.
            tracing::debug!(reason = reason.as_str(), "submission dropped");
        }
    }
    StatusCode::NO_CONTENT
}

async fn ingest(
    state: &Arc<AppState>,
    headers: &HeaderMap,
    peer: SocketAddr,
    body: &[u8],
) -> IngestOutcome {
    // 1. Payload shape. The body is parsed manually so shape failures end
    //    in the same silent outcome as every other drop.
    let payload: IngestPayload = match serde_json::from_slice(body) {
        Ok(p) => p,
        Err(_) => return IngestOutcome::Dropped(DropReason::MalformedPayload),
    };
    if payload.events.is_empty() {
        return IngestOutcome::Dropped(DropReason::MalformedPayload);
    }

    // 2. Site resolution: explicit id, else domain via the registry.
    let site_id = match state
        .resolve_site(payload.site_id.as_deref(), payload.domain.as_deref())
        .await
    {
        Some(id) => id,
        None => return IngestOutcome::Dropped(DropReason::UnknownSite),
    };

    // 3. Admission gate.
    if !state.rate_limiter.admit(&site_id) {
        return IngestOutcome::Dropped(DropReason::RateLimited);
    }

    // 4. Bot check — drops the whole batch before any other work.
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let ua_info = useragent::classify(&user_agent);
    if ua_info.is_bot {
        return IngestOutcome::Dropped(DropReason::BotTraffic);
    }

    // 5. Per-request derivations, shared by every event in the batch —
    //    one submission comes from one browser on one connection.
    let client_ip = client_ip(headers, peer);
    let now = Utc::now();
    let ctx = RequestContext {
        visitor_id: visitor_token(&site_id, &client_ip, &user_agent, now),
        session_id: session_token(&site_id, &client_ip, &user_agent, now),
        ua: ua_info,
        geo: state.geo.lookup(&client_ip),
        now,
    };

    // 6. Normalize; per-event URL failures drop only that event.
    let rows = normalize(&site_id, &payload.events, &ctx);

    // 7. Hand rows to the buffered store path; the response never waits
    //    on the actual insert.
    let live_message = rows
        .iter()
        .find(|r| r.event_type == "pageview")
        .map(|pageview| {
            LivePageview::new(
                pageview.path.clone(),
                pageview.country.clone(),
                pageview.browser.clone(),
                pageview.device_type.clone(),
                pageview.created_at.to_rfc3339(),
            )
        });
    let count = rows.len();
    Arc::clone(state).push_rows(rows).await;

    // 8. One live notification per batch, for the first pageview only.
    if let Some(message) = live_message {
        state.live.publish(&site_id, message);
    }

    IngestOutcome::Accepted { rows: count }
}

/// Client address: first `x-forwarded-for` entry when present (the service
/// runs behind a proxy in production), else the transport peer address.
fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| peer.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_header_wins_over_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        let peer: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        assert_eq!(client_ip(&headers, peer), "203.0.113.9");
    }

    #[test]
    fn missing_header_falls_back_to_peer_address() {
        let peer: SocketAddr = "192.0.2.4:5000".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), peer), "192.0.2.4");
    }
}
