use chrono::{DateTime, Timelike, Utc};
use url::Url;

use crate::event::{EventKind, NormalizedRow, RawEvent};
use crate::referrer;
use crate::useragent::UserAgentInfo;

/// Synthetic origin prepended to bare-path URLs ("/pricing") so that
/// path/hostname extraction cannot fail. RFC 2606 reserves `.invalid`, so
/// the placeholder can never collide with a real tracked hostname.
const FALLBACK_ORIGIN: &str = "http://unknown.invalid";

/// Geo fields for one request, populated by the GeoIP collaborator.
/// Empty strings when no database is available or the IP is unresolvable.
#[derive(Debug, Clone, Default)]
pub struct GeoFields {
    pub country: String,
    pub region: String,
    pub city: String,
}

/// Per-request derivations shared by every event in a submission — one
/// batch comes from one browser, so identity, user agent and geo are
/// computed once and fanned out across the rows.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub visitor_id: String,
    pub session_id: String,
    pub ua: UserAgentInfo,
    pub geo: GeoFields,
    /// Ingestion instant; stored at second precision.
    pub now: DateTime<Utc>,
}

/// Reshape one submission into storage rows, in input order.
///
/// An event whose URL cannot be interpreted even with the bare-path
/// fallback is dropped from the batch (never fatal to its siblings).
/// Every optional field lands as its typed zero value — the row schema
/// has no nullable columns.
pub fn normalize(site_id: &str, events: &[RawEvent], ctx: &RequestContext) -> Vec<NormalizedRow> {
    let created_at = ctx.now.with_nanosecond(0).unwrap_or(ctx.now);

    events
        .iter()
        .filter_map(|event| {
            let (path, hostname) = match split_url(&event.url) {
                Some(parts) => parts,
                None => {
                    tracing::debug!(url = %event.url, "dropping event with unparseable url");
                    return None;
                }
            };

            let referrer_url = event.referrer.clone().unwrap_or_default();
            let referrer_source = referrer::resolve(&referrer_url);

            let event_meta = event
                .meta
                .as_ref()
                .filter(|_| event.kind == EventKind::Custom)
                .and_then(|m| serde_json::to_string(m).ok())
                .unwrap_or_else(|| "{}".to_string());

            Some(NormalizedRow {
                site_id: site_id.to_string(),
                event_type: event.kind.as_str().to_string(),
                url: event.url.clone(),
                path,
                hostname,
                referrer: referrer_url,
                referrer_source,
                utm_source: event.utm_source.clone().unwrap_or_default(),
                utm_medium: event.utm_medium.clone().unwrap_or_default(),
                utm_campaign: event.utm_campaign.clone().unwrap_or_default(),
                utm_term: event.utm_term.clone().unwrap_or_default(),
                utm_content: event.utm_content.clone().unwrap_or_default(),
                country: ctx.geo.country.clone(),
                region: ctx.geo.region.clone(),
                city: ctx.geo.city.clone(),
                browser: ctx.ua.browser.clone(),
                browser_version: ctx.ua.browser_version.clone(),
                os: ctx.ua.os.clone(),
                os_version: ctx.ua.os_version.clone(),
                device_type: ctx.ua.device_type.clone(),
                visitor_id: ctx.visitor_id.clone(),
                session_id: ctx.session_id.clone(),
                duration_ms: event.duration_ms.unwrap_or(0).max(0),
                is_bounce: 0,
                is_new: 0,
                vital_name: filtered(event.kind, EventKind::Vital, &event.vital_name),
                vital_value: if event.kind == EventKind::Vital {
                    event.vital_value.unwrap_or(0.0)
                } else {
                    0.0
                },
                vital_rating: filtered(event.kind, EventKind::Vital, &event.vital_rating),
                event_name: filtered(event.kind, EventKind::Custom, &event.event_name),
                event_meta,
                error_message: filtered(event.kind, EventKind::Error, &event.error_message),
                created_at,
            })
        })
        .collect()
}

fn filtered(kind: EventKind, wanted: EventKind, value: &Option<String>) -> String {
    if kind == wanted {
        value.clone().unwrap_or_default()
    } else {
        String::new()
    }
}

/// Extract (path, hostname) from a raw URL string.
///
/// Values not starting with "http" are treated as bare paths and anchored
/// to [`FALLBACK_ORIGIN`]. Returns `None` only when the URL parser rejects
/// the input even after the fallback.
fn split_url(raw: &str) -> Option<(String, String)> {
    let candidate = if raw.starts_with("http") {
        raw.to_string()
    } else if raw.starts_with('/') {
        format!("{FALLBACK_ORIGIN}{raw}")
    } else {
        format!("{FALLBACK_ORIGIN}/{raw}")
    };

    let parsed = Url::parse(&candidate).ok()?;
    let hostname = parsed.host_str()?.to_string();
    Some((parsed.path().to_string(), hostname))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RawEvent;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn ctx() -> RequestContext {
        RequestContext {
            visitor_id: "aaaaaaaaaaaaaaaa".to_string(),
            session_id: "bbbbbbbbbbbbbbbb".to_string(),
            ua: UserAgentInfo {
                browser: "Chrome".to_string(),
                browser_version: "126".to_string(),
                os: "Linux".to_string(),
                os_version: String::new(),
                device_type: "desktop".to_string(),
                is_bot: false,
            },
            geo: GeoFields::default(),
            now: Utc.with_ymd_and_hms(2026, 8, 6, 12, 30, 45).unwrap(),
        }
    }

    fn pageview(url: &str) -> RawEvent {
        RawEvent {
            kind: EventKind::Pageview,
            url: url.to_string(),
            referrer: None,
            utm_source: None,
            utm_medium: None,
            utm_campaign: None,
            utm_term: None,
            utm_content: None,
            duration_ms: None,
            vital_name: None,
            vital_value: None,
            vital_rating: None,
            event_name: None,
            meta: None,
            error_message: None,
        }
    }

    #[test]
    fn absolute_url_splits_into_path_and_hostname() {
        let rows = normalize("site_a", &[pageview("https://example.com/a?x=1")], &ctx());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].path, "/a");
        assert_eq!(rows[0].hostname, "example.com");
    }

    #[test]
    fn bare_path_gets_placeholder_hostname() {
        let rows = normalize("site_a", &[pageview("/pricing")], &ctx());
        assert_eq!(rows[0].path, "/pricing");
        assert!(!rows[0].hostname.is_empty());
        assert_eq!(rows[0].hostname, "unknown.invalid");
    }

    #[test]
    fn referrer_source_is_derived_per_row() {
        let mut ev = pageview("/");
        ev.referrer = Some("https://www.google.com/".to_string());
        let rows = normalize("site_a", &[ev, pageview("/about")], &ctx());
        assert_eq!(rows[0].referrer_source, "Google");
        assert_eq!(rows[1].referrer_source, "Direct");
    }

    #[test]
    fn optional_fields_default_to_typed_zero_values() {
        let rows = normalize("site_a", &[pageview("/")], &ctx());
        let row = &rows[0];
        assert_eq!(row.utm_source, "");
        assert_eq!(row.duration_ms, 0);
        assert_eq!(row.vital_value, 0.0);
        assert_eq!(row.event_meta, "{}");
        assert_eq!(row.is_bounce, 0);
    }

    #[test]
    fn fields_irrelevant_to_the_kind_are_ignored_not_rejected() {
        let mut ev = pageview("/");
        ev.vital_name = Some("LCP".to_string());
        ev.vital_value = Some(2.5);
        ev.error_message = Some("boom".to_string());
        let rows = normalize("site_a", &[ev], &ctx());
        assert_eq!(rows[0].event_type, "pageview");
        assert_eq!(rows[0].vital_name, "");
        assert_eq!(rows[0].vital_value, 0.0);
        assert_eq!(rows[0].error_message, "");
    }

    #[test]
    fn custom_meta_is_serialized_to_json() {
        let mut ev = pageview("/checkout");
        ev.kind = EventKind::Custom;
        ev.event_name = Some("purchase".to_string());
        ev.meta = Some(BTreeMap::from([("plan".to_string(), "pro".to_string())]));
        let rows = normalize("site_a", &[ev], &ctx());
        assert_eq!(rows[0].event_name, "purchase");
        assert_eq!(rows[0].event_meta, r#"{"plan":"pro"}"#);
    }

    #[test]
    fn unparseable_url_drops_only_the_offending_event() {
        // Starts with "http" so the fallback does not apply, yet has no host.
        let rows = normalize("site_a", &[pageview("http://"), pageview("/ok")], &ctx());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].path, "/ok");
    }

    #[test]
    fn output_order_matches_input_order() {
        let rows = normalize(
            "site_a",
            &[pageview("/one"), pageview("/two"), pageview("/three")],
            &ctx(),
        );
        let paths: Vec<&str> = rows.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/one", "/two", "/three"]);
    }

    #[test]
    fn timestamp_has_second_precision() {
        let rows = normalize("site_a", &[pageview("/")], &ctx());
        assert_eq!(rows[0].created_at.timestamp_subsec_nanos(), 0);
    }
}
