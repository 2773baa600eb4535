use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use lumen_core::config::Config;
use lumen_duckdb::DuckDbBackend;
use lumen_server::app::build_app;
use lumen_server::geo::GeoResolver;
use lumen_server::state::AppState;

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Test Config with sensible defaults; individual tests override fields.
fn test_config() -> Config {
    Config {
        port: 0,
        data_dir: "/tmp/lumen-test".to_string(),
        geoip_path: "/nonexistent/GeoLite2-City.mmdb".to_string(),
        cors_origins: vec![],
        duckdb_memory_limit: "1GB".to_string(),
        buffer_flush_interval_ms: 5000,
        buffer_max_size: 1000,
        buffer_hard_cap: 50_000,
        insert_timeout_ms: 5000,
        rate_limit_max: 200,
        rate_limit_window_secs: 60,
        rate_limit_sweep_secs: 300,
        live_channel_capacity: 16,
    }
}

/// Fresh in-memory backend + state + app per test.
async fn setup_with(config: Config) -> (Arc<AppState>, axum::Router) {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    db.seed_site("site_test", "example.com")
        .await
        .expect("seed site");
    let geo = GeoResolver::open(&config.geoip_path);
    let state = Arc::new(AppState::new(db, config, geo));
    let app = build_app(Arc::clone(&state));
    (state, app)
}

async fn setup() -> (Arc<AppState>, axum::Router) {
    setup_with(test_config()).await
}

/// POST /api/collect with the given body and user-agent. The ConnectInfo
/// extension stands in for the listener's peer-address plumbing.
fn collect_request(body: &str, user_agent: &str) -> Request<Body> {
    let peer: SocketAddr = "127.0.0.1:4000".parse().expect("peer addr");
    Request::builder()
        .method("POST")
        .uri("/api/collect")
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.7")
        .header("user-agent", user_agent)
        .extension(ConnectInfo(peer))
        .body(Body::from(body.to_string()))
        .expect("build request")
}

/// Stored-row count for a site, after forcing a buffer flush.
async fn event_count(state: &AppState, site_id: &str) -> i64 {
    state.flush_buffer().await;
    let conn = state.db.conn_for_test().await;
    let mut stmt = conn
        .prepare("SELECT COUNT(*) FROM events WHERE site_id = ?1")
        .expect("prepare count query");
    stmt.query_row(lumen_duckdb::duckdb::params![site_id], |row| row.get(0))
        .expect("count events")
}

fn pageview_body() -> String {
    json!({
        "site_id": "site_test",
        "events": [{
            "type": "pageview",
            "url": "https://acme.com/",
            "referrer": "https://www.google.com/"
        }]
    })
    .to_string()
}

// ============================================================
// Accept path
// ============================================================

#[tokio::test]
async fn valid_pageview_is_stored_with_derived_fields() {
    let (state, app) = setup().await;
    let mut live_rx = state.live.subscribe("site_test");

    let response = app
        .oneshot(collect_request(&pageview_body(), BROWSER_UA))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(event_count(&state, "site_test").await, 1);

    let conn = state.db.conn_for_test().await;
    let mut stmt = conn
        .prepare(
            "SELECT event_type, path, referrer_source, visitor_id, session_id \
             FROM events WHERE site_id = ?1",
        )
        .expect("prepare");
    let (event_type, path, source, visitor_id, session_id): (
        String,
        String,
        String,
        String,
        String,
    ) = stmt
        .query_row(lumen_duckdb::duckdb::params!["site_test"], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ))
        })
        .expect("query row");

    assert_eq!(event_type, "pageview");
    assert_eq!(path, "/");
    assert_eq!(source, "Google");
    assert_eq!(visitor_id.len(), 16);
    assert!(visitor_id.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(session_id.len(), 16);

    let message = live_rx.try_recv().expect("exactly one live message");
    assert_eq!(message.path, "/");
    assert!(live_rx.try_recv().is_err());
}

#[tokio::test]
async fn batch_preserves_order_and_per_event_url_failures_drop_only_that_event() {
    let (state, app) = setup().await;

    let body = json!({
        "site_id": "site_test",
        "events": [
            { "type": "pageview", "url": "/one" },
            { "type": "pageview", "url": "http://" },
            { "type": "pageview", "url": "/three" }
        ]
    });

    let response = app
        .oneshot(collect_request(&body.to_string(), BROWSER_UA))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(event_count(&state, "site_test").await, 2);

    let conn = state.db.conn_for_test().await;
    let mut stmt = conn
        .prepare("SELECT path, hostname FROM events WHERE site_id = ?1 ORDER BY rowid")
        .expect("prepare");
    let rows: Vec<(String, String)> = stmt
        .query_map(lumen_duckdb::duckdb::params!["site_test"], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .expect("query")
        .collect::<Result<Vec<_>, _>>()
        .expect("collect");

    assert_eq!(rows[0].0, "/one");
    assert_eq!(rows[1].0, "/three");
    assert!(!rows[0].1.is_empty(), "bare paths get a placeholder hostname");
}

#[tokio::test]
async fn domain_resolves_to_the_registered_site() {
    let (state, app) = setup().await;

    let body = json!({
        "domain": "example.com",
        "events": [{ "type": "pageview", "url": "/from-domain" }]
    });

    let response = app
        .oneshot(collect_request(&body.to_string(), BROWSER_UA))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(event_count(&state, "site_test").await, 1);
}

#[tokio::test]
async fn custom_vital_and_error_events_store_their_variant_fields() {
    let (state, app) = setup().await;

    let body = json!({
        "site_id": "site_test",
        "events": [
            {
                "type": "custom",
                "url": "/checkout",
                "event_name": "purchase",
                "meta": { "plan": "pro" }
            },
            {
                "type": "vital",
                "url": "/",
                "vital_name": "LCP",
                "vital_value": 2.5,
                "vital_rating": "good"
            },
            {
                "type": "error",
                "url": "/app",
                "error_message": "TypeError: x is undefined"
            }
        ]
    });

    let response = app
        .oneshot(collect_request(&body.to_string(), BROWSER_UA))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(event_count(&state, "site_test").await, 3);

    let conn = state.db.conn_for_test().await;
    let mut stmt = conn
        .prepare(
            "SELECT event_name, event_meta FROM events \
             WHERE site_id = ?1 AND event_type = 'custom'",
        )
        .expect("prepare");
    let (name, meta): (String, String) = stmt
        .query_row(lumen_duckdb::duckdb::params!["site_test"], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .expect("custom row");
    assert_eq!(name, "purchase");
    let parsed: Value = serde_json::from_str(&meta).expect("meta is JSON");
    assert_eq!(parsed["plan"], "pro");

    let mut stmt = conn
        .prepare(
            "SELECT vital_name, vital_value, vital_rating FROM events \
             WHERE site_id = ?1 AND event_type = 'vital'",
        )
        .expect("prepare");
    let (vital, value, rating): (String, f64, String) = stmt
        .query_row(lumen_duckdb::duckdb::params!["site_test"], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })
        .expect("vital row");
    assert_eq!(vital, "LCP");
    assert_eq!(value, 2.5);
    assert_eq!(rating, "good");
}

#[tokio::test]
async fn identical_submissions_store_two_rows() {
    // No dedup guarantee — intentionally absent, not an oversight.
    let (state, app) = setup().await;

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(collect_request(&pageview_body(), BROWSER_UA))
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    assert_eq!(event_count(&state, "site_test").await, 2);
}

// ============================================================
// Drop paths — all outwardly identical to success
// ============================================================

#[tokio::test]
async fn malformed_payload_is_acknowledged_and_dropped() {
    let (state, app) = setup().await;

    let response = app
        .oneshot(collect_request("not json", BROWSER_UA))
        .await
        .expect("request");

    // Still a no-content success: a scraper learns nothing.
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(event_count(&state, "site_test").await, 0);
}

#[tokio::test]
async fn empty_event_list_is_acknowledged_and_dropped() {
    let (state, app) = setup().await;

    let body = json!({ "site_id": "site_test", "events": [] });
    let response = app
        .oneshot(collect_request(&body.to_string(), BROWSER_UA))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(event_count(&state, "site_test").await, 0);
}

#[tokio::test]
async fn unknown_site_and_unknown_domain_are_acknowledged_and_dropped() {
    let (state, app) = setup().await;

    for body in [
        json!({ "site_id": "site_nope", "events": [{ "type": "pageview", "url": "/" }] }),
        json!({ "domain": "nope.example", "events": [{ "type": "pageview", "url": "/" }] }),
        json!({ "events": [{ "type": "pageview", "url": "/" }] }),
    ] {
        let response = app
            .clone()
            .oneshot(collect_request(&body.to_string(), BROWSER_UA))
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
    assert_eq!(event_count(&state, "site_test").await, 0);
}

#[tokio::test]
async fn bot_traffic_is_dropped_entirely() {
    let (state, app) = setup().await;
    let mut live_rx = state.live.subscribe("site_test");

    let bot_ua = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";
    let response = app
        .oneshot(collect_request(&pageview_body(), bot_ua))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(event_count(&state, "site_test").await, 0);
    assert!(
        live_rx.try_recv().is_err(),
        "bot batches must not reach the live stream"
    );
}

#[tokio::test]
async fn rate_limited_submissions_are_acknowledged_but_produce_nothing() {
    let mut config = test_config();
    config.rate_limit_max = 3;
    let (state, app) = setup_with(config).await;
    let mut live_rx = state.live.subscribe("site_test");

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(collect_request(&pageview_body(), BROWSER_UA))
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    // Over the ceiling: same acknowledgment, no new row, no live message.
    let response = app
        .oneshot(collect_request(&pageview_body(), BROWSER_UA))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(event_count(&state, "site_test").await, 3);

    for _ in 0..3 {
        assert!(live_rx.try_recv().is_ok(), "admitted batches publish");
    }
    assert!(
        live_rx.try_recv().is_err(),
        "the rate-limited batch must not publish"
    );
}

// ============================================================
// Live stream coupling
// ============================================================

#[tokio::test]
async fn one_live_message_per_batch_for_the_first_pageview() {
    let (state, app) = setup().await;
    let mut live_rx = state.live.subscribe("site_test");

    let body = json!({
        "site_id": "site_test",
        "events": [
            { "type": "custom", "url": "/cta", "event_name": "click" },
            { "type": "pageview", "url": "https://acme.com/first" },
            { "type": "pageview", "url": "https://acme.com/second" }
        ]
    });

    let response = app
        .oneshot(collect_request(&body.to_string(), BROWSER_UA))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let message = live_rx.recv().await.expect("live message");
    assert_eq!(message.kind, "pageview");
    assert_eq!(message.path, "/first");
    assert!(
        live_rx.try_recv().is_err(),
        "only the first pageview of a batch is published"
    );
}

#[tokio::test]
async fn batches_without_pageviews_publish_nothing() {
    let (state, app) = setup().await;
    let mut live_rx = state.live.subscribe("site_test");

    let body = json!({
        "site_id": "site_test",
        "events": [{ "type": "custom", "url": "/cta", "event_name": "click" }]
    });

    let response = app
        .oneshot(collect_request(&body.to_string(), BROWSER_UA))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(event_count(&state, "site_test").await, 1);
    assert!(live_rx.try_recv().is_err());
}

// ============================================================
// Identity coupling
// ============================================================

#[tokio::test]
async fn same_client_keeps_the_same_visitor_id_within_a_day() {
    let (state, app) = setup().await;

    for path in ["/a", "/b"] {
        let body = json!({
            "site_id": "site_test",
            "events": [{ "type": "pageview", "url": path }]
        });
        app.clone()
            .oneshot(collect_request(&body.to_string(), BROWSER_UA))
            .await
            .expect("request");
    }

    assert_eq!(event_count(&state, "site_test").await, 2);
    let conn = state.db.conn_for_test().await;
    let mut stmt = conn
        .prepare("SELECT DISTINCT visitor_id FROM events WHERE site_id = ?1")
        .expect("prepare");
    let ids: Vec<String> = stmt
        .query_map(lumen_duckdb::duckdb::params!["site_test"], |row| row.get(0))
        .expect("query")
        .collect::<Result<Vec<_>, _>>()
        .expect("collect");
    assert_eq!(ids.len(), 1, "same ip+ua on the same day → one visitor");
}
