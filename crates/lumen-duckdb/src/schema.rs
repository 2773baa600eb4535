/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// All statements use `IF NOT EXISTS` so they are safe to re-run on every
/// startup (idempotent).
///
/// `memory_limit` is passed at runtime from `Config.duckdb_memory_limit`
/// (env `LUMEN_DUCKDB_MEMORY`, default `"1GB"`). Always set an explicit
/// limit — DuckDB's default (80% of system RAM) is wrong for a server
/// process. `SET threads = 2` bounds the background pool for single-writer
/// embedded use.
///
/// Every `events` column is NOT NULL: the ingestion layer fills optional
/// inputs with typed zero values, so a stored row never needs a lookup or
/// a NULL check to interpret.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- SITES (registry; domain is the ingest lookup key)
-- ===========================================
CREATE TABLE IF NOT EXISTS sites (
    id              VARCHAR PRIMARY KEY,           -- 'site_' + short uuid
    name            VARCHAR NOT NULL,
    domain          VARCHAR NOT NULL,
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_sites_domain ON sites(domain);

-- ===========================================
-- EVENTS (main analytics table)
-- ===========================================
CREATE TABLE IF NOT EXISTS events (
    site_id         VARCHAR NOT NULL,
    event_type      VARCHAR NOT NULL,              -- 'pageview' | 'custom' | 'vital' | 'error'
    url             VARCHAR NOT NULL,
    path            VARCHAR NOT NULL,
    hostname        VARCHAR NOT NULL,
    referrer        VARCHAR NOT NULL DEFAULT '',
    referrer_source VARCHAR NOT NULL DEFAULT '',

    -- UTM parameters
    utm_source      VARCHAR NOT NULL DEFAULT '',
    utm_medium      VARCHAR NOT NULL DEFAULT '',
    utm_campaign    VARCHAR NOT NULL DEFAULT '',
    utm_term        VARCHAR NOT NULL DEFAULT '',
    utm_content     VARCHAR NOT NULL DEFAULT '',

    -- GeoIP
    country         VARCHAR NOT NULL DEFAULT '',   -- ISO 3166-1 alpha-2, '' when unresolved
    region          VARCHAR NOT NULL DEFAULT '',
    city            VARCHAR NOT NULL DEFAULT '',

    -- User agent
    browser         VARCHAR NOT NULL DEFAULT '',
    browser_version VARCHAR NOT NULL DEFAULT '',
    os              VARCHAR NOT NULL DEFAULT '',
    os_version      VARCHAR NOT NULL DEFAULT '',
    device_type     VARCHAR NOT NULL DEFAULT 'desktop',

    -- Identity (derived pseudonyms, 16 hex chars, never raw IP/UA)
    visitor_id      VARCHAR NOT NULL,
    session_id      VARCHAR NOT NULL,

    duration_ms     BIGINT NOT NULL DEFAULT 0,
    is_bounce       BIGINT NOT NULL DEFAULT 0,     -- reserved for the session collaborator
    is_new          BIGINT NOT NULL DEFAULT 0,     -- reserved for the session collaborator

    -- Web vitals
    vital_name      VARCHAR NOT NULL DEFAULT '',
    vital_value     DOUBLE NOT NULL DEFAULT 0,
    vital_rating    VARCHAR NOT NULL DEFAULT '',

    -- Custom events
    event_name      VARCHAR NOT NULL DEFAULT '',
    event_meta      VARCHAR NOT NULL DEFAULT '{{}}',

    -- Error events
    error_message   VARCHAR NOT NULL DEFAULT '',

    created_at      TIMESTAMP NOT NULL
);

-- Primary query pattern: site + time window
CREATE INDEX IF NOT EXISTS idx_events_site_time
    ON events(site_id, created_at DESC);

-- Accelerates event-type breakdowns (overview, vitals) within a window
CREATE INDEX IF NOT EXISTS idx_events_site_type_time
    ON events(site_id, event_type, created_at);

-- Accelerates unique-visitor aggregates and the live count
CREATE INDEX IF NOT EXISTS idx_events_site_visitor
    ON events(site_id, visitor_id, created_at);
"#
    )
}
