use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use lumen_server::geo::GeoResolver;
use lumen_server::state::AppState;

/// `lumen health` — liveness probe for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$LUMEN_PORT/health`; exits 0 on HTTP 200,
/// 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("LUMEN_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Health-check subcommand — handled before anything heavy so the probe
    // stays fast.
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }

    // Structured JSON logging; level via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lumen=info".parse()?),
        )
        .json()
        .init();

    let cfg = lumen_core::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = format!("{}/lumen.db", cfg.data_dir);
    let db = lumen_duckdb::DuckDbBackend::open(&db_path, &cfg.duckdb_memory_limit)?;

    // Seed a default site so the server is usable out of the box.
    // ON CONFLICT makes this safe on every startup.
    if let Err(e) = db.seed_site("site_default", "localhost").await {
        tracing::warn!(error = %e, "failed to seed default site");
    } else {
        info!("default site 'site_default' (localhost) ready");
    }

    // Logs its own warning when the database file is absent.
    let geo = GeoResolver::open(&cfg.geoip_path);

    let port = cfg.port;
    let state = Arc::new(AppState::new(db, cfg, geo));

    // Background task: periodic row-buffer flush to DuckDB.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            state.run_flush_loop().await;
        });
    }

    // Background task: sweep expired rate-limit windows.
    {
        let limiter = Arc::clone(&state.rate_limiter);
        let interval = state.config.rate_limit_sweep_interval();
        tokio::spawn(async move {
            limiter.run_sweep_loop(interval).await;
        });
    }

    let addr = format!("0.0.0.0:{}", port);
    let app = lumen_server::app::build_app(Arc::clone(&state));

    info!(port, "lumen listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let state_for_shutdown = Arc::clone(&state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        tokio::signal::ctrl_c().await.ok();
    })
    .await?;

    // Best-effort final flush so a clean shutdown loses as little as possible.
    tokio::time::timeout(
        std::time::Duration::from_secs(5),
        state_for_shutdown.flush_buffer(),
    )
    .await
    .ok();

    Ok(())
}
