use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{routes, state::AppState};

/// Construct the axum [`Router`] with all routes and middleware attached.
///
/// Middleware, outer to inner:
/// 1. `TraceLayer` — structured request/response logging via `tracing`.
/// 2. `CorsLayer` — permissive; the tracking snippet is embedded on
///    third-party origins, so the collect endpoint must answer any origin.
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/collect", post(routes::collect::collect))
        .route("/api/sites/{id}/overview", get(routes::stats::get_overview))
        .route(
            "/api/sites/{id}/timeseries",
            get(routes::stats::get_timeseries),
        )
        .route("/api/sites/{id}/pages", get(routes::stats::get_pages))
        .route("/api/sites/{id}/sources", get(routes::stats::get_sources))
        .route(
            "/api/sites/{id}/countries",
            get(routes::stats::get_countries),
        )
        .route("/api/sites/{id}/devices", get(routes::stats::get_devices))
        .route("/api/sites/{id}/vitals", get(routes::stats::get_vitals))
        .route("/api/sites/{id}/live", get(routes::stats::get_live))
        .route("/api/sites/{id}/live/stream", get(routes::live::live_stream))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
