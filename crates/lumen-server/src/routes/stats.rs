use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use lumen_core::analytics::Period;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub period: Option<String>,
    pub limit: Option<i64>,
}

/// Parse the `period` query parameter, failing closed.
///
/// Absent → 7d (a safe, bounded default). Present but unknown → 400; a bad
/// period must never widen a scan.
fn parse_period(raw: Option<&str>) -> Result<Period, AppError> {
    match raw {
        None => Ok(Period::Week),
        Some(value) => value
            .parse()
            .map_err(|_| AppError::BadRequest("invalid_period: use 24h, 7d, 30d or 90d".to_string())),
    }
}

async fn require_site(state: &AppState, site_id: &str) -> Result<(), AppError> {
    if state.is_valid_site(site_id).await {
        Ok(())
    } else {
        Err(AppError::NotFound("Site not found".to_string()))
    }
}

/// `GET /api/sites/{id}/overview` — visitors, pageviews, duration, bounce rate.
pub async fn get_overview(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_site(&state, &site_id).await?;
    let period = parse_period(query.period.as_deref())?;

    let result = state
        .db
        .get_overview(&site_id, period)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(json!({ "data": result })))
}

/// `GET /api/sites/{id}/timeseries` — visitors/pageviews per bucket.
pub async fn get_timeseries(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_site(&state, &site_id).await?;
    let period = parse_period(query.period.as_deref())?;

    let result = state
        .db
        .get_timeseries(&site_id, period)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(json!({ "data": result })))
}

/// `GET /api/sites/{id}/pages` — top pages, default limit 20.
pub async fn get_pages(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_site(&state, &site_id).await?;
    let period = parse_period(query.period.as_deref())?;

    let result = state
        .db
        .get_top_pages(&site_id, period, query.limit)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(json!({ "data": result })))
}

/// `GET /api/sites/{id}/sources` — top referrer sources.
pub async fn get_sources(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_site(&state, &site_id).await?;
    let period = parse_period(query.period.as_deref())?;

    let result = state
        .db
        .get_top_sources(&site_id, period, query.limit)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(json!({ "data": result })))
}

/// `GET /api/sites/{id}/countries` — unique visitors per country, top 50.
pub async fn get_countries(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_site(&state, &site_id).await?;
    let period = parse_period(query.period.as_deref())?;

    let result = state
        .db
        .get_countries(&site_id, period)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(json!({ "data": result })))
}

/// `GET /api/sites/{id}/devices` — unique visitors per device class.
pub async fn get_devices(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_site(&state, &site_id).await?;
    let period = parse_period(query.period.as_deref())?;

    let result = state
        .db
        .get_devices(&site_id, period)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(json!({ "data": result })))
}

/// `GET /api/sites/{id}/vitals` — per-vital p75/p95 and good-share.
pub async fn get_vitals(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_site(&state, &site_id).await?;
    let period = parse_period(query.period.as_deref())?;

    let result = state
        .db
        .get_vitals(&site_id, period)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(json!({ "data": result })))
}

/// `GET /api/sites/{id}/live` — unique visitors in the trailing 5 minutes.
/// The one query without a `period` parameter.
pub async fn get_live(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require_site(&state, &site_id).await?;

    let visitors = state
        .db
        .get_live_visitors(&site_id)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(json!({ "data": { "visitors": visitors } })))
}
