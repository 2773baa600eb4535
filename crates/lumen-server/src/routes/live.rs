use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use crate::{error::AppError, state::AppState};

/// `GET /api/sites/{id}/live/stream` — long-lived SSE feed, one message
/// per qualifying pageview for this site.
///
/// No backlog: the subscription starts at connect time, and a receiver
/// that lags past the channel capacity silently skips what it missed.
/// Closing the connection drops the receiver, which deregisters it.
pub async fn live_stream(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if !state.is_valid_site(&site_id).await {
        return Err(AppError::NotFound("Site not found".to_string()));
    }

    let receiver = state.live.subscribe(&site_id);
    let stream = BroadcastStream::new(receiver).filter_map(|message| match message {
        Ok(pageview) => Event::default().json_data(&pageview).ok().map(Ok),
        // Lagged receiver: skip missed messages rather than ending the feed.
        Err(_) => None,
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
