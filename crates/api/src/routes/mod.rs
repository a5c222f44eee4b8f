pub mod health;
pub mod jobs;
pub mod merge;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                          WebSocket job event feed
///
/// /jobs                        list, submit (multipart)
/// /jobs/stats                  dashboard counters
/// /jobs/clear-completed        remove completed jobs (POST)
/// /jobs/{id}                   get
/// /jobs/{id}/download          stream the generated clip
///
/// /merge                       concatenate completed clips (POST)
/// ```
///
/// `max_upload_bytes` bounds the multipart body of job submissions.
pub fn api_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/jobs", jobs::router(max_upload_bytes))
        .merge(merge::router())
}
