use axum::routing::post;
use axum::Router;

use crate::handlers::merge;
use crate::state::AppState;

/// ```text
/// POST   /merge   -> merge_videos
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/merge", post(merge::merge_videos))
}
