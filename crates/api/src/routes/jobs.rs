//! Route definitions for the `/jobs` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Slack on top of the image size limit for the other multipart fields.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /                  -> list_jobs
/// POST   /                  -> submit_job
/// GET    /stats             -> job_stats
/// POST   /clear-completed   -> clear_completed
/// GET    /{id}              -> get_job
/// GET    /{id}/download     -> download_video
/// ```
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(jobs::list_jobs)
                .post(jobs::submit_job)
                .layer(DefaultBodyLimit::max(max_upload_bytes + FORM_OVERHEAD_BYTES)),
        )
        .route("/stats", get(jobs::job_stats))
        .route("/clear-completed", post(jobs::clear_completed))
        .route("/{id}", get(jobs::get_job))
        .route("/{id}/download", get(jobs::download_video))
}
