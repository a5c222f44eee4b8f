use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the Framepack server answered the availability probe.
    pub generator_available: bool,
}

/// GET /health -- returns service and generator health.
///
/// An unreachable generator only degrades the service: jobs still complete
/// through the demo simulation.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let generator_available = state.framepack.is_available().await;

    let status = if generator_available { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        generator_available,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
