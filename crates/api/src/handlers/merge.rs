//! Handler for merging completed clips into one download.

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{self, HeaderValue};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use framecast_core::quality::QualityProfile;

use crate::error::{AppError, AppResult};
use crate::handlers::jobs::attachment;
use crate::state::AppState;

/// Download name of every merged export.
const MERGED_FILENAME: &str = "merged_video.mp4";

/// Optional merge settings; an empty body means all defaults.
#[derive(Debug, Default, Deserialize)]
pub struct MergeRequest {
    /// `high`, `medium` or `low`; anything else falls back to `high`.
    pub quality: Option<String>,
    #[serde(alias = "frameRate")]
    pub frame_rate: Option<u32>,
}

/// POST /api/v1/merge
///
/// Concatenates every completed clip in submission order and streams the
/// result as `merged_video.mp4`. The temporary files live until the body
/// stream has been consumed or dropped.
pub async fn merge_videos(State(state): State<AppState>, body: Bytes) -> AppResult<Response> {
    let request: MergeRequest = if body.iter().all(u8::is_ascii_whitespace) {
        MergeRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid merge request: {e}")))?
    };

    let quality = QualityProfile::resolve(request.quality.as_deref());
    let merged = state.merge_engine.merge(quality, request.frame_rate).await?;

    let file = tokio::fs::File::open(merged.path())
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    let size = file
        .metadata()
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .len();

    tracing::info!(
        clips = merged.clip_count,
        quality = %merged.quality,
        frame_rate = merged.frame_rate,
        bytes = size,
        "Streaming merged video",
    );

    // The stream owns `merged`; its temp files go away with the body.
    let stream = ReaderStream::new(file).map(move |chunk| {
        let _artifacts = &merged;
        chunk
    });

    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("video/mp4")),
        (header::CONTENT_LENGTH, HeaderValue::from(size)),
        (header::CONTENT_DISPOSITION, attachment(MERGED_FILENAME)?),
    ];

    Ok((headers, Body::from_stream(stream)).into_response())
}
