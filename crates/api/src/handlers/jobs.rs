//! Handlers for the `/jobs` resource.
//!
//! Submission stores the uploaded image, creates the `pending` record and
//! hands the job to the dispatcher before responding; generation itself
//! happens in the background.

use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::{self, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use framecast_core::error::CoreError;
use framecast_core::job::{GenerationParams, Job, JobStatus};
use framecast_core::job_events::{EVENT_JOBS_CLEARED, EVENT_JOB_SUBMITTED};
use framecast_core::media;
use framecast_core::types::DbId;
use framecast_events::JobEvent;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    pub status: Option<String>,
}

/// An uploaded source image.
struct UploadedImage {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// Raw multipart fields of a submission, before validation.
#[derive(Default)]
struct SubmitForm {
    image: Option<UploadedImage>,
    prompt: Option<String>,
    negative_prompt: Option<String>,
    duration: Option<String>,
    seed: Option<String>,
    steps: Option<String>,
}

impl SubmitForm {
    async fn read(multipart: &mut Multipart) -> AppResult<Self> {
        let mut form = SubmitForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "image" => {
                    let filename = field.file_name().unwrap_or("image").to_string();
                    let content_type = field.content_type().unwrap_or("").to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    form.image = Some(UploadedImage {
                        filename,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
                "prompt" | "negative_prompt" | "negativePrompt" | "duration" | "seed"
                | "steps" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    let slot = match name.as_str() {
                        "prompt" => &mut form.prompt,
                        "negative_prompt" | "negativePrompt" => &mut form.negative_prompt,
                        "duration" => &mut form.duration,
                        "seed" => &mut form.seed,
                        _ => &mut form.steps,
                    };
                    *slot = Some(text);
                }
                _ => {} // ignore unknown fields
            }
        }

        Ok(form)
    }

    /// Parse and validate the generation parameters.
    fn parameters(&self) -> Result<GenerationParams, CoreError> {
        let params = GenerationParams {
            prompt: self
                .prompt
                .clone()
                .ok_or_else(|| CoreError::Validation("prompt is required".into()))?,
            negative_prompt: self.negative_prompt.clone().unwrap_or_default(),
            duration: parse_number("duration", self.duration.as_deref())?,
            seed: parse_number("seed", self.seed.as_deref())?,
            steps: parse_number("steps", self.steps.as_deref())?,
        };
        params.validate_request()?;
        Ok(params)
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, raw: Option<&str>) -> Result<T, CoreError> {
    let raw = raw.ok_or_else(|| CoreError::Validation(format!("{field} is required")))?;
    raw.trim()
        .parse()
        .map_err(|_| CoreError::Validation(format!("{field} must be an integer, got '{raw}'")))
}

/// Check the uploaded image against type and size limits.
fn validate_image(image: Option<UploadedImage>, max_bytes: usize) -> Result<UploadedImage, CoreError> {
    let image = image.ok_or_else(|| CoreError::Validation("No image file provided".into()))?;
    if !media::is_allowed_image_type(&image.content_type) {
        return Err(CoreError::Validation(
            "Only PNG and JPG images are allowed".into(),
        ));
    }
    if image.bytes.is_empty() {
        return Err(CoreError::Validation("Image file is empty".into()));
    }
    if image.bytes.len() > max_bytes {
        return Err(CoreError::Validation(format!(
            "Image exceeds the {max_bytes} byte upload limit"
        )));
    }
    Ok(image)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_job(state: &AppState, job_id: DbId) -> AppResult<Job> {
    state
        .store
        .get(job_id)
        .await
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))
}

/// `Content-Disposition` value with a header-safe filename.
pub(crate) fn attachment(filename: &str) -> AppResult<HeaderValue> {
    let safe: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{safe}\""))
        .map_err(|e| AppError::InternalError(e.to_string()))
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs
///
/// Multipart submission: an `image` file plus `prompt`, `negative_prompt`
/// (or `negativePrompt`), `duration`, `seed` and `steps`. Returns 201 with
/// the `pending` job; nothing is stored when validation fails.
pub async fn submit_job(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut form = SubmitForm::read(&mut multipart).await?;
    let parameters = form.parameters()?;
    let image = validate_image(form.image.take(), state.config.max_upload_bytes)?;

    let upload_dir = &state.config.upload_dir;
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    let stored = upload_dir.join(format!(
        "{}.{}",
        uuid::Uuid::new_v4(),
        media::extension_for_image_type(&image.content_type)
    ));
    tokio::fs::write(&stored, &image.bytes)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    let job = state
        .store
        .create(
            parameters,
            stored.to_string_lossy().into_owned(),
            image.filename,
        )
        .await;

    tracing::info!(
        job_id = job.id,
        filename = %job.filename,
        bytes = image.bytes.len(),
        "Job submitted",
    );
    state
        .event_bus
        .publish(JobEvent::from_job(EVENT_JOB_SUBMITTED, &job));
    state.dispatcher.spawn(&job).await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

// ---------------------------------------------------------------------------
// List / get / stats
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs[?status=]
///
/// All jobs in submission order, optionally filtered by status.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> AppResult<impl IntoResponse> {
    let jobs = match params.status.as_deref() {
        Some(status) => {
            let status: JobStatus = status.parse()?;
            state.store.list_by_status(status).await
        }
        None => state.store.list().await,
    };

    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state, job_id).await?;
    Ok(Json(DataResponse { data: job }))
}

/// GET /api/v1/jobs/stats
pub async fn job_stats(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(DataResponse {
        data: state.store.stats().await,
    }))
}

// ---------------------------------------------------------------------------
// Clear
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/clear-completed
///
/// Removes every completed job and returns how many were removed.
pub async fn clear_completed(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let cleared = state.store.clear_completed().await;

    state.event_bus.publish(
        JobEvent::new(EVENT_JOBS_CLEARED).with_payload(serde_json::json!({ "cleared": cleared })),
    );

    Ok(Json(DataResponse {
        data: serde_json::json!({ "cleared": cleared }),
    }))
}

// ---------------------------------------------------------------------------
// Download
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs/{id}/download
///
/// Streams the generated clip as `<upload stem>.mp4`. Returns 404 when the
/// job is unknown, not completed, or its file is missing (demo-mode jobs
/// never have one).
pub async fn download_video(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<Response> {
    let job = find_job(&state, job_id).await?;
    let not_available = || {
        AppError::Core(CoreError::NotFound {
            entity: "Completed video",
            id: job_id,
        })
    };

    let path = match (&job.status, &job.output_video_path) {
        (JobStatus::Completed, Some(path)) => path.clone(),
        _ => return Err(not_available()),
    };

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(job_id, path = %path, "Output video missing on disk");
            return Err(not_available());
        }
        Err(e) => return Err(AppError::InternalError(e.to_string())),
    };
    let size = file
        .metadata()
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .len();

    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static(media::content_type_for_extension(&path)),
        ),
        (header::CONTENT_LENGTH, HeaderValue::from(size)),
        (
            header::CONTENT_DISPOSITION,
            attachment(&job.download_filename())?,
        ),
    ];

    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}
