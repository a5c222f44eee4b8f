//! Generation job model, status lifecycle and parameter validation.
//!
//! A [`Job`] is created `pending` by the store, moved to `processing` by the
//! generation pipeline and ends in exactly one of `completed` or `failed`.
//! Field changes are expressed as a [`JobUpdate`] and merged onto the record
//! by the store; the pipeline alone decides which transitions are legal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Parameter bounds
// ---------------------------------------------------------------------------

/// Shortest clip the generator accepts, in seconds.
pub const MIN_DURATION_SECS: u32 = 1;
/// Longest clip the generator accepts, in seconds.
pub const MAX_DURATION_SECS: u32 = 30;
/// Minimum number of diffusion steps.
pub const MIN_STEPS: u32 = 1;
/// Maximum number of diffusion steps.
pub const MAX_STEPS: u32 = 100;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Whether the job has reached the end of its pipeline run.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid job status '{s}'. Must be one of: pending, processing, completed, failed"
                ))
            })
    }
}

/// Which generation strategy produced a job's terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// The external model produced the clip.
    Real,
    /// The generator was unreachable and the demo simulation ran instead.
    Simulated,
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Immutable generation request attached to a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct GenerationParams {
    #[validate(length(min = 1, max = 2000))]
    pub prompt: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub negative_prompt: String,
    /// Clip length in seconds.
    #[validate(range(min = MIN_DURATION_SECS, max = MAX_DURATION_SECS))]
    pub duration: u32,
    pub seed: i64,
    /// Number of inference steps.
    #[validate(range(min = MIN_STEPS, max = MAX_STEPS))]
    pub steps: u32,
}

impl GenerationParams {
    /// Validate bounds and reject whitespace-only prompts.
    pub fn validate_request(&self) -> Result<(), CoreError> {
        self.validate()?;
        if self.prompt.trim().is_empty() {
            return Err(CoreError::Validation(
                "prompt must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Job record
// ---------------------------------------------------------------------------

/// A single image-to-video generation request and its tracked lifecycle.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: DbId,
    pub status: JobStatus,
    /// Percentage 0-100. Only meaningful while `processing`.
    pub progress: u8,
    /// Original filename of the uploaded image.
    pub filename: String,
    pub source_image_path: String,
    pub output_video_path: Option<String>,
    pub error: Option<String>,
    pub mode: Option<GenerationMode>,
    pub parameters: GenerationParams,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    /// Build a fresh `pending` job.
    pub fn new(
        id: DbId,
        parameters: GenerationParams,
        source_image_path: String,
        filename: String,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id,
            status: JobStatus::Pending,
            progress: 0,
            filename,
            source_image_path,
            output_video_path: None,
            error: None,
            mode: None,
            parameters,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge the `Some` fields of `update` onto this record.
    ///
    /// An output path that is already set is never replaced.
    pub fn apply(&mut self, update: JobUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(progress) = update.progress {
            self.progress = progress.min(100);
        }
        if let Some(path) = update.output_video_path {
            match &self.output_video_path {
                None => self.output_video_path = Some(path),
                Some(existing) => tracing::warn!(
                    job_id = self.id,
                    existing = %existing,
                    rejected = %path,
                    "Ignoring attempt to replace output video path",
                ),
            }
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
        if let Some(mode) = update.mode {
            self.mode = Some(mode);
        }
        self.updated_at = chrono::Utc::now();
    }

    /// Download filename for this job's clip: the upload's stem plus `.mp4`.
    pub fn download_filename(&self) -> String {
        crate::media::video_filename_for(&self.filename)
    }
}

// ---------------------------------------------------------------------------
// Partial update
// ---------------------------------------------------------------------------

/// Partial set of job fields written by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub output_video_path: Option<String>,
    pub error: Option<String>,
    pub mode: Option<GenerationMode>,
}

impl JobUpdate {
    /// Progress checkpoint without a status change.
    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }

    /// Move to `processing` at the given progress.
    pub fn processing(progress: u8) -> Self {
        Self {
            status: Some(JobStatus::Processing),
            progress: Some(progress),
            ..Default::default()
        }
    }

    /// Record which strategy is producing the job's outcome.
    pub fn strategy(mode: GenerationMode) -> Self {
        Self {
            mode: Some(mode),
            ..Default::default()
        }
    }

    /// Terminal success.
    pub fn completed(output_video_path: String, mode: GenerationMode) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            progress: Some(100),
            output_video_path: Some(output_video_path),
            mode: Some(mode),
            ..Default::default()
        }
    }

    /// Terminal failure with a human-readable reason.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Attach an explanatory note (used by the demo simulation).
    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.error = Some(notice.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Dashboard counters over the current job set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    /// Sum of requested durations of completed clips, in seconds.
    pub total_duration_secs: u64,
}

impl JobStats {
    pub fn from_jobs<'a>(jobs: impl IntoIterator<Item = &'a Job>) -> Self {
        let mut stats = JobStats::default();
        for job in jobs {
            stats.total += 1;
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Completed => {
                    stats.completed += 1;
                    stats.total_duration_secs += u64::from(job.parameters.duration);
                }
                JobStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
