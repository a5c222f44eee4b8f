//! Event type names published on the job event bus and forwarded to
//! WebSocket clients.

/// A job was accepted and stored as `pending`.
pub const EVENT_JOB_SUBMITTED: &str = "job_submitted";

/// Progress checkpoint while a job is `processing`.
pub const EVENT_JOB_PROGRESS: &str = "job_progress";

/// Job reached `completed`.
pub const EVENT_JOB_COMPLETED: &str = "job_completed";

/// Job reached `failed`.
pub const EVENT_JOB_FAILED: &str = "job_failed";

/// Completed jobs were removed from the store.
pub const EVENT_JOBS_CLEARED: &str = "jobs_cleared";
