//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`JobEvent`]s. It is shared
//! via `Arc<EventBus>` between the pipeline and the HTTP layer.

use chrono::{DateTime, Utc};
use framecast_core::job::{Job, JobStatus};
use framecast_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// JobEvent
// ---------------------------------------------------------------------------

/// Something that happened to a job (or to the job set).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    /// Event name, one of the `EVENT_*` constants in
    /// [`framecast_core::job_events`].
    #[serde(rename = "type")]
    pub event_type: String,

    /// The job concerned, if the event is about a single job.
    pub job_id: Option<DbId>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl JobEvent {
    /// Create an event with an empty payload.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            job_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn for_job(mut self, job_id: DbId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Snapshot of a job's observable state, used for lifecycle events.
    pub fn from_job(event_type: impl Into<String>, job: &Job) -> Self {
        Self::new(event_type)
            .for_job(job.id)
            .with_payload(serde_json::json!({
                "status": job.status,
                "progress": job.progress,
                "mode": job.mode,
                "error": job.error,
            }))
    }

    /// Status carried in the payload, if any.
    pub fn status(&self) -> Option<JobStatus> {
        serde_json::from_value(self.payload.get("status")?.clone()).ok()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use framecast_events::bus::{EventBus, JobEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(JobEvent::new("job_submitted").for_job(1));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<JobEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unread events are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: JobEvent) {
        // A SendError only means nobody is listening.
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            tracing::trace!(event_type = %event.event_type, "No subscribers for event");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
