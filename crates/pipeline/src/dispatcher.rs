//! Per-job task registry.
//!
//! Each submitted job runs the [`GenerationPipeline`] on its own Tokio task.
//! Handles are kept by job id so in-flight work can be awaited on shutdown.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use framecast_core::job::Job;
use framecast_core::types::DbId;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::generation::GenerationPipeline;

/// Spawns and tracks one pipeline task per job.
pub struct JobDispatcher {
    pipeline: Arc<GenerationPipeline>,
    tasks: Mutex<HashMap<DbId, JoinHandle<()>>>,
}

impl JobDispatcher {
    pub fn new(pipeline: Arc<GenerationPipeline>) -> Self {
        Self {
            pipeline,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Start the pipeline for a freshly created job. Returns immediately.
    pub async fn spawn(&self, job: &Job) {
        let pipeline = Arc::clone(&self.pipeline);
        let job_id = job.id;
        let source = job.source_image_path.clone();
        let parameters = job.parameters.clone();

        let handle = tokio::spawn(async move {
            pipeline.run(job_id, source, parameters).await;
        });

        let mut tasks = self.tasks.lock().await;
        tasks.retain(|_, h| !h.is_finished());
        tasks.insert(job_id, handle);

        tracing::info!(job_id, active = tasks.len(), "Generation task spawned");
    }

    /// Number of pipeline tasks still running.
    pub async fn active_count(&self) -> usize {
        let mut tasks = self.tasks.lock().await;
        tasks.retain(|_, h| !h.is_finished());
        tasks.len()
    }

    /// Wait for a job's task to finish. Returns `false` if no task is tracked
    /// for the id (never spawned, or already pruned).
    pub async fn wait_for(&self, job_id: DbId) -> bool {
        let handle = self.tasks.lock().await.remove(&job_id);
        match handle {
            Some(handle) => {
                if let Err(e) = handle.await {
                    tracing::error!(job_id, error = %e, "Generation task panicked");
                }
                true
            }
            None => false,
        }
    }

    /// Wait up to `timeout` for all in-flight jobs, then abort the rest.
    pub async fn shutdown(&self, timeout: Duration) {
        let handles: Vec<(DbId, JoinHandle<()>)> = self.tasks.lock().await.drain().collect();
        if handles.is_empty() {
            return;
        }

        tracing::info!(count = handles.len(), "Waiting for in-flight generation tasks");
        let aborts: Vec<_> = handles.iter().map(|(_, h)| h.abort_handle()).collect();
        let joined = futures::future::join_all(handles.into_iter().map(|(_, h)| h));

        if tokio::time::timeout(timeout, joined).await.is_err() {
            tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "Generation tasks did not finish in time, aborting",
            );
            for abort in aborts {
                abort.abort();
            }
        }
    }
}
