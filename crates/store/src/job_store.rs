//! Job store trait and its in-memory implementation.
//!
//! Identity allocation lives here: ids start at 1, increase by one per
//! `create` and are never handed out twice, even after `clear_completed`
//! has removed the record.

use std::collections::BTreeMap;

use async_trait::async_trait;
use framecast_core::job::{GenerationParams, Job, JobStats, JobStatus, JobUpdate};
use framecast_core::types::DbId;
use tokio::sync::RwLock;

/// Storage operations for generation jobs.
///
/// `update` performs an atomic read-modify-write of one record and does not
/// check that the status transition is legal; only the generation pipeline
/// is expected to call it.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new `pending` job with a freshly allocated id.
    async fn create(
        &self,
        parameters: GenerationParams,
        source_image_path: String,
        filename: String,
    ) -> Job;

    async fn get(&self, id: DbId) -> Option<Job>;

    /// Merge `update` onto the job. Returns the updated record, or `None`
    /// if the id is unknown.
    async fn update(&self, id: DbId, update: JobUpdate) -> Option<Job>;

    /// All jobs in insertion order.
    async fn list(&self) -> Vec<Job>;

    /// Jobs with the given status, in insertion order.
    async fn list_by_status(&self, status: JobStatus) -> Vec<Job>;

    /// Remove every `completed` job and return how many were removed.
    async fn clear_completed(&self) -> usize;

    /// Counters over the current job set.
    async fn stats(&self) -> JobStats;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Inner {
    next_id: DbId,
    /// Keyed by id; ids are monotonic so key order is insertion order.
    jobs: BTreeMap<DbId, Job>,
}

/// Process-local job store guarded by a single async `RwLock`.
#[derive(Debug)]
pub struct MemJobStore {
    inner: RwLock<Inner>,
}

impl MemJobStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_id: 1,
                jobs: BTreeMap::new(),
            }),
        }
    }
}

impl Default for MemJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for MemJobStore {
    async fn create(
        &self,
        parameters: GenerationParams,
        source_image_path: String,
        filename: String,
    ) -> Job {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;

        let job = Job::new(id, parameters, source_image_path, filename);
        inner.jobs.insert(id, job.clone());

        tracing::debug!(job_id = id, "Job record created");
        job
    }

    async fn get(&self, id: DbId) -> Option<Job> {
        self.inner.read().await.jobs.get(&id).cloned()
    }

    async fn update(&self, id: DbId, update: JobUpdate) -> Option<Job> {
        let mut inner = self.inner.write().await;
        let job = inner.jobs.get_mut(&id)?;
        if job.status.is_terminal() {
            tracing::warn!(job_id = id, status = %job.status, "Updating a job in a terminal state");
        }
        job.apply(update);
        Some(job.clone())
    }

    async fn list(&self) -> Vec<Job> {
        self.inner.read().await.jobs.values().cloned().collect()
    }

    async fn list_by_status(&self, status: JobStatus) -> Vec<Job> {
        self.inner
            .read()
            .await
            .jobs
            .values()
            .filter(|job| job.status == status)
            .cloned()
            .collect()
    }

    async fn clear_completed(&self) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.jobs.len();
        inner
            .jobs
            .retain(|_, job| job.status != JobStatus::Completed);
        let removed = before - inner.jobs.len();

        tracing::info!(removed, "Cleared completed jobs");
        removed
    }

    async fn stats(&self) -> JobStats {
        JobStats::from_jobs(self.inner.read().await.jobs.values())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use framecast_core::job::GenerationMode;

    use super::*;

    fn params(prompt: &str) -> GenerationParams {
        GenerationParams {
            prompt: prompt.to_string(),
            negative_prompt: String::new(),
            duration: 5,
            seed: 42,
            steps: 20,
        }
    }

    async fn create(store: &MemJobStore, prompt: &str) -> Job {
        store
            .create(params(prompt), format!("/tmp/{prompt}.png"), format!("{prompt}.png"))
            .await
    }

    async fn complete(store: &MemJobStore, id: DbId) {
        store
            .update(
                id,
                JobUpdate::completed(format!("/tmp/video_{id}.mp4"), GenerationMode::Real),
            )
            .await
            .expect("job exists");
    }

    #[tokio::test]
    async fn create_allocates_sequential_ids_and_pending_status() {
        let store = MemJobStore::new();
        let a = create(&store, "a").await;
        let b = create(&store, "b").await;

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.status, JobStatus::Pending);
        assert_eq!(a.progress, 0);
        assert_eq!(store.get(1).await.unwrap().parameters.prompt, "a");
    }

    #[tokio::test]
    async fn get_unknown_returns_none() {
        let store = MemJobStore::new();
        assert!(store.get(99).await.is_none());
    }

    #[tokio::test]
    async fn update_unknown_returns_none() {
        let store = MemJobStore::new();
        assert!(store.update(7, JobUpdate::progress(10)).await.is_none());
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let store = MemJobStore::new();
        let job = create(&store, "a").await;

        let updated = store
            .update(job.id, JobUpdate::processing(10))
            .await
            .unwrap();
        assert_eq!(updated.status, JobStatus::Processing);
        assert_eq!(updated.progress, 10);
        assert_eq!(updated.created_at, job.created_at);
        assert_eq!(updated.parameters, job.parameters);
    }

    #[tokio::test]
    async fn list_preserves_insertion_order() {
        let store = MemJobStore::new();
        for p in ["x", "y", "z"] {
            create(&store, p).await;
        }
        let prompts: Vec<_> = store
            .list()
            .await
            .into_iter()
            .map(|j| j.parameters.prompt)
            .collect();
        assert_eq!(prompts, vec!["x", "y", "z"]);
    }

    #[tokio::test]
    async fn list_by_status_filters() {
        let store = MemJobStore::new();
        let a = create(&store, "a").await;
        create(&store, "b").await;
        let c = create(&store, "c").await;
        complete(&store, c.id).await;
        complete(&store, a.id).await;

        let ids: Vec<_> = store
            .list_by_status(JobStatus::Completed)
            .await
            .into_iter()
            .map(|j| j.id)
            .collect();
        assert_eq!(ids, vec![a.id, c.id]);
        assert_eq!(store.list_by_status(JobStatus::Pending).await.len(), 1);
    }

    #[tokio::test]
    async fn clear_completed_removes_all_and_only_completed() {
        let store = MemJobStore::new();
        let a = create(&store, "a").await;
        let b = create(&store, "b").await;
        let c = create(&store, "c").await;
        complete(&store, a.id).await;
        complete(&store, c.id).await;
        store.update(b.id, JobUpdate::failed("boom")).await;

        assert_eq!(store.clear_completed().await, 2);
        assert!(store.get(a.id).await.is_none());
        assert!(store.get(c.id).await.is_none());
        assert_eq!(store.get(b.id).await.unwrap().status, JobStatus::Failed);
        assert_eq!(store.clear_completed().await, 0);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_clear() {
        let store = MemJobStore::new();
        let a = create(&store, "a").await;
        complete(&store, a.id).await;
        store.clear_completed().await;

        let b = create(&store, "b").await;
        assert_eq!(b.id, a.id + 1);
    }

    #[tokio::test]
    async fn stats_reflect_store_contents() {
        let store = MemJobStore::new();
        let a = create(&store, "a").await;
        create(&store, "b").await;
        complete(&store, a.id).await;

        let stats = store.stats().await;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.total_duration_secs, 5);
    }

    #[tokio::test]
    async fn concurrent_updates_on_different_jobs_do_not_interfere() {
        let store = Arc::new(MemJobStore::new());
        let mut ids = Vec::new();
        for i in 0..16 {
            ids.push(create(&store, &format!("p{i}")).await.id);
        }

        let tasks = ids.iter().map(|&id| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for p in [10u8, 30, 50, 80] {
                    store.update(id, JobUpdate::processing(p)).await;
                }
                store
                    .update(
                        id,
                        JobUpdate::completed(format!("/tmp/{id}.mp4"), GenerationMode::Real),
                    )
                    .await;
            })
        });
        for result in futures::future::join_all(tasks).await {
            result.unwrap();
        }

        let completed = store.list_by_status(JobStatus::Completed).await;
        assert_eq!(completed.len(), ids.len());
        for job in completed {
            assert_eq!(job.progress, 100);
            assert_eq!(
                job.output_video_path.as_deref(),
                Some(format!("/tmp/{}.mp4", job.id).as_str())
            );
        }
    }
}
