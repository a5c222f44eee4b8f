//! Per-job generation pipeline.
//!
//! Drives one job from `pending` to a terminal state. The strategy is chosen
//! once per run from the availability probe: a real model invocation when
//! the generator answers, otherwise a paced simulation. Every failure is
//! caught at the job boundary and recorded on the job; nothing propagates to
//! the submitter. The source image is released exactly once on every path.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use framecast_core::job::{GenerationMode, GenerationParams, JobUpdate};
use framecast_core::job_events::{EVENT_JOB_COMPLETED, EVENT_JOB_FAILED, EVENT_JOB_PROGRESS};
use framecast_core::types::DbId;
use framecast_events::{EventBus, JobEvent};
use framecast_framepack::FramepackError;
use framecast_store::SharedJobStore;

use crate::backend::{AvailabilityProber, VideoGenerator};

/// Progress checkpoints of the real invocation path.
const PROGRESS_STARTED: u8 = 10;
const PROGRESS_IMAGE_READ: u8 = 30;
const PROGRESS_INVOKING: u8 = 50;
const PROGRESS_RESPONDED: u8 = 80;

/// Checkpoints reported by the simulation, each followed by a pacing delay.
const SIMULATION_CHECKPOINTS: [u8; 3] = [25, 50, 75];

/// Port named in the demo notice when none can be derived from the URL.
pub const DEFAULT_GENERATOR_PORT: u16 = 7860;

/// Upload name used when the source path has no usable file name.
const FALLBACK_IMAGE_NAME: &str = "image.png";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for [`GenerationPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory generated clips are written to.
    pub output_dir: PathBuf,
    /// Pause after each simulation checkpoint.
    pub simulation_step_delay: Duration,
    /// Explanation attached to jobs completed by the simulation.
    pub demo_notice: String,
}

impl PipelineConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            simulation_step_delay: Duration::from_secs(1),
            demo_notice: demo_notice(DEFAULT_GENERATOR_PORT),
        }
    }

    pub fn with_simulation_step_delay(mut self, delay: Duration) -> Self {
        self.simulation_step_delay = delay;
        self
    }

    pub fn with_generator_port(mut self, port: u16) -> Self {
        self.demo_notice = demo_notice(port);
        self
    }
}

/// Notice recorded on simulated completions.
pub fn demo_notice(port: u16) -> String {
    format!("Demo mode: Connect Framepack AI on port {port} for real video generation")
}

// ---------------------------------------------------------------------------
// Strategy & errors
// ---------------------------------------------------------------------------

/// How a job's clip is produced, decided once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStrategy {
    /// The generator is reachable: call it for real.
    RealInvocation,
    /// The generator is unreachable: simulate progress and complete with a notice.
    Simulation,
}

impl GenerationStrategy {
    pub fn from_availability(available: bool) -> Self {
        if available {
            GenerationStrategy::RealInvocation
        } else {
            GenerationStrategy::Simulation
        }
    }

    pub fn mode(self) -> GenerationMode {
        match self {
            GenerationStrategy::RealInvocation => GenerationMode::Real,
            GenerationStrategy::Simulation => GenerationMode::Simulated,
        }
    }
}

/// Reasons a pipeline run ends in `failed`.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to read source image: {0}")]
    ReadSource(std::io::Error),

    #[error(transparent)]
    Generator(#[from] FramepackError),

    #[error("Failed to store generated video: {0}")]
    StoreOutput(std::io::Error),
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Executes generation jobs against the store, generator and event bus.
pub struct GenerationPipeline {
    store: SharedJobStore,
    generator: Arc<dyn VideoGenerator>,
    prober: Arc<dyn AvailabilityProber>,
    event_bus: Arc<EventBus>,
    config: PipelineConfig,
}

impl GenerationPipeline {
    pub fn new(
        store: SharedJobStore,
        generator: Arc<dyn VideoGenerator>,
        prober: Arc<dyn AvailabilityProber>,
        event_bus: Arc<EventBus>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            generator,
            prober,
            event_bus,
            config,
        }
    }

    /// Run one job to its terminal state.
    ///
    /// Never returns an error: failures are recorded on the job. The source
    /// image is deleted once the run is over, whatever the outcome.
    pub async fn run(&self, job_id: DbId, source_image_path: String, parameters: GenerationParams) {
        let source = PathBuf::from(source_image_path);

        if let Err(e) = self.execute(job_id, &source, &parameters).await {
            tracing::error!(job_id, error = %e, "Generation failed");
            self.transition(job_id, JobUpdate::failed(e.to_string()), EVENT_JOB_FAILED)
                .await;
        }

        release_source(job_id, &source).await;
    }

    async fn execute(
        &self,
        job_id: DbId,
        source: &Path,
        parameters: &GenerationParams,
    ) -> Result<(), PipelineError> {
        self.transition(
            job_id,
            JobUpdate::processing(PROGRESS_STARTED),
            EVENT_JOB_PROGRESS,
        )
        .await;

        let strategy = GenerationStrategy::from_availability(self.prober.probe().await);
        tracing::info!(job_id, strategy = ?strategy, "Generation strategy selected");
        if self
            .store
            .update(job_id, JobUpdate::strategy(strategy.mode()))
            .await
            .is_none()
        {
            tracing::warn!(job_id, "Job disappeared during generation");
        }

        match strategy {
            GenerationStrategy::RealInvocation => {
                self.invoke_generator(job_id, source, parameters, strategy)
                    .await
            }
            GenerationStrategy::Simulation => {
                self.simulate(job_id, strategy).await;
                Ok(())
            }
        }
    }

    async fn invoke_generator(
        &self,
        job_id: DbId,
        source: &Path,
        parameters: &GenerationParams,
        strategy: GenerationStrategy,
    ) -> Result<(), PipelineError> {
        self.report_progress(job_id, PROGRESS_IMAGE_READ).await;
        let image = tokio::fs::read(source)
            .await
            .map_err(PipelineError::ReadSource)?;

        self.report_progress(job_id, PROGRESS_INVOKING).await;
        let filename = source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(FALLBACK_IMAGE_NAME);
        let url = self.generator.generate(image, filename, parameters).await?;

        self.report_progress(job_id, PROGRESS_RESPONDED).await;
        let video = self.generator.download(&url).await?;

        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(PipelineError::StoreOutput)?;
        let output = self.config.output_dir.join(format!(
            "video_{job_id}_{}.mp4",
            chrono::Utc::now().timestamp_millis()
        ));
        tokio::fs::write(&output, &video)
            .await
            .map_err(PipelineError::StoreOutput)?;

        tracing::info!(
            job_id,
            output = %output.display(),
            bytes = video.len(),
            "Generated video stored",
        );
        self.transition(
            job_id,
            JobUpdate::completed(output.to_string_lossy().into_owned(), strategy.mode()),
            EVENT_JOB_COMPLETED,
        )
        .await;
        Ok(())
    }

    async fn simulate(&self, job_id: DbId, strategy: GenerationStrategy) {
        tracing::warn!(job_id, "Generator unavailable, running demo simulation");

        for checkpoint in SIMULATION_CHECKPOINTS {
            self.report_progress(job_id, checkpoint).await;
            tokio::time::sleep(self.config.simulation_step_delay).await;
        }

        let placeholder = self.config.output_dir.join(format!("demo_video_{job_id}.mp4"));
        self.transition(
            job_id,
            JobUpdate::completed(placeholder.to_string_lossy().into_owned(), strategy.mode())
            .with_notice(self.config.demo_notice.clone()),
            EVENT_JOB_COMPLETED,
        )
        .await;
    }

    async fn report_progress(&self, job_id: DbId, progress: u8) {
        tracing::debug!(job_id, progress, "Job progress");
        self.transition(job_id, JobUpdate::progress(progress), EVENT_JOB_PROGRESS)
            .await;
    }

    /// Write an update and announce the resulting job state.
    async fn transition(&self, job_id: DbId, update: JobUpdate, event_type: &str) {
        match self.store.update(job_id, update).await {
            Some(job) => self.event_bus.publish(JobEvent::from_job(event_type, &job)),
            None => tracing::warn!(job_id, event_type, "Job disappeared during generation"),
        }
    }
}

/// Delete the uploaded source image. Failures are logged, never fatal.
async fn release_source(job_id: DbId, source: &Path) {
    match tokio::fs::remove_file(source).await {
        Ok(()) => tracing::debug!(job_id, path = %source.display(), "Source image removed"),
        Err(e) => tracing::warn!(
            job_id,
            path = %source.display(),
            error = %e,
            "Failed to remove source image",
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
