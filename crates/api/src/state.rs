use std::sync::Arc;
use std::time::Duration;

use framecast_events::EventBus;
use framecast_framepack::FramepackApi;
use framecast_pipeline::generation::DEFAULT_GENERATOR_PORT;
use framecast_pipeline::{
    GenerationPipeline, JobDispatcher, MergeEngine, PipelineConfig, Transcoder,
};
use framecast_store::{MemJobStore, SharedJobStore};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Job records.
    pub store: SharedJobStore,
    /// Per-job generation tasks.
    pub dispatcher: Arc<JobDispatcher>,
    /// Multi-clip export.
    pub merge_engine: Arc<MergeEngine>,
    /// Framepack client, also used for health probing.
    pub framepack: Arc<FramepackApi>,
    /// Centralized event bus for job lifecycle events.
    pub event_bus: Arc<EventBus>,
}

impl AppState {
    /// Wire the store, pipeline, dispatcher and merge engine together.
    ///
    /// The transcoder is injected so tests can run merges without ffmpeg.
    pub fn new(config: ServerConfig, transcoder: Arc<dyn Transcoder>) -> Self {
        let framepack = Arc::new(
            FramepackApi::new(config.framepack_url.clone())
                .with_probe_timeout(Duration::from_millis(config.probe_timeout_ms)),
        );
        let store: SharedJobStore = Arc::new(MemJobStore::new());
        let event_bus = Arc::new(EventBus::default());

        let pipeline_config = PipelineConfig::new(config.output_dir.clone())
            .with_simulation_step_delay(Duration::from_millis(config.simulation_step_ms))
            .with_generator_port(framepack.port().unwrap_or(DEFAULT_GENERATOR_PORT));
        let pipeline = GenerationPipeline::new(
            Arc::clone(&store),
            framepack.clone(),
            framepack.clone(),
            Arc::clone(&event_bus),
            pipeline_config,
        );
        let dispatcher = Arc::new(JobDispatcher::new(Arc::new(pipeline)));
        let merge_engine = Arc::new(MergeEngine::new(
            Arc::clone(&store),
            transcoder,
            config.merge_dir.clone(),
        ));

        Self {
            config: Arc::new(config),
            store,
            dispatcher,
            merge_engine,
            framepack,
            event_bus,
        }
    }
}
