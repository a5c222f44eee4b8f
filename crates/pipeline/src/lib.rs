//! Job execution: the generation pipeline, the per-job task registry and
//! the multi-clip merge engine.

pub mod backend;
pub mod dispatcher;
pub mod generation;
pub mod merge;

pub use backend::{AvailabilityProber, VideoGenerator};
pub use dispatcher::JobDispatcher;
pub use generation::{GenerationPipeline, GenerationStrategy, PipelineConfig, PipelineError};
pub use merge::{FfmpegTranscoder, MergeEngine, MergeError, MergedVideo, Transcoder};
