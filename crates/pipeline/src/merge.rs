//! Concatenation of completed clips into one exported video.
//!
//! The engine snapshots completed jobs in store order, writes a concat
//! demuxer list plus an output placeholder into the merge directory and
//! runs the re-encode through a [`Transcoder`]. Both temporary files belong
//! to the returned [`MergedVideo`] and are removed when it is dropped.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use framecast_core::ffmpeg::{self, ConcatJob, FfmpegError, DEFAULT_FRAME_RATE, MAX_FRAME_RATE};
use framecast_core::job::JobStatus;
use framecast_core::quality::QualityProfile;
use framecast_store::SharedJobStore;
use tempfile::TempPath;

/// Runs a concat + re-encode.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn concat(&self, job: &ConcatJob) -> Result<(), FfmpegError>;
}

/// [`Transcoder`] backed by an `ffmpeg` executable.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn concat(&self, job: &ConcatJob) -> Result<(), FfmpegError> {
        ffmpeg::run_ffmpeg(&self.binary, &job.args()).await
    }
}

/// Why a merge produced no video.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("No completed videos to merge")]
    NoCompletedJobs,

    #[error("Frame rate must be between 1 and 120, got {0}")]
    InvalidFrameRate(u32),

    #[error("Failed to merge videos: {0}")]
    Transcode(#[from] FfmpegError),

    #[error("Failed to prepare merge files: {0}")]
    Io(#[from] std::io::Error),
}

/// A merged export on disk.
///
/// Owns the output file and its concat list; both are deleted on drop.
#[derive(Debug)]
pub struct MergedVideo {
    output: TempPath,
    _list: TempPath,
    pub clip_count: usize,
    pub quality: QualityProfile,
    pub frame_rate: u32,
}

impl MergedVideo {
    pub fn path(&self) -> &Path {
        &self.output
    }
}

/// Builds merged exports from the store's completed jobs.
pub struct MergeEngine {
    store: SharedJobStore,
    transcoder: std::sync::Arc<dyn Transcoder>,
    merge_dir: PathBuf,
}

impl MergeEngine {
    pub fn new(
        store: SharedJobStore,
        transcoder: std::sync::Arc<dyn Transcoder>,
        merge_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            transcoder,
            merge_dir: merge_dir.into(),
        }
    }

    /// Concatenate every currently completed clip, in store order.
    ///
    /// `frame_rate` defaults to 30 and must lie in `1..=120`. Jobs completed
    /// after the snapshot is taken are not included.
    pub async fn merge(
        &self,
        quality: QualityProfile,
        frame_rate: Option<u32>,
    ) -> Result<MergedVideo, MergeError> {
        let inputs: Vec<String> = self
            .store
            .list_by_status(JobStatus::Completed)
            .await
            .into_iter()
            .filter_map(|job| job.output_video_path)
            .collect();
        if inputs.is_empty() {
            return Err(MergeError::NoCompletedJobs);
        }

        let frame_rate = frame_rate.unwrap_or(DEFAULT_FRAME_RATE);
        if !(1..=MAX_FRAME_RATE).contains(&frame_rate) {
            return Err(MergeError::InvalidFrameRate(frame_rate));
        }

        tokio::fs::create_dir_all(&self.merge_dir).await?;
        let list = tempfile::Builder::new()
            .prefix("concat_")
            .suffix(".txt")
            .tempfile_in(&self.merge_dir)?
            .into_temp_path();
        tokio::fs::write(&list, ffmpeg::concat_list(&inputs)).await?;
        let output = tempfile::Builder::new()
            .prefix("merged_")
            .suffix(".mp4")
            .tempfile_in(&self.merge_dir)?
            .into_temp_path();

        let job = ConcatJob {
            list_path: list.to_path_buf(),
            output_path: output.to_path_buf(),
            encoder: quality.encoder_settings(),
            frame_rate,
        };

        tracing::info!(
            clips = inputs.len(),
            quality = %quality,
            frame_rate,
            "Merging completed videos",
        );
        if let Err(e) = self.transcoder.concat(&job).await {
            tracing::error!(error = %e, "Video merge failed");
            return Err(e.into());
        }

        Ok(MergedVideo {
            output,
            _list: list,
            clip_count: inputs.len(),
            quality,
            frame_rate,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
