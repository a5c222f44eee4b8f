//! FFmpeg concat/re-encode command utilities.
//!
//! The merge engine builds a concat demuxer list plus an argument vector
//! here and hands both to a transcoder; keeping the argument construction
//! pure lets tests assert on the exact command without an ffmpeg binary.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::quality::EncoderSettings;

/// Default frame rate for merged exports.
pub const DEFAULT_FRAME_RATE: u32 = 30;
/// Highest accepted export frame rate.
pub const MAX_FRAME_RATE: u32 = 120;

/// Video codec used for merged exports.
const VIDEO_CODEC: &str = "libx264";

/// Error type for FFmpeg operations.
#[derive(Debug, thiserror::Error)]
pub enum FfmpegError {
    #[error("ffmpeg binary could not be started: {0}")]
    NotFound(std::io::Error),

    #[error("ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Concat request
// ---------------------------------------------------------------------------

/// A fully resolved concat + re-encode invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatJob {
    /// Concat demuxer list file (`file '<path>'` per line).
    pub list_path: PathBuf,
    /// Destination file; overwritten if present.
    pub output_path: PathBuf,
    pub encoder: EncoderSettings,
    pub frame_rate: u32,
}

impl ConcatJob {
    /// Argument vector for `ffmpeg`, excluding the binary itself.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-f", "concat", "-safe", "0", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(self.list_path.clone().into_os_string());
        args.extend(
            [
                "-c:v".to_string(),
                VIDEO_CODEC.to_string(),
                "-preset".to_string(),
                self.encoder.preset.to_string(),
                "-crf".to_string(),
                self.encoder.crf.to_string(),
                "-r".to_string(),
                self.frame_rate.to_string(),
                "-y".to_string(),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(self.output_path.clone().into_os_string());
        args
    }
}

/// Render a concat demuxer list for the given inputs, preserving order.
///
/// Single quotes inside paths are escaped as `'\''` per the demuxer's
/// quoting rules.
pub fn concat_list<P: AsRef<Path>>(inputs: &[P]) -> String {
    inputs
        .iter()
        .map(|p| {
            let escaped = p.as_ref().to_string_lossy().replace('\'', r"'\''");
            format!("file '{escaped}'")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Run the given ffmpeg binary with `args`, mapping a non-zero exit to
/// [`FfmpegError::ExecutionFailed`].
pub async fn run_ffmpeg(binary: &Path, args: &[OsString]) -> Result<(), FfmpegError> {
    let output = tokio::process::Command::new(binary)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: tail(&String::from_utf8_lossy(&output.stderr), 2000),
        });
    }

    Ok(())
}

/// Keep the last `max` bytes of ffmpeg's stderr; the banner is noise.
fn tail(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}
