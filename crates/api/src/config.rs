use std::path::PathBuf;
use std::str::FromStr;

use framecast_core::media::DEFAULT_MAX_UPLOAD_BYTES;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds. Merges re-encode synchronously, so
    /// this is generous (default: `300`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight generation tasks (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Base URL of the Framepack Gradio server.
    pub framepack_url: String,
    /// Availability probe timeout in milliseconds (default: `2000`).
    pub probe_timeout_ms: u64,
    /// Where uploaded source images are stored until their job finishes.
    pub upload_dir: PathBuf,
    /// Where generated clips are written.
    pub output_dir: PathBuf,
    /// Scratch directory for merge lists and merged exports.
    pub merge_dir: PathBuf,
    /// Largest accepted source image, in bytes.
    pub max_upload_bytes: usize,
    /// Pause between demo-simulation checkpoints in milliseconds.
    pub simulation_step_ms: u64,
    /// `ffmpeg` executable used for merges.
    pub ffmpeg_bin: PathBuf,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `3000`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `300`                      |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                       |
    /// | `FRAMEPACK_URL`         | `http://127.0.0.1:7860`    |
    /// | `PROBE_TIMEOUT_MS`      | `2000`                     |
    /// | `UPLOAD_DIR`            | `/tmp/uploads`             |
    /// | `OUTPUT_DIR`            | `/tmp/framecast/videos`    |
    /// | `MERGE_DIR`             | `/tmp/framecast/merge`     |
    /// | `MAX_UPLOAD_BYTES`      | `10485760`                 |
    /// | `SIMULATION_STEP_MS`    | `1000`                     |
    /// | `FFMPEG_BIN`            | `ffmpeg`                   |
    ///
    /// Panics on unparseable values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host,
            port: parsed_var("PORT", 3000),
            cors_origins,
            request_timeout_secs: parsed_var("REQUEST_TIMEOUT_SECS", 300),
            shutdown_timeout_secs: parsed_var("SHUTDOWN_TIMEOUT_SECS", 30),
            framepack_url: std::env::var("FRAMEPACK_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:7860".into()),
            probe_timeout_ms: parsed_var("PROBE_TIMEOUT_MS", 2000),
            upload_dir: path_var("UPLOAD_DIR", "/tmp/uploads"),
            output_dir: path_var("OUTPUT_DIR", "/tmp/framecast/videos"),
            merge_dir: path_var("MERGE_DIR", "/tmp/framecast/merge"),
            max_upload_bytes: parsed_var("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            simulation_step_ms: parsed_var("SIMULATION_STEP_MS", 1000),
            ffmpeg_bin: path_var("FFMPEG_BIN", "ffmpeg"),
        }
    }
}

fn parsed_var<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid number, got '{raw}': {e}")),
        Err(_) => default,
    }
}

fn path_var(key: &str, default: &str) -> PathBuf {
    PathBuf::from(std::env::var(key).unwrap_or_else(|_| default.into()))
}
