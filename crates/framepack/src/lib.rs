//! HTTP client for a Framepack image-to-video server.
//!
//! Framepack is served through Gradio; this crate wraps the Gradio REST
//! protocol (file upload, queued `/call/process` invocation, SSE result
//! stream, file download) using [`reqwest`].

pub mod api;
pub mod protocol;

pub use api::{FramepackApi, FramepackError};
