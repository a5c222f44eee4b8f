//! Gradio wire-format helpers: file references, SSE result parsing and
//! output reference resolution.

use serde::{Deserialize, Serialize};

/// Name of the Gradio endpoint that runs image-to-video generation.
pub const PROCESS_ENDPOINT: &str = "process";

/// Gradio `FileData` reference to a file already uploaded to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileData {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orig_name: Option<String>,
    pub meta: FileMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    #[serde(rename = "_type")]
    pub kind: String,
}

impl FileData {
    pub fn new(path: impl Into<String>, orig_name: Option<String>) -> Self {
        Self {
            path: path.into(),
            orig_name,
            meta: FileMeta {
                kind: "gradio.FileData".to_string(),
            },
        }
    }
}

/// Response body of `POST /call/{endpoint}`.
#[derive(Debug, Deserialize)]
pub struct QueuedCall {
    pub event_id: String,
}

/// Outcome of reading a `/call/{endpoint}/{event_id}` SSE stream.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// The `complete` event's data: one JSON value per endpoint output.
    Complete(serde_json::Value),
    /// The server sent an `error` event; carries its data if any.
    Error(Option<String>),
    /// The stream ended without a terminal event.
    Incomplete,
}

/// Parse a Gradio SSE body and return the terminal event.
///
/// Non-terminal events (`generating`, `heartbeat`) are skipped.
pub fn parse_sse_result(body: &str) -> CallOutcome {
    let mut current_event: Option<&str> = None;

    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(name) = line.strip_prefix("event:") {
            current_event = Some(name.trim());
        } else if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            match current_event {
                Some("complete") => {
                    return match serde_json::from_str(data) {
                        Ok(value) => CallOutcome::Complete(value),
                        Err(_) => CallOutcome::Error(Some(format!(
                            "unparseable result payload: {data}"
                        ))),
                    };
                }
                Some("error") => {
                    let detail = (!data.is_empty() && data != "null").then(|| data.to_string());
                    return CallOutcome::Error(detail);
                }
                _ => {}
            }
        } else if line.is_empty() {
            current_event = None;
        }
    }

    CallOutcome::Incomplete
}

/// Find the first usable video reference among an endpoint's outputs.
///
/// Accepts a plain URL string, a server path string, a `FileData`-shaped
/// object (`url` preferred over `path`), or a `{"video": FileData}` wrapper.
/// Paths are turned into `{api_url}/file={path}` download URLs.
pub fn extract_output_url(outputs: &serde_json::Value, api_url: &str) -> Option<String> {
    match outputs {
        serde_json::Value::Array(items) => items.iter().find_map(|v| resolve_reference(v, api_url)),
        other => resolve_reference(other, api_url),
    }
}

fn resolve_reference(value: &serde_json::Value, api_url: &str) -> Option<String> {
    match value {
        serde_json::Value::String(s) if s.starts_with("http://") || s.starts_with("https://") => {
            Some(s.clone())
        }
        serde_json::Value::String(s) if !s.is_empty() => Some(file_url(api_url, s)),
        serde_json::Value::Object(map) => {
            if let Some(url) = map.get("url").and_then(|u| u.as_str()).filter(|u| !u.is_empty()) {
                return Some(url.to_string());
            }
            if let Some(path) = map.get("path").and_then(|p| p.as_str()).filter(|p| !p.is_empty()) {
                return Some(file_url(api_url, path));
            }
            map.get("video").and_then(|v| resolve_reference(v, api_url))
        }
        _ => None,
    }
}

fn file_url(api_url: &str, path: &str) -> String {
    format!("{}/file={path}", api_url.trim_end_matches('/'))
}
