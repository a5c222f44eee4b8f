//! REST client for the Framepack Gradio HTTP endpoints.
//!
//! Wraps reachability probing, image upload, the queued `process` call and
//! result download using [`reqwest`].

use std::time::Duration;

use framecast_core::job::GenerationParams;

use crate::protocol::{
    extract_output_url, parse_sse_result, CallOutcome, FileData, QueuedCall, PROCESS_ENDPOINT,
};

/// Timeout for the reachability probe when none is configured.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// HTTP client for a single Framepack instance.
#[derive(Debug, Clone)]
pub struct FramepackApi {
    client: reqwest::Client,
    api_url: String,
    probe_timeout: Duration,
}

/// Errors from the Framepack REST layer.
#[derive(Debug, thiserror::Error)]
pub enum FramepackError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Framepack returned a non-2xx status code.
    #[error("Framepack API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The server answered but not in the shape the Gradio protocol promises.
    #[error("Framepack protocol error: {0}")]
    Protocol(String),

    /// Generation finished without producing a usable video reference.
    #[error("Invalid response from Framepack API: no output video")]
    MissingOutput,
}

impl FramepackApi {
    /// Create a new API client for a Framepack instance.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://127.0.0.1:7860`.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Override the reachability probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Port of the configured instance, if the URL is parseable.
    pub fn port(&self) -> Option<u16> {
        reqwest::Url::parse(&self.api_url)
            .ok()
            .and_then(|url| url.port_or_known_default())
    }

    /// Whether the server answers `GET /` with a success status within the
    /// probe timeout. Never errors.
    pub async fn is_available(&self) -> bool {
        match self
            .client
            .get(format!("{}/", self.api_url))
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(api_url = %self.api_url, error = %e, "Framepack probe failed");
                false
            }
        }
    }

    /// Upload image bytes and return the server-side path Gradio assigned.
    ///
    /// Sends `POST /upload` as multipart with a single `files` part.
    pub async fn upload_image(
        &self,
        image: Vec<u8>,
        filename: &str,
    ) -> Result<String, FramepackError> {
        let part = reqwest::multipart::Part::bytes(image).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("files", part);

        let response = self
            .client
            .post(format!("{}/upload", self.api_url))
            .multipart(form)
            .send()
            .await?;

        let paths: Vec<String> = Self::parse_response(response).await?;
        paths
            .into_iter()
            .next()
            .ok_or_else(|| FramepackError::Protocol("upload returned no file paths".into()))
    }

    /// Queue a call to a named endpoint and return its event id.
    ///
    /// Sends `POST /call/{endpoint}` with `{"data": [...]}`.
    pub async fn submit_call(
        &self,
        endpoint: &str,
        data: Vec<serde_json::Value>,
    ) -> Result<String, FramepackError> {
        let response = self
            .client
            .post(format!("{}/call/{endpoint}", self.api_url))
            .json(&serde_json::json!({ "data": data }))
            .send()
            .await?;

        let queued: QueuedCall = Self::parse_response(response).await?;
        Ok(queued.event_id)
    }

    /// Wait for a queued call to finish and return its outputs.
    ///
    /// Reads the `GET /call/{endpoint}/{event_id}` SSE stream to the end.
    pub async fn await_call(
        &self,
        endpoint: &str,
        event_id: &str,
    ) -> Result<serde_json::Value, FramepackError> {
        let response = self
            .client
            .get(format!("{}/call/{endpoint}/{event_id}", self.api_url))
            .send()
            .await?;
        let body = Self::ensure_success(response).await?.text().await?;

        match parse_sse_result(&body) {
            CallOutcome::Complete(outputs) => Ok(outputs),
            CallOutcome::Error(detail) => Err(FramepackError::Protocol(format!(
                "generation failed: {}",
                detail.unwrap_or_else(|| "no details from server".to_string())
            ))),
            CallOutcome::Incomplete => Err(FramepackError::Protocol(
                "result stream ended without a terminal event".into(),
            )),
        }
    }

    /// Run image-to-video generation and return the URL of the produced clip.
    ///
    /// Uploads the image, invokes the `process` endpoint with every
    /// generation parameter and resolves the first output reference.
    pub async fn process(
        &self,
        image: Vec<u8>,
        filename: &str,
        params: &GenerationParams,
    ) -> Result<String, FramepackError> {
        let server_path = self.upload_image(image, filename).await?;
        let image_ref = FileData::new(server_path, Some(filename.to_string()));

        let data = vec![
            serde_json::to_value(&image_ref)
                .map_err(|e| FramepackError::Protocol(e.to_string()))?,
            serde_json::Value::from(params.prompt.as_str()),
            serde_json::Value::from(params.negative_prompt.as_str()),
            serde_json::Value::from(params.duration),
            serde_json::Value::from(params.seed),
            serde_json::Value::from(params.steps),
        ];

        let event_id = self.submit_call(PROCESS_ENDPOINT, data).await?;
        tracing::debug!(event_id = %event_id, "Framepack process call queued");

        let outputs = self.await_call(PROCESS_ENDPOINT, &event_id).await?;
        extract_output_url(&outputs, &self.api_url).ok_or(FramepackError::MissingOutput)
    }

    /// Fetch a generated clip in full.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, FramepackError> {
        let response = self.client.get(url).send().await?;
        let bytes = Self::ensure_success(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    // ---- private helpers ----

    /// Return the response unchanged on success, or an
    /// [`FramepackError::Api`] with status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, FramepackError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(FramepackError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, FramepackError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::{Multipart, Path, State};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    use super::*;

    /// What the stub server saw and how it should answer.
    #[derive(Default)]
    struct Stub {
        uploaded: Mutex<Vec<(String, usize)>>,
        call_data: Mutex<Option<serde_json::Value>>,
        sse_body: Mutex<String>,
    }

    async fn upload(State(stub): State<Arc<Stub>>, mut multipart: Multipart) -> impl IntoResponse {
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.file_name().unwrap_or("").to_string();
            let bytes = field.bytes().await.unwrap();
            stub.uploaded.lock().unwrap().push((name, bytes.len()));
        }
        Json(serde_json::json!(["/tmp/gradio/abc/cat.png"]))
    }

    async fn call(
        State(stub): State<Arc<Stub>>,
        Json(body): Json<serde_json::Value>,
    ) -> impl IntoResponse {
        *stub.call_data.lock().unwrap() = Some(body["data"].clone());
        Json(serde_json::json!({"event_id": "evt-1"}))
    }

    async fn result(State(stub): State<Arc<Stub>>, Path(event_id): Path<String>) -> String {
        assert_eq!(event_id, "evt-1");
        stub.sse_body.lock().unwrap().clone()
    }

    async fn video() -> &'static [u8] {
        b"fake-mp4-bytes"
    }

    async fn start_stub(stub: Arc<Stub>) -> String {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .route("/upload", post(upload))
            .route("/call/process", post(call))
            .route("/call/process/{event_id}", get(result))
            .route("/videos/clip.mp4", get(video))
            .route("/missing.mp4", get(|| async { StatusCode::NOT_FOUND }))
            .with_state(stub);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn params() -> GenerationParams {
        GenerationParams {
            prompt: "a cat walking".into(),
            negative_prompt: "blurry".into(),
            duration: 5,
            seed: 42,
            steps: 20,
        }
    }

    #[tokio::test]
    async fn probe_reports_available_server() {
        let base = start_stub(Arc::new(Stub::default())).await;
        assert!(FramepackApi::new(base).is_available().await);
    }

    #[tokio::test]
    async fn probe_reports_unreachable_server() {
        // Bind then drop to get a port nothing is listening on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = FramepackApi::new(format!("http://{addr}"))
            .with_probe_timeout(Duration::from_millis(200));
        assert!(!api.is_available().await);
    }

    #[tokio::test]
    async fn process_uploads_image_and_resolves_output() {
        let stub = Arc::new(Stub::default());
        let base = start_stub(Arc::clone(&stub)).await;
        *stub.sse_body.lock().unwrap() = format!(
            "event: generating\ndata: null\n\nevent: complete\ndata: [{{\"url\": \"{base}/videos/clip.mp4\"}}]\n\n"
        );

        let api = FramepackApi::new(base.clone());
        let url = api
            .process(vec![1, 2, 3, 4], "cat.png", &params())
            .await
            .unwrap();
        assert_eq!(url, format!("{base}/videos/clip.mp4"));

        assert_eq!(
            stub.uploaded.lock().unwrap().as_slice(),
            &[("cat.png".to_string(), 4)]
        );
        let data = stub.call_data.lock().unwrap().clone().unwrap();
        assert_eq!(data[0]["path"], "/tmp/gradio/abc/cat.png");
        assert_eq!(data[1], "a cat walking");
        assert_eq!(data[2], "blurry");
        assert_eq!(data[3], 5);
        assert_eq!(data[4], 42);
        assert_eq!(data[5], 20);

        let bytes = api.download(&url).await.unwrap();
        assert_eq!(bytes, b"fake-mp4-bytes");
    }

    #[tokio::test]
    async fn process_without_output_is_missing_output() {
        let stub = Arc::new(Stub::default());
        let base = start_stub(Arc::clone(&stub)).await;
        *stub.sse_body.lock().unwrap() = "event: complete\ndata: [null]\n\n".to_string();

        let err = FramepackApi::new(base)
            .process(vec![0], "cat.png", &params())
            .await
            .unwrap_err();
        assert!(matches!(err, FramepackError::MissingOutput));
    }

    #[tokio::test]
    async fn process_error_event_is_protocol_error() {
        let stub = Arc::new(Stub::default());
        let base = start_stub(Arc::clone(&stub)).await;
        *stub.sse_body.lock().unwrap() = "event: error\ndata: null\n\n".to_string();

        let err = FramepackApi::new(base)
            .process(vec![0], "cat.png", &params())
            .await
            .unwrap_err();
        assert!(matches!(err, FramepackError::Protocol(_)));
    }

    #[tokio::test]
    async fn download_non_success_is_api_error() {
        let base = start_stub(Arc::new(Stub::default())).await;
        let err = FramepackApi::new(base.clone())
            .download(&format!("{base}/missing.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, FramepackError::Api { status: 404, .. }));
    }

    #[test]
    fn port_is_read_from_url() {
        assert_eq!(FramepackApi::new("http://127.0.0.1:7860").port(), Some(7860));
        assert_eq!(FramepackApi::new("http://framepack.local").port(), Some(80));
        assert_eq!(FramepackApi::new("not a url").port(), None);
    }

    #[test]
    fn api_url_trailing_slash_is_trimmed() {
        assert_eq!(
            FramepackApi::new("http://127.0.0.1:7860/").api_url(),
            "http://127.0.0.1:7860"
        );
    }
}
