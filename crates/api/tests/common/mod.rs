#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use framecast_api::config::ServerConfig;
use framecast_api::routes;
use framecast_api::state::AppState;
use framecast_core::ffmpeg::{ConcatJob, FfmpegError};
use framecast_pipeline::Transcoder;

/// Multipart boundary used by [`multipart_body`].
pub const BOUNDARY: &str = "framecast-test-boundary";

/// Transcoder fake: records each request and writes a tiny output file, or
/// fails like a broken ffmpeg run.
#[derive(Default)]
pub struct FakeTranscoder {
    pub fail: bool,
    pub calls: Mutex<Vec<(ConcatJob, String)>>,
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn concat(&self, job: &ConcatJob) -> Result<(), FfmpegError> {
        let list = tokio::fs::read_to_string(&job.list_path).await?;
        self.calls.lock().unwrap().push((job.clone(), list));
        if self.fail {
            return Err(FfmpegError::ExecutionFailed {
                exit_code: Some(1),
                stderr: "concat failed".into(),
            });
        }
        tokio::fs::write(&job.output_path, b"merged-video").await?;
        Ok(())
    }
}

/// A fully wired application over temporary directories.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub transcoder: Arc<FakeTranscoder>,
    pub dir: tempfile::TempDir,
}

impl TestApp {
    pub fn upload_dir(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("videos")
    }

    pub fn merge_dir(&self) -> PathBuf {
        self.dir.path().join("merge")
    }
}

/// A `http://127.0.0.1:<port>` URL nothing is listening on.
fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

/// Build a test `ServerConfig` rooted in `dir`.
///
/// The generator URL points at a closed port so jobs run the demo
/// simulation, with no pacing delay.
pub fn test_config(dir: &std::path::Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        framepack_url: unreachable_url(),
        probe_timeout_ms: 500,
        upload_dir: dir.join("uploads"),
        output_dir: dir.join("videos"),
        merge_dir: dir.join("merge"),
        max_upload_bytes: 1024,
        simulation_step_ms: 0,
        ffmpeg_bin: PathBuf::from("ffmpeg"),
    }
}

pub fn build_test_app() -> TestApp {
    build_test_app_with(FakeTranscoder::default())
}

/// Build the full application router with all middleware layers.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack production uses.
pub fn build_test_app_with(transcoder: FakeTranscoder) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let max_upload_bytes = config.max_upload_bytes;
    let transcoder = Arc::new(transcoder);
    let state = AppState::new(config, transcoder.clone());

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    let router = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes(max_upload_bytes))
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state.clone());

    TestApp {
        router,
        state,
        transcoder,
        dir,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, json: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// One multipart part: `(name, filename+content type for files, bytes)`.
pub struct Part {
    pub name: &'static str,
    pub file: Option<(&'static str, &'static str)>,
    pub data: Vec<u8>,
}

impl Part {
    pub fn text(name: &'static str, value: &str) -> Self {
        Self {
            name,
            file: None,
            data: value.as_bytes().to_vec(),
        }
    }

    pub fn file(
        name: &'static str,
        filename: &'static str,
        content_type: &'static str,
        data: &[u8],
    ) -> Self {
        Self {
            name,
            file: Some((filename, content_type)),
            data: data.to_vec(),
        }
    }
}

pub fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.file {
            Some((filename, content_type)) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n",
                    part.name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name)
                    .as_bytes(),
            ),
        }
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn post_multipart(app: Router, uri: &str, parts: &[Part]) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// A valid submission for `cat.png` with the given prompt.
pub fn submission(prompt: &str) -> Vec<Part> {
    vec![
        Part::file("image", "cat.png", "image/png", b"\x89PNG\r\n\x1a\nfake"),
        Part::text("prompt", prompt),
        Part::text("duration", "5"),
        Part::text("seed", "42"),
        Part::text("steps", "20"),
    ]
}

// ---------------------------------------------------------------------------
// Body helpers
// ---------------------------------------------------------------------------

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
