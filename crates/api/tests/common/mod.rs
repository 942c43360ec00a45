use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use veridex_api::config::ServerConfig;
use veridex_api::progress::ProgressStore;
use veridex_api::routes;
use veridex_api::state::AppState;
use veridex_core::catalog;
use veridex_engine::resolver::sanitize_id;
use veridex_engine::{InferenceCache, LinearBackend, LocalRegistryResolver};
use veridex_store::{DataLayout, JobStore};

/// Boundary used by [`multipart_body`].
pub const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

/// A fully wired application over a temp data directory, without the
/// background sweep loops (tests trigger sweeps explicitly).
pub struct TestApp {
    pub app: Router,
    pub store: JobStore,
    pub progress: Arc<ProgressStore>,
    _tmp: TempDir,
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(data_dir: &Path, registry_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        data_dir: data_dir.to_path_buf(),
        model_registry_dir: registry_dir.to_path_buf(),
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
    }
}

/// Build the full application router with all middleware layers over a
/// fresh temp directory.
///
/// This mirrors the router construction in `main.rs` so integration
/// tests exercise the same middleware stack (CORS, request ID, timeout,
/// tracing, panic recovery) that production uses. Every supported base
/// model is seeded into the local registry.
pub fn build_test_app() -> TestApp {
    let tmp = tempfile::tempdir().unwrap();
    let data_dir = tmp.path().join("data");
    let registry_dir = tmp.path().join("registry");

    for (id, _) in catalog::BASE_MODELS {
        let model_dir = registry_dir.join(sanitize_id(id));
        std::fs::create_dir_all(&model_dir).unwrap();
        std::fs::write(model_dir.join("config.json"), b"{}").unwrap();
    }

    let layout = DataLayout::new(&data_dir);
    layout.ensure().unwrap();
    let store = JobStore::new(layout.clone());
    let progress = Arc::new(ProgressStore::new());

    let state = AppState {
        config: Arc::new(test_config(&data_dir, &registry_dir)),
        store: store.clone(),
        cache: Arc::new(InferenceCache::new()),
        backend: Arc::new(LinearBackend),
        resolver: Arc::new(LocalRegistryResolver::new(
            registry_dir,
            layout.base_models_dir(),
        )),
        progress: Arc::clone(&progress),
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
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
        .with_state(state);

    TestApp {
        app,
        store,
        progress,
        _tmp: tmp,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn post_json(app: &Router, uri: &str, json: serde_json::Value) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn post_empty(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn post_multipart(app: &Router, uri: &str, body: Vec<u8>) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(
                    CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("response body should be JSON")
}

// ---------------------------------------------------------------------------
// Payload builders
// ---------------------------------------------------------------------------

/// A multipart body with a `file` part and, optionally, a `config` part.
pub fn multipart_body(csv: &[u8], config: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"dataset.csv\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: text/csv\r\n\r\n");
    body.extend_from_slice(csv);
    body.extend_from_slice(b"\r\n");
    if let Some(config) = config {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"config\"\r\n\r\n");
        body.extend_from_slice(config.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// A balanced, clearly separable training CSV with `rows_per_class`
/// rows of each class.
pub fn sample_csv(rows_per_class: usize) -> Vec<u8> {
    let mut csv = String::from("text,label\n");
    for i in 0..rows_per_class {
        csv.push_str(&format!(
            "an honest genuine sincere statement number {i},truthful\n"
        ));
        csv.push_str(&format!(
            "a fake fraudulent fabricated statement number {i},deceptive\n"
        ));
    }
    csv.into_bytes()
}

/// Poll a job's status endpoint until it leaves the `training` state.
pub async fn wait_for_job(app: &Router, code: &str) -> serde_json::Value {
    for _ in 0..200 {
        let response = get(app, &format!("/api/v1/training/jobs/{code}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        if json["data"]["status"] != "training" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {code} did not finish in time");
}
