#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use diffrhythm_core::generation::GenerationParams;
use diffrhythm_core::inference::{GenerationOutput, InferenceBackend, InferenceError, ProgressSink};
use diffrhythm_tasks::TaskRegistry;
use http_body_util::BodyExt;
use tokio::sync::{Notify, Semaphore};
use tower::ServiceExt;

use diffrhythm_api::config::ServerConfig;
use diffrhythm_api::router::build_app_router;
use diffrhythm_api::state::AppState;
use diffrhythm_api::ws::WsManager;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a short observer interval so streaming tests finish quickly.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        observer_interval: Duration::from_millis(20),
        task_retention_hours: None,
    }
}

/// Application state around a fresh registry driven by `backend`.
pub fn test_state(backend: Arc<dyn InferenceBackend>) -> AppState {
    AppState {
        config: Arc::new(test_config()),
        registry: Arc::new(TaskRegistry::new(backend)),
        ws_manager: Arc::new(WsManager::new()),
    }
}

/// Build the full application router with all middleware layers.
///
/// Goes through the same `build_app_router` as `main.rs`, so integration
/// tests exercise the production middleware stack. The state is returned
/// alongside so tests can inspect the registry directly.
pub fn build_test_app(backend: Arc<dyn InferenceBackend>) -> (Router, AppState) {
    let state = test_state(backend);
    let app = build_app_router(state.clone(), &state.config);
    (app, state)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_empty(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Poll `GET /api/tasks/{id}` until its status is terminal.
pub async fn wait_terminal(app: &Router, task_id: &str) -> serde_json::Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let json = body_json(get(app.clone(), &format!("/api/tasks/{task_id}")).await).await;
            if matches!(
                json["status"].as_str(),
                Some("completed" | "failed" | "cancelled")
            ) {
                return json;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("task did not reach a terminal status")
}

// ---------------------------------------------------------------------------
// Test backends
// ---------------------------------------------------------------------------

fn output_for(params: &GenerationParams) -> GenerationOutput {
    GenerationOutput {
        output_path: format!("out/{}_1234.mp3", params.song_name).into(),
        song_name: params.song_name.clone(),
        message: "Music generated successfully".into(),
    }
}

/// Completes immediately without reporting progress.
pub struct InstantBackend;

#[async_trait::async_trait]
impl InferenceBackend for InstantBackend {
    async fn generate(
        &self,
        params: GenerationParams,
        _progress: Arc<dyn ProgressSink>,
    ) -> Result<GenerationOutput, InferenceError> {
        Ok(output_for(&params))
    }
}

/// Reports each entry of `steps` only after the test releases a permit,
/// then needs one more permit to finish.
///
/// `started` is notified once the work is running, so tests can attach
/// observers at a known state.
pub struct StepBackend {
    pub steps: Vec<f64>,
    pub permits: Semaphore,
    pub started: Notify,
}

impl StepBackend {
    pub fn new(steps: Vec<f64>) -> Arc<Self> {
        Arc::new(Self {
            steps,
            permits: Semaphore::new(0),
            started: Notify::new(),
        })
    }

    /// Let the work advance one step.
    pub fn advance(&self) {
        self.permits.add_permits(1);
    }

    /// Let the work run to completion.
    pub fn finish(&self) {
        self.permits.add_permits(self.steps.len() + 1);
    }
}

#[async_trait::async_trait]
impl InferenceBackend for StepBackend {
    async fn generate(
        &self,
        params: GenerationParams,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<GenerationOutput, InferenceError> {
        self.started.notify_one();
        for (i, step) in self.steps.iter().enumerate() {
            self.permits
                .acquire()
                .await
                .map_err(|e| InferenceError::Generation(e.to_string()))?
                .forget();
            progress.report(*step, &format!("step {}", i + 1))?;
        }
        self.permits
            .acquire()
            .await
            .map_err(|e| InferenceError::Generation(e.to_string()))?
            .forget();
        progress.checkpoint()?;
        Ok(output_for(&params))
    }
}

/// Always fails with the given message.
pub struct FailingBackend(pub &'static str);

#[async_trait::async_trait]
impl InferenceBackend for FailingBackend {
    async fn generate(
        &self,
        _params: GenerationParams,
        _progress: Arc<dyn ProgressSink>,
    ) -> Result<GenerationOutput, InferenceError> {
        Err(InferenceError::Generation(self.0.to_string()))
    }
}
