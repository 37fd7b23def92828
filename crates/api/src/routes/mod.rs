pub mod generate;
pub mod health;
pub mod tasks;

use axum::routing::get;
use axum::Router;

use crate::routes::health::{health_check, version};
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /health                          alias of the root health check
/// /version                         API version
///
/// /generate                        create a validated generation task (POST)
///
/// /tasks                           list (GET), create (POST)
/// /tasks/{id}                      snapshot (GET)
/// /tasks/{id}/cancel               cancel (POST)
/// /tasks/{id}/stream               Server-Sent Events progress stream
/// /tasks/{id}/progress             WebSocket progress stream
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/version", get(version))
        .nest("/generate", generate::router())
        .nest("/tasks", tasks::router())
}
