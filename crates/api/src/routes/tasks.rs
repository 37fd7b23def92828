//! Route definitions for the `/tasks` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::tasks;
use crate::observers::sse;
use crate::state::AppState;
use crate::ws;

/// Routes mounted at `/tasks`.
///
/// ```text
/// GET    /                -> list_tasks
/// POST   /                -> create_task
/// GET    /{id}            -> get_task
/// POST   /{id}/cancel     -> cancel_task
/// GET    /{id}/stream     -> stream_task (SSE)
/// GET    /{id}/progress   -> task_progress_ws (WebSocket)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(tasks::list_tasks).post(tasks::create_task))
        .route("/{id}", get(tasks::get_task))
        .route("/{id}/cancel", post(tasks::cancel_task))
        .route("/{id}/stream", get(sse::stream_task))
        .route("/{id}/progress", get(ws::task_progress_ws))
}
