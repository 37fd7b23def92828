//! Server-Sent Events transport for task progress.

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use futures::StreamExt;

use crate::observers::{watch, EmitMode, ObserverFrame};
use crate::state::AppState;

/// GET /api/tasks/{id}/stream
///
/// One `data:` event per distinct `(status, progress)` pair. The response
/// body ends after the terminal event, or after a single error event when
/// the task does not exist.
pub async fn stream_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    tracing::debug!(task_id = %id, "SSE observer attached");

    let events = watch(
        state.registry.clone(),
        &id,
        state.config.observer_interval,
        EmitMode::OnChange,
    )
    .map(|frame| Ok::<_, Infallible>(to_event(&frame)));

    (
        [("x-accel-buffering", "no")],
        Sse::new(events).keep_alive(KeepAlive::default()),
    )
}

fn to_event(frame: &ObserverFrame) -> Event {
    match Event::default().json_data(frame) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode SSE frame");
            Event::default().data(r#"{"error":"encoding failed"}"#)
        }
    }
}
