use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use diffrhythm_core::types::TaskId;
use futures::{SinkExt, StreamExt};

use crate::observers::{watch, EmitMode};
use crate::state::AppState;

/// GET /api/tasks/{id}/progress
///
/// Upgrades to WebSocket and pushes a progress frame on every observer tick
/// until the task is terminal, then closes the socket.
pub async fn task_progress_ws(
    ws: WebSocketUpgrade,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, id, state))
}

/// Drive a single observer connection after upgrade.
///
/// Multiplexes three sources on the current task:
///   1. Frames from the task watcher, forwarded as JSON text.
///   2. Control messages from `WsManager` (Close on shutdown).
///   3. Inbound client messages, only inspected for Close.
async fn handle_socket(socket: WebSocket, raw_id: String, state: AppState) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let task_id: Option<TaskId> = raw_id.parse().ok();

    let mut control = state.ws_manager.add(conn_id.clone(), task_id).await;
    let observers = match task_id {
        Some(id) => state.ws_manager.observers_of(id).await,
        None => 0,
    };
    tracing::info!(
        conn_id = %conn_id,
        task_id = %raw_id,
        observers,
        "WebSocket observer connected"
    );

    let frames = watch(
        state.registry.clone(),
        &raw_id,
        state.config.observer_interval,
        EmitMode::EveryTick,
    );
    let mut frames = Box::pin(frames);
    let (mut sink, mut stream) = socket.split();
    let mut close_sent = false;

    loop {
        tokio::select! {
            frame = frames.next() => {
                let Some(frame) = frame else { break };
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(conn_id = %conn_id, error = %e, "Failed to encode progress frame");
                        break;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    tracing::debug!(conn_id = %conn_id, "WebSocket sink closed");
                    close_sent = true;
                    break;
                }
            }
            msg = control.recv() => {
                match msg {
                    Some(msg @ Message::Close(_)) => {
                        let _ = sink.send(msg).await;
                        close_sent = true;
                        break;
                    }
                    Some(msg) => {
                        if sink.send(msg).await.is_err() {
                            close_sent = true;
                            break;
                        }
                    }
                    None => break,
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None => {
                        close_sent = true;
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                        close_sent = true;
                        break;
                    }
                }
            }
        }
    }

    if !close_sent {
        let _ = sink.send(Message::Close(None)).await;
    }

    // Already gone when shutdown_all cleared the map.
    let connected_secs = state
        .ws_manager
        .remove(&conn_id)
        .await
        .map(|conn| (chrono::Utc::now() - conn.connected_at).num_seconds());
    tracing::info!(conn_id = %conn_id, connected_secs, "WebSocket observer disconnected");
}
