//! Read-side progress observers.
//!
//! The SSE and WebSocket endpoints are thin transports over [`watch`],
//! which re-reads a task snapshot from the registry once per tick and
//! yields [`ObserverFrame`]s until the task reaches a terminal status.
//! No registry lock is held between reads.

pub mod sse;

use std::sync::Arc;
use std::time::Duration;

use diffrhythm_core::types::TaskId;
use diffrhythm_tasks::{Task, TaskRegistry, TaskStatus};
use futures::Stream;
use serde::Serialize;
use tokio::time::{Interval, MissedTickBehavior};

/// Error text sent when an observed task does not exist.
pub const MSG_TASK_NOT_FOUND: &str = "Task not found";

/// When a tick produces a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitMode {
    /// Emit only when `status` or `progress` differs from the last frame.
    OnChange,
    /// Emit on every tick.
    EveryTick,
}

/// Progress payload shared by both streaming transports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub progress: f64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Task> for ProgressUpdate {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id,
            status: task.status,
            progress: task.progress,
            message: task.message.clone(),
            output_path: task.output_path(),
            error: task.error.clone(),
        }
    }
}

/// One message on an observer stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ObserverFrame {
    Progress(ProgressUpdate),
    /// The task does not exist (or was evicted). Always the last frame.
    Error { task_id: String, error: String },
}

impl ObserverFrame {
    fn not_found(raw_id: &str) -> Self {
        ObserverFrame::Error {
            task_id: raw_id.to_string(),
            error: MSG_TASK_NOT_FOUND.to_string(),
        }
    }
}

struct WatchState {
    registry: Arc<TaskRegistry>,
    task_id: Option<TaskId>,
    raw_id: String,
    ticker: Interval,
    mode: EmitMode,
    last: Option<(TaskStatus, f64)>,
    done: bool,
}

/// Observe the task identified by `raw_id`, reading once per `interval`.
///
/// The first read happens immediately. The stream ends right after the
/// frame carrying a terminal status, or after a single error frame when the
/// id is malformed or unknown.
pub fn watch(
    registry: Arc<TaskRegistry>,
    raw_id: &str,
    interval: Duration,
    mode: EmitMode,
) -> impl Stream<Item = ObserverFrame> + Send + 'static {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let state = WatchState {
        registry,
        task_id: raw_id.parse().ok(),
        raw_id: raw_id.to_string(),
        ticker,
        mode,
        last: None,
        done: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if st.done {
                return None;
            }
            st.ticker.tick().await;

            let Some(task) = st.task_id.and_then(|id| st.registry.get(id)) else {
                st.done = true;
                let frame = ObserverFrame::not_found(&st.raw_id);
                return Some((frame, st));
            };

            let key = (task.status, task.progress);
            if st.mode == EmitMode::OnChange && st.last == Some(key) {
                continue;
            }
            st.last = Some(key);
            st.done = task.status.is_terminal();
            return Some((ObserverFrame::Progress(ProgressUpdate::from(&task)), st));
        }
    })
}
