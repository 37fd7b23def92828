//! Task execution supervisor.
//!
//! Each task runs as two tokio tasks: a supervisor that owns the state
//! transitions, and the work itself. Keeping the work in its own task means
//! a panic inside the inference collaborator surfaces as a [`JoinError`]
//! the supervisor turns into a `failed` task instead of tearing anything
//! down.
//!
//! Cancellation is cooperative. The supervisor never aborts the work; it
//! waits for the work to notice the flag (or finish on its own) and then
//! releases the task's handle. Results arriving after the task was
//! cancelled are dropped.

use std::any::Any;
use std::sync::Arc;

use diffrhythm_core::generation::GenerationParams;
use diffrhythm_core::inference::{GenerationOutput, InferenceError, ProgressSink};
use diffrhythm_core::types::{TaskId, TaskParams};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::progress::TaskProgress;
use crate::registry::TaskRegistry;
use crate::task::TaskKind;

/// Message stored on a task when its work succeeds.
pub const MSG_GENERATION_COMPLETED: &str = "Generation completed";

/// Spawn the supervisor for a freshly created task.
pub(crate) fn spawn(
    registry: Arc<TaskRegistry>,
    id: TaskId,
    kind: TaskKind,
    params: TaskParams,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        run(&registry, id, kind, params, cancel).await;
        registry.release(id);
    });
}

async fn run(
    registry: &Arc<TaskRegistry>,
    id: TaskId,
    kind: TaskKind,
    params: TaskParams,
    cancel: CancellationToken,
) {
    if !registry.mark_running(id, format!("Starting {kind} task...")) {
        tracing::info!(task_id = %id, "Task cancelled before it started");
        return;
    }
    tracing::info!(task_id = %id, task_type = %kind, "Task started");

    let sink: Arc<dyn ProgressSink> =
        Arc::new(TaskProgress::new(Arc::clone(registry), id, cancel));

    let outcome = match kind {
        TaskKind::Generate => match GenerationParams::from_task_params(&params) {
            Ok(params) => {
                let backend = registry.backend();
                let work = tokio::spawn(async move { backend.generate(params, sink).await });
                join_outcome(work.await)
            }
            Err(e) => Err(InferenceError::InvalidParams(e.to_string())),
        },
    };

    settle(registry, id, outcome);
}

/// Flatten the work's join result into a single outcome.
fn join_outcome(
    joined: Result<Result<GenerationOutput, InferenceError>, JoinError>,
) -> Result<GenerationOutput, InferenceError> {
    match joined {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => Err(InferenceError::Generation(format!(
            "panic: {}",
            panic_message(e.into_panic())
        ))),
        Err(_) => Err(InferenceError::Cancelled),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Write the final outcome into the registry.
///
/// A `false` from the registry means the task already reached a terminal
/// status (an explicit cancel won the race), so the outcome is dropped.
fn settle(registry: &TaskRegistry, id: TaskId, outcome: Result<GenerationOutput, InferenceError>) {
    match outcome {
        Ok(output) => {
            let output_path = output.output_path.display().to_string();
            if registry.complete(id, output, MSG_GENERATION_COMPLETED.to_string()) {
                tracing::info!(task_id = %id, output_path = %output_path, "Task completed");
            } else {
                tracing::debug!(
                    task_id = %id,
                    output_path = %output_path,
                    "Discarding result of task that is no longer running",
                );
            }
        }
        Err(InferenceError::Cancelled) => {
            if registry.settle_cancelled(id) {
                tracing::info!(task_id = %id, "Task cancelled at checkpoint");
            } else {
                tracing::debug!(task_id = %id, "Work stopped after cancellation");
            }
        }
        Err(e) => {
            if registry.fail(id, e.to_string()) {
                tracing::error!(task_id = %id, error = %e, "Task failed");
            } else {
                tracing::debug!(
                    task_id = %id,
                    error = %e,
                    "Discarding failure of task that is no longer running",
                );
            }
        }
    }
}
