//! In-memory task registry.
//!
//! [`TaskRegistry`] is the single owner of task state. Tasks live in an
//! insertion-ordered map behind a `parking_lot::RwLock`; every read hands
//! out a clone, and every write is one short critical section, so readers
//! always see either the whole previous state or the whole next one.
//!
//! A parallel map holds one [`CancellationToken`] per in-flight execution.
//! Tokens are only ever used to signal cooperative cancellation; task state
//! lives exclusively in the task map.

use std::collections::HashMap;
use std::sync::Arc;

use diffrhythm_core::inference::{GenerationOutput, InferenceBackend};
use diffrhythm_core::types::{TaskId, TaskParams, Timestamp};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::executor;
use crate::task::{Task, TaskKind, TaskStatus, TaskSummary};

/// Message stored on a task when it is cancelled.
pub const MSG_TASK_CANCELLED: &str = "Task cancelled";

/// Owns every task and its execution handle.
///
/// Construct once at the composition root and share via `Arc`.
pub struct TaskRegistry {
    tasks: RwLock<IndexMap<TaskId, Task>>,
    handles: Mutex<HashMap<TaskId, CancellationToken>>,
    backend: Arc<dyn InferenceBackend>,
}

impl TaskRegistry {
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self {
            tasks: RwLock::new(IndexMap::new()),
            handles: Mutex::new(HashMap::new()),
            backend,
        }
    }

    // ---- public operations ----

    /// Register a new `pending` task and dispatch its execution.
    ///
    /// Returns as soon as the work is spawned; the task is already
    /// queryable when the id is returned. Must be called from within a
    /// tokio runtime.
    pub fn create(self: &Arc<Self>, kind: TaskKind, params: TaskParams) -> TaskId {
        let id = TaskId::new_v4();
        let cancel = CancellationToken::new();

        self.tasks
            .write()
            .insert(id, Task::new(id, kind, params.clone()));
        self.handles.lock().insert(id, cancel.clone());

        tracing::info!(task_id = %id, task_type = %kind, "Task created");

        executor::spawn(Arc::clone(self), id, kind, params, cancel);
        id
    }

    /// Snapshot of a single task.
    pub fn get(&self, id: TaskId) -> Option<Task> {
        self.tasks.read().get(&id).cloned()
    }

    /// Summaries of all tasks in insertion order, optionally filtered by
    /// status.
    pub fn list(&self, status: Option<TaskStatus>) -> Vec<TaskSummary> {
        self.tasks
            .read()
            .values()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .map(Task::summary)
            .collect()
    }

    /// Cancel a pending or running task.
    ///
    /// The status flips to `cancelled` immediately. A running task's work
    /// only notices at its next progress checkpoint; whatever it produces
    /// afterwards is discarded. Returns `false` for unknown or already
    /// terminal tasks.
    pub fn cancel(&self, id: TaskId) -> bool {
        let previous = {
            let mut tasks = self.tasks.write();
            let Some(task) = tasks.get_mut(&id) else {
                return false;
            };
            let previous = task.status;
            if !task.cancel(MSG_TASK_CANCELLED.to_string()) {
                return false;
            }
            previous
        };

        if let Some(token) = self.handles.lock().get(&id) {
            token.cancel();
        }

        tracing::info!(task_id = %id, previous_status = %previous, "Task cancelled");
        true
    }

    /// Record progress reported by running work.
    ///
    /// Ignored for unknown or terminal tasks. Progress is clamped to
    /// `0.0..=1.0` and never decreases.
    pub fn update_progress(&self, id: TaskId, progress: f64, message: Option<&str>) -> bool {
        let updated = match self.tasks.write().get_mut(&id) {
            Some(task) => task.record_progress(progress, message),
            None => false,
        };

        if updated {
            tracing::debug!(
                task_id = %id,
                progress_pct = (progress.clamp(0.0, 1.0) * 100.0) as u32,
                message = message.unwrap_or("Processing..."),
                "Task progress",
            );
        }
        updated
    }

    // ---- bookkeeping ----

    /// Number of tasks in the registry.
    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }

    /// Number of tasks that are pending or running.
    pub fn active_count(&self) -> usize {
        self.tasks
            .read()
            .values()
            .filter(|t| !t.status.is_terminal())
            .count()
    }

    /// Cancel every non-terminal task. Used during shutdown.
    pub fn cancel_all(&self) -> usize {
        let ids: Vec<TaskId> = self
            .tasks
            .read()
            .values()
            .filter(|t| !t.status.is_terminal())
            .map(|t| t.id)
            .collect();

        ids.into_iter().filter(|id| self.cancel(*id)).count()
    }

    /// Drop terminal tasks last updated before `cutoff`.
    ///
    /// Pending and running tasks are always kept. Returns the number of
    /// tasks removed.
    pub fn purge_terminal_before(&self, cutoff: Timestamp) -> usize {
        let mut tasks = self.tasks.write();
        let before = tasks.len();
        tasks.retain(|_, t| !(t.status.is_terminal() && t.updated_at < cutoff));
        before - tasks.len()
    }

    // ---- executor-facing transitions ----

    pub(crate) fn backend(&self) -> Arc<dyn InferenceBackend> {
        Arc::clone(&self.backend)
    }

    pub(crate) fn mark_running(&self, id: TaskId, message: String) -> bool {
        match self.tasks.write().get_mut(&id) {
            Some(task) => task.start(message),
            None => false,
        }
    }

    pub(crate) fn complete(&self, id: TaskId, output: GenerationOutput, message: String) -> bool {
        match self.tasks.write().get_mut(&id) {
            Some(task) => task.complete(output, message),
            None => false,
        }
    }

    pub(crate) fn fail(&self, id: TaskId, error: String) -> bool {
        match self.tasks.write().get_mut(&id) {
            Some(task) => task.fail(error),
            None => false,
        }
    }

    /// Work observed its cancellation flag on its own.
    pub(crate) fn settle_cancelled(&self, id: TaskId) -> bool {
        match self.tasks.write().get_mut(&id) {
            Some(task) => task.cancel(MSG_TASK_CANCELLED.to_string()),
            None => false,
        }
    }

    /// Forget the execution handle once the work has finished.
    pub(crate) fn release(&self, id: TaskId) {
        self.handles.lock().remove(&id);
    }

    /// Number of executions still holding a handle.
    pub fn in_flight(&self) -> usize {
        self.handles.lock().len()
    }
}
