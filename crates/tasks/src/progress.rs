use std::sync::Arc;

use diffrhythm_core::inference::{Cancelled, ProgressSink};
use diffrhythm_core::types::TaskId;
use tokio_util::sync::CancellationToken;

use crate::registry::TaskRegistry;

/// Progress sink bound to one task.
///
/// Reports go straight into the registry (an in-memory write plus a debug
/// log line). Once the task's token is cancelled every report returns
/// [`Cancelled`] without touching the registry.
pub struct TaskProgress {
    registry: Arc<TaskRegistry>,
    task_id: TaskId,
    cancel: CancellationToken,
}

impl TaskProgress {
    pub(crate) fn new(registry: Arc<TaskRegistry>, task_id: TaskId, cancel: CancellationToken) -> Self {
        Self {
            registry,
            task_id,
            cancel,
        }
    }
}

impl ProgressSink for TaskProgress {
    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn report(&self, fraction: f64, message: &str) -> Result<(), Cancelled> {
        self.checkpoint()?;
        self.registry
            .update_progress(self.task_id, fraction, Some(message));
        Ok(())
    }
}
