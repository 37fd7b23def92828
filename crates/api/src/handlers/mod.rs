pub mod generate;
pub mod tasks;

use diffrhythm_core::error::CoreError;
use diffrhythm_core::types::TaskId;

/// Parse a task id from a path segment.
///
/// A malformed id can never name an existing task, so it is reported as
/// not found rather than as a bad request.
pub(crate) fn parse_task_id(raw: &str) -> Result<TaskId, CoreError> {
    raw.parse().map_err(|_| CoreError::NotFound {
        entity: "Task",
        id: raw.to_string(),
    })
}
