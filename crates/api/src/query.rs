//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Query parameters for `GET /tasks` (`?status=`).
///
/// The status is kept as a raw string and parsed in the handler so an
/// unknown value yields the standard JSON validation error.
#[derive(Debug, Default, Deserialize)]
pub struct TaskListParams {
    pub status: Option<String>,
}
