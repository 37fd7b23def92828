//! Handlers for the `/tasks` resource.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use diffrhythm_core::error::CoreError;
use diffrhythm_core::generation::GenerationParams;
use diffrhythm_core::types::{TaskId, TaskParams};
use diffrhythm_tasks::registry::MSG_TASK_CANCELLED;
use diffrhythm_tasks::{Task, TaskKind, TaskStatus, TaskSummary};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::parse_task_id;
use crate::query::TaskListParams;
use crate::state::AppState;

/// Body of `POST /api/tasks`.
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub task_type: String,
    #[serde(default)]
    pub params: TaskParams,
}

#[derive(Debug, Serialize)]
pub struct CreateTaskResponse {
    pub task_id: TaskId,
}

#[derive(Debug, Serialize)]
pub struct CancelTaskResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/tasks
///
/// Rejects unknown task types and params that cannot be decoded for the
/// type before anything is registered.
pub async fn create_task(
    State(state): State<AppState>,
    body: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CreateTaskResponse>)> {
    let Json(input) = body?;
    let kind: TaskKind = input.task_type.parse()?;
    match kind {
        TaskKind::Generate => {
            GenerationParams::from_task_params(&input.params)?;
        }
    }

    let task_id = state.registry.create(kind, input.params);
    Ok((StatusCode::CREATED, Json(CreateTaskResponse { task_id })))
}

/// GET /api/tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Task>> {
    let task_id = parse_task_id(&id)?;
    let task = state.registry.get(task_id).ok_or(CoreError::NotFound {
        entity: "Task",
        id,
    })?;
    Ok(Json(task))
}

/// GET /api/tasks?status=
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<TaskListParams>,
) -> AppResult<Json<Vec<TaskSummary>>> {
    let status = params
        .status
        .as_deref()
        .map(str::parse::<TaskStatus>)
        .transpose()?;
    Ok(Json(state.registry.list(status)))
}

/// POST /api/tasks/{id}/cancel
///
/// 404 for an unknown task, 400 when the task already finished.
pub async fn cancel_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<CancelTaskResponse>> {
    let task_id = parse_task_id(&id)?;
    let task = state.registry.get(task_id).ok_or(CoreError::NotFound {
        entity: "Task",
        id,
    })?;

    if !state.registry.cancel(task_id) {
        return Err(AppError::BadRequest(format!(
            "Task cannot be cancelled (status: {})",
            state
                .registry
                .get(task_id)
                .map_or(task.status, |current| current.status)
        )));
    }

    Ok(Json(CancelTaskResponse {
        success: true,
        message: MSG_TASK_CANCELLED.to_string(),
    }))
}
