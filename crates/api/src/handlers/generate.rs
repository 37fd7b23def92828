//! Handler for `POST /api/generate`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use diffrhythm_core::generation::GenerateRequest;
use diffrhythm_core::types::TaskId;
use diffrhythm_tasks::TaskKind;
use serde::Serialize;

use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub task_id: TaskId,
    pub message: &'static str,
}

/// POST /api/generate
///
/// Validates the request, then registers a `generate` task. Nothing is
/// registered when validation fails.
pub async fn generate_music(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<GenerateResponse>)> {
    let Json(input) = body?;
    let params = input.into_params()?;
    tracing::info!(song_name = %params.song_name, precision = %params.precision, "Generation requested");

    let task_id = state
        .registry
        .create(TaskKind::Generate, params.to_task_params()?);

    Ok((
        StatusCode::CREATED,
        Json(GenerateResponse {
            task_id,
            message: "Generation task created",
        }),
    ))
}
