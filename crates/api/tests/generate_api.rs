//! Integration tests for `POST /api/generate`.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{body_json, post_json, wait_terminal, InstantBackend};
use serde_json::json;

// ---------------------------------------------------------------------------
// Test: a valid request creates a generate task with normalized params
// ---------------------------------------------------------------------------

#[tokio::test]
async fn valid_request_creates_task() {
    let (app, state) = common::build_test_app(Arc::new(InstantBackend));

    let response = post_json(
        app.clone(),
        "/api/generate",
        json!({
            "song_name": "morning",
            "lyrics": "  [00:01.00] hello  ",
            "style_prompt": "warm acoustic folk",
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Generation task created");
    let id = json["task_id"].as_str().unwrap().to_string();

    let task = state.registry.get(id.parse().unwrap()).unwrap();
    assert_eq!(task.params["lyrics"], "[00:01.00] hello");
    assert_eq!(task.params["precision"], "fp16");
    assert_eq!(task.params["batch_size"], 1);
    assert_eq!(task.params["max_duration"], 300);

    let json = wait_terminal(&app, &id).await;
    assert_eq!(json["status"], "completed");
    assert_eq!(json["result"]["output_path"], "out/morning_1234.mp3");
}

#[tokio::test]
async fn style_audio_file_satisfies_style_requirement() {
    let (app, _state) = common::build_test_app(Arc::new(InstantBackend));
    let audio = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();

    let response = post_json(
        app,
        "/api/generate",
        json!({
            "song_name": "ref",
            "lyrics": "hello",
            "style_audio_path": audio.path().to_str().unwrap(),
            "precision": "fp32",
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
}

// ---------------------------------------------------------------------------
// Test: invalid requests are rejected before any task exists
// ---------------------------------------------------------------------------

async fn assert_rejected(body: serde_json::Value) -> serde_json::Value {
    let (app, state) = common::build_test_app(Arc::new(InstantBackend));

    let response = post_json(app, "/api/generate", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(state.registry.is_empty(), "no task may be created");
    json
}

#[tokio::test]
async fn missing_style_is_rejected() {
    let json = assert_rejected(json!({"song_name": "x", "lyrics": "hello"})).await;
    assert_eq!(json["error"], "Either style_prompt or style_audio_path is required");
}

#[tokio::test]
async fn blank_lyrics_are_rejected() {
    let json = assert_rejected(json!({"song_name": "x", "lyrics": "   ", "style_prompt": "pop"})).await;
    assert_eq!(json["error"], "Lyrics cannot be empty");
}

#[tokio::test]
async fn out_of_range_fields_are_rejected() {
    assert_rejected(json!({"song_name": "x", "lyrics": "a", "style_prompt": "pop", "batch_size": 9})).await;
    assert_rejected(json!({"song_name": "", "lyrics": "a", "style_prompt": "pop"})).await;
    assert_rejected(json!({"song_name": "x".repeat(201), "lyrics": "a", "style_prompt": "pop"})).await;
    assert_rejected(json!({"song_name": "x", "lyrics": "a", "style_prompt": "p".repeat(501)})).await;
}

#[tokio::test]
async fn unknown_precision_is_rejected() {
    assert_rejected(json!({"song_name": "x", "lyrics": "a", "style_prompt": "pop", "precision": "fp64"})).await;
}

#[tokio::test]
async fn missing_or_unsupported_style_audio_is_rejected() {
    let json = assert_rejected(json!({
        "song_name": "x",
        "lyrics": "a",
        "style_audio_path": "/definitely/not/here.wav",
    }))
    .await;
    assert!(json["error"].as_str().unwrap().starts_with("Audio file not found"));

    let text = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    let json = assert_rejected(json!({
        "song_name": "x",
        "lyrics": "a",
        "style_audio_path": text.path().to_str().unwrap(),
    }))
    .await;
    assert!(json["error"].as_str().unwrap().starts_with("Unsupported audio format"));
}
