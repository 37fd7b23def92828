use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use diffrhythm_inference::{InferenceConfig, InferenceService};
use diffrhythm_tasks::TaskRegistry;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use diffrhythm_api::background;
use diffrhythm_api::config::ServerConfig;
use diffrhythm_api::router::build_app_router;
use diffrhythm_api::state::AppState;
use diffrhythm_api::ws::WsManager;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "diffrhythm_api=debug,diffrhythm_tasks=debug,diffrhythm_inference=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let inference_config = InferenceConfig::from_env();
    tracing::info!(
        output_dir = %inference_config.output_dir.display(),
        device = ?inference_config.device,
        gpu_available = inference_config.hardware.gpu_available,
        "Loaded inference configuration"
    );

    // --- Inference service + task registry ---
    let inference = Arc::new(InferenceService::new(inference_config));
    let registry = Arc::new(TaskRegistry::new(inference.clone()));

    // --- WebSocket manager ---
    let ws_manager = Arc::new(WsManager::new());

    // --- Retention sweep (opt-in) ---
    let retention_cancel = CancellationToken::new();
    let retention_handle = config.task_retention_hours.map(|hours| {
        tokio::spawn(background::task_retention::run(
            Arc::clone(&registry),
            hours,
            retention_cancel.clone(),
        ))
    });

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        registry: Arc::clone(&registry),
        ws_manager: Arc::clone(&ws_manager),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    retention_cancel.cancel();
    if let Some(handle) = retention_handle {
        let _ = tokio::time::timeout(shutdown_timeout, handle).await;
        tracing::info!("Task retention job stopped");
    }

    let cancelled = registry.cancel_all();
    tracing::info!(cancelled, "Signalled in-flight tasks to stop");

    let wait_for_tasks = async {
        while registry.in_flight() > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    };
    if tokio::time::timeout(shutdown_timeout, wait_for_tasks).await.is_err() {
        tracing::warn!(
            in_flight = registry.in_flight(),
            "Tasks still running at shutdown timeout"
        );
    }

    if inference.unload_model().await.is_none() {
        tracing::debug!("No model was loaded");
    }
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
