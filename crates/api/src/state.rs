use std::sync::Arc;

use diffrhythm_tasks::TaskRegistry;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (observer cadence, timeouts).
    pub config: Arc<ServerConfig>,
    /// The task registry. Every handler reads and mutates tasks through it.
    pub registry: Arc<TaskRegistry>,
    /// Active WebSocket progress observers.
    pub ws_manager: Arc<WsManager>,
}
