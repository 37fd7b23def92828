//! WebSocket progress observers.
//!
//! Provides connection tracking and the HTTP upgrade handler for
//! `GET /api/tasks/{id}/progress`.

mod handler;
pub mod manager;

pub use handler::task_progress_ws;
pub use manager::WsManager;
