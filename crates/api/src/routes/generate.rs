//! Route definitions for `/generate`.

use axum::routing::post;
use axum::Router;

use crate::handlers::generate;
use crate::state::AppState;

/// Routes mounted at `/generate`.
///
/// ```text
/// POST   /                -> generate_music
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(generate::generate_music))
}
