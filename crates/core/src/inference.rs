//! Contract between the task executor and the inference collaborator.
//!
//! The executor owns a [`ProgressSink`] per task and hands it to an
//! [`InferenceBackend`]. The backend reports progress through the sink at
//! safe checkpoints; a report made after the task was cancelled returns
//! [`Cancelled`], which the backend propagates with `?`.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::generation::GenerationParams;

/// Signal returned from a progress checkpoint once the task is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Task cancelled")]
pub struct Cancelled;

/// Receives progress from long-running work and answers whether the work
/// should stop.
///
/// Implementations must be cheap and non-blocking: they are called
/// synchronously from inside the work.
pub trait ProgressSink: Send + Sync {
    /// Has the owning task been flagged cancelled?
    fn is_cancelled(&self) -> bool;

    /// Record `fraction` (0.0..=1.0) and a status message.
    ///
    /// Returns `Err(Cancelled)` instead of recording when the task has been
    /// cancelled.
    fn report(&self, fraction: f64, message: &str) -> Result<(), Cancelled>;

    /// Checkpoint without reporting progress.
    fn checkpoint(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Failure modes of the inference collaborator.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Task cancelled")]
    Cancelled,

    #[error("{0}")]
    InvalidParams(String),

    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Generation failed: {0}")]
    Generation(String),
}

impl From<Cancelled> for InferenceError {
    fn from(_: Cancelled) -> Self {
        InferenceError::Cancelled
    }
}

/// Successful generation payload, stored as the task result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub output_path: PathBuf,
    pub song_name: String,
    pub message: String,
}

/// The model-loading and generation routine, treated as a gray box.
#[async_trait::async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn generate(
        &self,
        params: GenerationParams,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<GenerationOutput, InferenceError>;
}
