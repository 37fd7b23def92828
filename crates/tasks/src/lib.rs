//! In-memory task lifecycle for background generation work.
//!
//! - [`TaskRegistry`]: owns every [`Task`] and the cancellation handle of
//!   each in-flight execution. All mutation goes through its methods;
//!   readers get owned snapshots.
//! - [`executor`]: spawns and supervises a task's work on the tokio
//!   runtime, converting every outcome (including panics) into task state.
//! - [`TaskProgress`]: the [`ProgressSink`](diffrhythm_core::inference::ProgressSink)
//!   handed to the work, wired to the registry and the task's cancellation
//!   token.

pub mod executor;
pub mod progress;
pub mod registry;
pub mod task;

pub use progress::TaskProgress;
pub use registry::TaskRegistry;
pub use task::{Task, TaskKind, TaskStatus, TaskSummary};
