//! Task record, status state machine, and read-side projections.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use diffrhythm_core::error::CoreError;
use diffrhythm_core::inference::GenerationOutput;
use diffrhythm_core::types::{TaskId, TaskParams, Timestamp};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a task.
///
/// ```text
/// pending -> running -> completed | failed | cancelled
/// pending -> cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Completed, failed, and cancelled tasks never change again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Whether `self -> next` is an edge of the state machine.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Cancelled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(CoreError::Validation(format!(
                "Invalid task status '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

/// The kind of work a task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Music generation through the inference collaborator.
    Generate,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Generate => "generate",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generate" => Ok(TaskKind::Generate),
            other => Err(CoreError::Validation(format!(
                "Unknown task type '{other}'. Must be one of: generate"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// One unit of background work.
///
/// Values handed out by [`TaskRegistry`](crate::TaskRegistry) are owned
/// copies; changing them has no effect on the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub params: TaskParams,
    pub status: TaskStatus,
    pub progress: f64,
    pub message: String,
    pub result: Option<GenerationOutput>,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Task {
    pub(crate) fn new(id: TaskId, kind: TaskKind, params: TaskParams) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind,
            params,
            status: TaskStatus::Pending,
            progress: 0.0,
            message: String::new(),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(&mut self, next: TaskStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        self.updated_at = Utc::now();
        true
    }

    pub(crate) fn start(&mut self, message: String) -> bool {
        if !self.transition(TaskStatus::Running) {
            return false;
        }
        self.progress = 0.0;
        self.message = message;
        true
    }

    /// Record progress. Never regresses, ignores non-finite input, and is a
    /// no-op once terminal.
    pub(crate) fn record_progress(&mut self, fraction: f64, message: Option<&str>) -> bool {
        if self.status.is_terminal() || !fraction.is_finite() {
            return false;
        }
        self.progress = self.progress.max(fraction.clamp(0.0, 1.0));
        if let Some(message) = message {
            self.message = message.to_string();
        }
        self.updated_at = Utc::now();
        true
    }

    pub(crate) fn complete(&mut self, output: GenerationOutput, message: String) -> bool {
        if !self.transition(TaskStatus::Completed) {
            return false;
        }
        self.progress = 1.0;
        self.message = message;
        self.result = Some(output);
        true
    }

    pub(crate) fn fail(&mut self, error: String) -> bool {
        if !self.transition(TaskStatus::Failed) {
            return false;
        }
        self.message = format!("Task failed: {error}");
        self.error = Some(error);
        true
    }

    pub(crate) fn cancel(&mut self, message: String) -> bool {
        if !self.transition(TaskStatus::Cancelled) {
            return false;
        }
        self.message = message;
        true
    }

    /// Output artifact location, present only once completed.
    pub fn output_path(&self) -> Option<String> {
        self.result
            .as_ref()
            .map(|r| r.output_path.display().to_string())
    }

    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            id: self.id,
            kind: self.kind,
            status: self.status,
            progress: self.progress,
            message: self.message.clone(),
            created_at: self.created_at,
        }
    }
}

/// Compact projection used by list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSummary {
    pub id: TaskId,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub progress: f64,
    pub message: String,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TaskStatus; 5] = [
        TaskStatus::Pending,
        TaskStatus::Running,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ];

    fn task() -> Task {
        Task::new(uuid::Uuid::new_v4(), TaskKind::Generate, TaskParams::new())
    }

    fn output() -> GenerationOutput {
        GenerationOutput {
            output_path: "out/song_1234.mp3".into(),
            song_name: "song".into(),
            message: "ok".into(),
        }
    }

    // -- state machine --------------------------------------------------------

    #[test]
    fn only_legal_transitions_allowed() {
        let legal = [
            (TaskStatus::Pending, TaskStatus::Running),
            (TaskStatus::Pending, TaskStatus::Cancelled),
            (TaskStatus::Running, TaskStatus::Completed),
            (TaskStatus::Running, TaskStatus::Failed),
            (TaskStatus::Running, TaskStatus::Cancelled),
        ];
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
    }

    #[test]
    fn status_parses_its_own_names() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn unknown_kind_rejected() {
        assert_eq!("generate".parse::<TaskKind>().unwrap(), TaskKind::Generate);
        assert!("download".parse::<TaskKind>().is_err());
    }

    // -- record mutation ------------------------------------------------------

    #[test]
    fn new_task_is_pending_at_zero() {
        let t = task();
        assert_eq!(t.status, TaskStatus::Pending);
        assert_eq!(t.progress, 0.0);
        assert!(t.result.is_none() && t.error.is_none());
    }

    #[test]
    fn progress_never_regresses() {
        let mut t = task();
        t.start("starting".into());
        t.record_progress(0.5, Some("half"));
        t.record_progress(0.3, Some("late callback"));
        assert_eq!(t.progress, 0.5);
        assert_eq!(t.message, "late callback");
    }

    #[test]
    fn progress_is_clamped_and_nan_ignored() {
        let mut t = task();
        t.start("starting".into());
        assert!(t.record_progress(1.7, None));
        assert_eq!(t.progress, 1.0);
        assert!(!t.record_progress(f64::NAN, Some("bad")));
        assert_eq!(t.message, "starting");
    }

    #[test]
    fn completion_forces_full_progress() {
        let mut t = task();
        t.start("starting".into());
        t.record_progress(0.4, None);
        assert!(t.complete(output(), "done".into()));
        assert_eq!(t.progress, 1.0);
        assert_eq!(t.output_path().as_deref(), Some("out/song_1234.mp3"));
        assert!(t.error.is_none());
    }

    #[test]
    fn failure_records_error_verbatim() {
        let mut t = task();
        t.start("starting".into());
        assert!(t.fail("CUDA out of memory".into()));
        assert_eq!(t.error.as_deref(), Some("CUDA out of memory"));
        assert_eq!(t.message, "Task failed: CUDA out of memory");
        assert!(t.result.is_none());
    }

    #[test]
    fn pending_task_cannot_complete_or_fail() {
        let mut t = task();
        assert!(!t.complete(output(), "done".into()));
        assert!(!t.fail("boom".into()));
        assert_eq!(t.status, TaskStatus::Pending);
    }

    #[test]
    fn terminal_task_is_immutable() {
        let mut t = task();
        t.start("starting".into());
        t.cancel("Task cancelled".into());
        let before = t.clone();

        assert!(!t.record_progress(0.9, Some("ignored")));
        assert!(!t.complete(output(), "late".into()));
        assert!(!t.fail("late".into()));
        assert!(!t.start("again".into()));
        assert_eq!(t, before);
    }

    #[test]
    fn snapshot_serializes_type_and_lowercase_status() {
        let t = task();
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["type"], "generate");
        assert_eq!(json["status"], "pending");
        assert!(json["result"].is_null());
    }
}
