/// Task identifiers are random v4 UUIDs, never reused within a process.
pub type TaskId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Free-form task parameters as captured from the creation request.
pub type TaskParams = serde_json::Map<String, serde_json::Value>;
