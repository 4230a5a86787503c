use bson::DateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Terminal states are final; a task never leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

/// A subtitle-generation job.
///
/// `result` holds the UTF-8 JSON blob `{segments, srt}` written once by the
/// owning worker when the task completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: String,
    pub status: TaskStatus,
    pub filename: String,
    pub file_path: String,
    pub duration: Option<f64>,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub last_played_chunk_index: i64,
    pub message: Option<String>,
    pub result: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Task {
    pub const COLLECTION: &'static str = "tasks";

    pub fn new(id: String, status: TaskStatus, filename: String, file_path: String) -> Self {
        let now = DateTime::now();
        Self {
            id,
            status,
            filename,
            file_path,
            duration: None,
            progress: 0.0,
            last_played_chunk_index: 0,
            message: None,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }
}
