use bson::DateTime;
use serde::{Deserialize, Serialize};

/// A per-segment practice clip recorded by the user.
///
/// `file_path` is the filename relative to the `user_recordings/` mount.
/// Recordings are owned by their parent task and removed with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeRecording {
    #[serde(rename = "_id")]
    pub id: String,
    pub task_id: String,
    pub segment_index: i64,
    pub file_path: String,
    pub created_at: DateTime,
}

impl PracticeRecording {
    pub const COLLECTION: &'static str = "practice_recordings";

    pub fn new(id: String, task_id: String, segment_index: i64, file_path: String) -> Self {
        Self {
            id,
            task_id,
            segment_index,
            file_path,
            created_at: DateTime::now(),
        }
    }
}
