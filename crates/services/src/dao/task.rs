use bson::{DateTime, doc};
use mongodb::Database;
use mongodb::options::ReturnDocument;
use tracing::warn;

use lauscher_db::models::{PracticeRecording, Task, TaskStatus};

use super::base::{BaseDao, DaoResult};

pub struct TaskDao {
    pub base: BaseDao<Task>,
    pub recordings: BaseDao<PracticeRecording>,
}

impl TaskDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Task::COLLECTION),
            recordings: BaseDao::new(db, PracticeRecording::COLLECTION),
        }
    }

    pub async fn create(&self, task: &Task) -> DaoResult<()> {
        self.base.insert_one(task).await
    }

    pub async fn get(&self, task_id: &str) -> DaoResult<Task> {
        self.base.find_by_id(task_id).await
    }

    pub async fn list(&self, skip: u64, limit: i64) -> DaoResult<Vec<Task>> {
        self.base
            .find_many(doc! {}, Some(doc! { "created_at": -1 }), skip, limit)
            .await
    }

    /// Atomically claims a pending task for processing.
    ///
    /// The `pending → processing` transition is the ownership claim: the
    /// filter only matches pending tasks, so concurrent process requests
    /// resolve to exactly one winner. Returns the claimed task, or `None`
    /// when the task was not pending (already claimed, terminal, or absent).
    pub async fn claim_pending(&self, task_id: &str) -> DaoResult<Option<Task>> {
        let task = self
            .base
            .collection()
            .find_one_and_update(
                doc! { "_id": task_id, "status": TaskStatus::Pending.as_str() },
                doc! { "$set": {
                    "status": TaskStatus::Processing.as_str(),
                    "updated_at": DateTime::now(),
                } },
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(task)
    }

    /// Commits a worker progress checkpoint. Progress within a task is
    /// monotone because only the owning worker writes it.
    pub async fn set_progress(&self, task_id: &str, progress: f64) -> DaoResult<bool> {
        self.base
            .update_by_id(
                task_id,
                doc! { "$set": { "progress": progress, "updated_at": DateTime::now() } },
            )
            .await
    }

    pub async fn set_message(&self, task_id: &str, message: &str) -> DaoResult<bool> {
        self.base
            .update_by_id(
                task_id,
                doc! { "$set": { "message": message, "updated_at": DateTime::now() } },
            )
            .await
    }

    pub async fn set_duration(&self, task_id: &str, duration: f64) -> DaoResult<bool> {
        self.base
            .update_by_id(
                task_id,
                doc! { "$set": { "duration": duration, "updated_at": DateTime::now() } },
            )
            .await
    }

    pub async fn set_file_path(&self, task_id: &str, file_path: &str) -> DaoResult<bool> {
        self.base
            .update_by_id(
                task_id,
                doc! { "$set": { "file_path": file_path, "updated_at": DateTime::now() } },
            )
            .await
    }

    pub async fn set_last_played(&self, task_id: &str, index: i64) -> DaoResult<bool> {
        self.base
            .update_by_id(
                task_id,
                doc! { "$set": { "last_played_chunk_index": index, "updated_at": DateTime::now() } },
            )
            .await
    }

    /// Terminal write: `processing → completed` with the serialized result.
    ///
    /// The filter keeps terminal writes idempotent: once a task is terminal
    /// no further transition matches.
    pub async fn complete(&self, task_id: &str, result_json: &str) -> DaoResult<bool> {
        let result = self
            .base
            .collection()
            .update_one(
                doc! { "_id": task_id, "status": TaskStatus::Processing.as_str() },
                doc! { "$set": {
                    "status": TaskStatus::Completed.as_str(),
                    "progress": 1.0,
                    "result": result_json,
                    "message": bson::Bson::Null,
                    "updated_at": DateTime::now(),
                } },
            )
            .await?;
        if result.matched_count == 0 {
            warn!(%task_id, "Completion skipped: task no longer in processing state");
        }
        Ok(result.matched_count > 0)
    }

    /// Terminal write: any non-terminal state → `failed` with a message.
    pub async fn fail(&self, task_id: &str, message: &str) -> DaoResult<bool> {
        let result = self
            .base
            .collection()
            .update_one(
                doc! {
                    "_id": task_id,
                    "status": { "$nin": [
                        TaskStatus::Completed.as_str(),
                        TaskStatus::Failed.as_str(),
                    ] },
                },
                doc! { "$set": {
                    "status": TaskStatus::Failed.as_str(),
                    "message": message,
                    "updated_at": DateTime::now(),
                } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    /// Removes a task and cascades to its practice recordings.
    pub async fn delete(&self, task_id: &str) -> DaoResult<bool> {
        self.recordings
            .collection()
            .delete_many(doc! { "task_id": task_id })
            .await?;
        self.base.delete_by_id(task_id).await
    }
}
