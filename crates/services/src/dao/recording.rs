use bson::doc;
use mongodb::Database;

use lauscher_db::models::PracticeRecording;

use super::base::{BaseDao, DaoResult};

pub struct RecordingDao {
    pub base: BaseDao<PracticeRecording>,
}

impl RecordingDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, PracticeRecording::COLLECTION),
        }
    }

    pub async fn create(&self, recording: &PracticeRecording) -> DaoResult<()> {
        self.base.insert_one(recording).await
    }

    pub async fn list_for_task(&self, task_id: &str) -> DaoResult<Vec<PracticeRecording>> {
        self.base
            .find_many(
                doc! { "task_id": task_id },
                Some(doc! { "created_at": 1 }),
                0,
                0,
            )
            .await
    }
}
