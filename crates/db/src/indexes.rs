use bson::doc;
use mongodb::{Database, IndexModel};
use tracing::info;

use crate::models::{PracticeRecording, Task};

/// Creates the indexes the DAO layer relies on. Safe to call on every boot;
/// MongoDB treats existing identical indexes as a no-op.
pub async fn ensure_indexes(db: &Database) -> mongodb::error::Result<()> {
    db.collection::<Task>(Task::COLLECTION)
        .create_index(IndexModel::builder().keys(doc! { "created_at": -1 }).build())
        .await?;

    db.collection::<PracticeRecording>(PracticeRecording::COLLECTION)
        .create_index(IndexModel::builder().keys(doc! { "task_id": 1 }).build())
        .await?;

    info!("Database indexes ensured");
    Ok(())
}
