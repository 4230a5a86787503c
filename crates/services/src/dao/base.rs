use bson::Document;
use futures::stream::TryStreamExt;
use mongodb::{Collection, Database};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub type DaoResult<T> = Result<T, DaoError>;

#[derive(Debug, thiserror::Error)]
pub enum DaoError {
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
    #[error(transparent)]
    BsonSer(#[from] bson::ser::Error),
    #[error(transparent)]
    BsonDe(#[from] bson::de::Error),
}

/// Thin generic wrapper over a MongoDB collection.
///
/// Concrete DAOs compose one `BaseDao` per collection they touch and add
/// domain operations on top.
pub struct BaseDao<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + Unpin,
{
    collection: Collection<T>,
}

impl<T> BaseDao<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + Unpin,
{
    pub fn new(db: &Database, name: &str) -> Self {
        Self {
            collection: db.collection::<T>(name),
        }
    }

    pub fn collection(&self) -> &Collection<T> {
        &self.collection
    }

    pub async fn insert_one(&self, doc: &T) -> DaoResult<()> {
        self.collection.insert_one(doc).await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> DaoResult<T> {
        self.collection
            .find_one(bson::doc! { "_id": id })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn find_many(
        &self,
        filter: Document,
        sort: Option<Document>,
        skip: u64,
        limit: i64,
    ) -> DaoResult<Vec<T>> {
        let mut find = self.collection.find(filter).skip(skip).limit(limit);
        if let Some(sort) = sort {
            find = find.sort(sort);
        }
        let items = find.await?.try_collect().await?;
        Ok(items)
    }

    pub async fn update_by_id(&self, id: &str, update: Document) -> DaoResult<bool> {
        let result = self
            .collection
            .update_one(bson::doc! { "_id": id }, update)
            .await?;
        Ok(result.matched_count > 0)
    }

    pub async fn delete_by_id(&self, id: &str) -> DaoResult<bool> {
        let result = self
            .collection
            .delete_one(bson::doc! { "_id": id })
            .await?;
        Ok(result.deleted_count > 0)
    }
}
