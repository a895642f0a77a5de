use async_trait::async_trait;
use futures::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, Document},
    options::FindOptions,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{self, AddCode};

use super::{Entity, Repository, Versioned, VERSION_FIELD};

pub struct MongoRepository<T> {
    pub collection: mongodb::Collection<T>,
}

impl<T> MongoRepository<T> {
    pub async fn new(mongo_uri: &str, database: &str, collection: &str) -> anyhow::Result<Self> {
        let collection = mongodb::Client::with_uri_str(mongo_uri)
            .await?
            .database(database)
            .collection(collection);
        Ok(Self { collection })
    }
}

#[async_trait]
impl<T> Repository<T> for MongoRepository<T>
where
    T: Entity + Versioned + Serialize + DeserializeOwned + Unpin + Clone + Send + Sync,
{
    async fn insert(&self, item: &T) -> error::Result<bool> {
        let result = self
            .collection
            .find_one(doc! {"_id": item.id()}, None)
            .await?
            .is_none();

        if result {
            self.collection.insert_one(item, None).await?;
        }
        Ok(result)
    }

    async fn find(&self, field: &str, value: &Bson) -> error::Result<Option<T>> {
        let result = self.collection.find_one(doc! {field: value}, None).await?;
        Ok(result)
    }

    async fn find_many(&self, field: &str, value: &Bson) -> error::Result<Vec<T>> {
        let result: Vec<mongodb::error::Result<T>> = self
            .collection
            .find(doc! {field: value}, None)
            .await?
            .collect()
            .await;
        Ok(result.into_iter().collect::<mongodb::error::Result<_>>()?)
    }

    async fn find_all(&self, skip: u32, limit: u32) -> error::Result<Vec<T>> {
        let find_options = FindOptions::builder()
            .skip(skip as u64)
            .limit(limit as i64)
            .build();

        let results: Vec<mongodb::error::Result<T>> = self
            .collection
            .find(None, find_options)
            .await?
            .collect()
            .await;

        Ok(results.into_iter().collect::<mongodb::error::Result<_>>()?)
    }

    async fn update_one(&self, mut old: Document, update: &T) -> error::Result<bool> {
        old.extend(doc! {
            "$or": [
                { VERSION_FIELD: Bson::Int64(update.version()) },
                { VERSION_FIELD: { "$exists": false } }
            ]
        });

        let mut update = update.clone();
        update.set_version(update.version() + 1);

        let result = self
            .collection
            .find_one_and_replace(old, &update, None)
            .await?
            .is_some();

        if !result {
            return Err(anyhow::anyhow!("Failed to save changes").code(409));
        }

        Ok(result)
    }
}

/// Filter selecting a single document by its object id.
pub fn by_id(id: ObjectId) -> Document {
    doc! {"_id": id}
}
