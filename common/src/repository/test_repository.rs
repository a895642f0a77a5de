use std::sync::Mutex;

use async_trait::async_trait;
use mongodb::bson::{self, Bson, Document};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{self, AddCode};

use super::{Entity, Repository, Versioned, VERSION_FIELD};

/// In-memory stand-in for a collection, storing documents as BSON.
pub struct TestRepository<T> {
    _t: std::marker::PhantomData<T>,
    pub db: Mutex<Vec<Bson>>,
}

impl<T> TestRepository<T> {
    pub fn new() -> Self {
        Self {
            _t: std::marker::PhantomData,
            db: Mutex::new(Vec::new()),
        }
    }
}

impl<T> Default for TestRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn matches(item: &Bson, filter: &Document) -> bool {
    let Some(document) = item.as_document() else {
        return false;
    };
    filter
        .iter()
        .all(|(field, value)| document.get(field) == Some(value))
}

fn stored_version(item: &Bson) -> i64 {
    item.as_document()
        .and_then(|document| match document.get(VERSION_FIELD) {
            Some(Bson::Int64(version)) => Some(*version),
            Some(Bson::Int32(version)) => Some(*version as i64),
            _ => None,
        })
        .unwrap_or(0)
}

#[async_trait]
impl<T> Repository<T> for TestRepository<T>
where
    T: Entity + Versioned + Clone + Send + Sync + Serialize + DeserializeOwned,
{
    async fn insert(&self, item: &T) -> error::Result<bool> {
        let mut db = self.db.lock().unwrap();

        let id = Bson::ObjectId(item.id());
        let contains = db
            .iter()
            .any(|x| x.as_document().and_then(|doc| doc.get("_id")) == Some(&id));
        if !contains {
            db.push(bson::to_bson(&item)?);
        }
        Ok(!contains)
    }

    async fn find(&self, field: &str, value: &Bson) -> error::Result<Option<T>> {
        let db = self.db.lock().unwrap();
        let filter = bson::doc! {field: value.clone()};
        db.iter()
            .find(|x| matches(x, &filter))
            .cloned()
            .map(bson::from_bson)
            .transpose()
            .map_err(Into::into)
    }

    async fn find_many(&self, field: &str, value: &Bson) -> error::Result<Vec<T>> {
        let db = self.db.lock().unwrap();
        let filter = bson::doc! {field: value.clone()};
        db.iter()
            .filter(|x| matches(x, &filter))
            .map(|x| bson::from_bson(x.clone()).map_err(Into::into))
            .collect()
    }

    async fn find_all(&self, skip: u32, limit: u32) -> error::Result<Vec<T>> {
        let db = self.db.lock().unwrap();
        db.iter()
            .skip(skip as usize)
            .take(limit as usize)
            .map(|x| bson::from_bson(x.clone()).map_err(Into::into))
            .collect()
    }

    async fn update_one(&self, old: Document, update: &T) -> error::Result<bool> {
        let mut db = self.db.lock().unwrap();

        let position = db
            .iter()
            .position(|x| matches(x, &old) && stored_version(x) == update.version());

        let Some(position) = position else {
            return Err(anyhow::anyhow!("Failed to save changes").code(409));
        };

        let mut update = update.clone();
        update.set_version(update.version() + 1);
        db[position] = bson::to_bson(&update)?;
        Ok(true)
    }
}
