pub mod mongo_repository;
pub mod test_repository;

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Bson, Document};

use crate::error;

pub const VERSION_FIELD: &str = "__v";

pub trait Entity {
    fn id(&self) -> ObjectId;
}

/// Optimistic concurrency counter bumped on every successful write.
pub trait Versioned {
    fn version(&self) -> i64;
    fn set_version(&mut self, version: i64);
}

#[async_trait]
pub trait Repository<T> {
    async fn insert(&self, item: &T) -> error::Result<bool>;
    async fn find(&self, field: &str, value: &Bson) -> error::Result<Option<T>>;
    async fn find_many(&self, field: &str, value: &Bson) -> error::Result<Vec<T>>;
    async fn find_all(&self, skip: u32, limit: u32) -> error::Result<Vec<T>>;
    /// Replaces the document matching `old` as long as nobody wrote it since
    /// `update` was read. Fails with code 409 otherwise.
    async fn update_one(&self, old: Document, update: &T) -> error::Result<bool>;
}

pub type RepositoryObject<T> = Arc<dyn Repository<T> + Send + Sync>;
