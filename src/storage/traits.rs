use crate::{error::Result, models::storage::ObjectUrl};
use async_trait::async_trait;

/// Minimal object store: write bytes under a key, hand out a URL for it.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()>;

    async fn object_url(&self, key: &str) -> Result<ObjectUrl>;
}
