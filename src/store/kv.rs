use async_trait::async_trait;

use crate::error::Result;

/// A string key-value store shared across runs of the same client profile.
///
/// Reads may be stale or missing; writes carry no transactional guarantee.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}
