use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::error::Result;
use crate::store::kv::KvStore;

/// A store backed by Redis, so several client processes on the same
/// profile share one user id and plan cache.
#[derive(Clone)]
pub struct RedisStore {
    redis: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    /// Connects to Redis.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - The URL of the Redis server.
    /// * `prefix` - Namespace prepended to every key.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `RedisStore`.
    pub async fn connect(redis_url: &str, prefix: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;
        tracing::info!("✅ Redis Connection Manager initialized");

        Ok(Self {
            redis,
            prefix: prefix.to_string(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = self.redis.clone().get(self.key(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _: () = self.redis.clone().set(self.key(key), value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let _: () = self.redis.clone().del(self.key(key)).await?;
        Ok(())
    }
}
