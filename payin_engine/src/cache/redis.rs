use std::{fmt::Debug, time::Duration};

use deadpool_redis::{redis::AsyncCommands, Config, Pool, Runtime};
use log::*;

use crate::cache::{CacheBackend, CacheError};

/// A cache backed by a Redis server, shared by every process connected to it.
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
}

impl Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RedisCache ({:?})", self.pool.status())
    }
}

impl RedisCache {
    /// Creates the connection pool. No connection is made until the cache is first used.
    pub fn new(url: &str) -> Result<Self, CacheError> {
        let pool = Config::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        info!("🗃️ Redis cache pool created");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: Pool) -> Self {
        Self { pool }
    }
}

impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.pool.get().await.map_err(|e| CacheError::Connection(e.to_string()))?;
        let value: Option<String> = conn.get(key).await.map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await.map_err(|e| CacheError::Connection(e.to_string()))?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(())
    }
}
