//! # Auxiliary data cache
//!
//! The exchange rate and the set of boosted teams are read on every invoice request but change rarely. [`AuxCache`]
//! keeps both in a key-value [`CacheBackend`] with a short TTL and falls back to the underlying [`AuxDataSource`]
//! on a miss.
//!
//! Two backends are provided:
//! * [`MemoryCache`], a process-local map. Good for a single server instance and for tests.
//! * `RedisCache` (feature `redis`), shared between every instance pointing at the same Redis server.
//!
//! [`CacheStore`] wraps whichever of the two is configured.
//!
//! [`AuxDataSource`]: crate::traits::AuxDataSource
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

mod aux_cache;
mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use aux_cache::{AuxCache, CachePolicy, BOOSTED_TEAMS_KEY, EXCHANGE_RATE_KEY};
pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use redis::RedisCache;

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),
    #[error("Could not connect to the cache: {0}")]
    Connection(String),
}

/// A string key-value store whose entries expire on their own.
#[allow(async_fn_in_trait)]
pub trait CacheBackend {
    /// Returns the value stored under `key`, or `None` if it is absent or has expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    /// Stores `value` under `key`, replacing any previous value. The entry expires after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

/// A cached value and the moment it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<T> {
    pub value: T,
    pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, expires_at: DateTime<Utc>) -> Self {
        Self { value, expires_at }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

//--------------------------------------      CacheStore       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub enum CacheStore {
    Memory(MemoryCache),
    #[cfg(feature = "redis")]
    Redis(RedisCache),
}

impl CacheStore {
    /// Builds the cache backend for the given configuration. A Redis URL selects Redis, otherwise the in-memory cache
    /// is used.
    pub fn from_url(redis_url: Option<&str>) -> Result<Self, CacheError> {
        match redis_url {
            #[cfg(feature = "redis")]
            Some(url) => Ok(Self::Redis(RedisCache::new(url)?)),
            #[cfg(not(feature = "redis"))]
            Some(_) => {
                log::warn!("🗃️ A Redis URL was configured, but this build does not include Redis support. Using the in-memory cache.");
                Ok(Self::Memory(MemoryCache::default()))
            },
            None => Ok(Self::Memory(MemoryCache::default())),
        }
    }
}

impl CacheBackend for CacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self {
            CacheStore::Memory(c) => c.get(key).await,
            #[cfg(feature = "redis")]
            CacheStore::Redis(c) => c.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        match self {
            CacheStore::Memory(c) => c.set(key, value, ttl).await,
            #[cfg(feature = "redis")]
            CacheStore::Redis(c) => c.set(key, value, ttl).await,
        }
    }
}
