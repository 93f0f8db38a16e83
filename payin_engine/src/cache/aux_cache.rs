use std::{fmt::Debug, future::Future, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use log::*;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    cache::CacheBackend,
    helpers::{SharedClock, SystemClock},
    traits::{AuxDataError, AuxDataSource},
};

pub const EXCHANGE_RATE_KEY: &str = "exchangeRate";
pub const BOOSTED_TEAMS_KEY: &str = "boosted_team_ids";

/// Time-to-live of each cached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub exchange_rate_ttl: Duration,
    pub boosted_teams_ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self { exchange_rate_ttl: Duration::from_secs(300), boosted_teams_ttl: Duration::from_secs(300) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedRate {
    rate: Decimal,
    updated_at: DateTime<Utc>,
}

/// A read-through cache in front of an [`AuxDataSource`].
///
/// * A hit inside the TTL never touches the source.
/// * A miss, or a payload that cannot be decoded, reads the source. The result is written back and returned.
/// * If the source fails, the error is returned and the cache is left alone.
/// * If the write-back fails, the freshly read value is still returned.
///
/// Refreshes of the same key are serialised, so a burst of requests arriving on an empty cache produces a single
/// source read.
pub struct AuxCache<S, C> {
    source: S,
    backend: C,
    policy: CachePolicy,
    clock: SharedClock,
    rate_flight: Arc<Mutex<()>>,
    teams_flight: Arc<Mutex<()>>,
}

impl<S: Clone, C: Clone> Clone for AuxCache<S, C> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            backend: self.backend.clone(),
            policy: self.policy,
            clock: Arc::clone(&self.clock),
            rate_flight: Arc::clone(&self.rate_flight),
            teams_flight: Arc::clone(&self.teams_flight),
        }
    }
}

impl<S, C> Debug for AuxCache<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuxCache ({:?})", self.policy)
    }
}

impl<S, C> AuxCache<S, C>
where
    S: AuxDataSource,
    C: CacheBackend,
{
    pub fn new(source: S, backend: C) -> Self {
        Self {
            source,
            backend,
            policy: CachePolicy::default(),
            clock: Arc::new(SystemClock),
            rate_flight: Arc::new(Mutex::new(())),
            teams_flight: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn backend(&self) -> &C {
        &self.backend
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.backend.get(key).await {
            Ok(Some(payload)) => match serde_json::from_str(&payload) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("🗃️ Cached value for {key} is corrupt and will be refreshed. {e}");
                    None
                },
            },
            Ok(None) => None,
            Err(e) => {
                warn!("🗃️ Could not read {key} from the cache. Falling back to the source. {e}");
                None
            },
        }
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let payload = match serde_json::to_string(value) {
            Ok(p) => p,
            Err(e) => {
                warn!("🗃️ Could not serialize {key} for the cache. {e}");
                return;
            },
        };
        if let Err(e) = self.backend.set(key, &payload, ttl).await {
            warn!("🗃️ Could not write {key} to the cache. The value is still returned to the caller. {e}");
        }
    }

    async fn read_through<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        flight: &Mutex<()>,
        refresh: F,
    ) -> Result<T, AuxDataError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AuxDataError>>,
    {
        if let Some(value) = self.lookup(key).await {
            trace!("🗃️ Cache hit for {key}");
            return Ok(value);
        }
        let _guard = flight.lock().await;
        // Another request may have refreshed the key while we waited
        if let Some(value) = self.lookup(key).await {
            trace!("🗃️ Cache hit for {key} after waiting for a concurrent refresh");
            return Ok(value);
        }
        debug!("🗃️ Cache miss for {key}. Reading from the source.");
        let value = refresh().await?;
        self.store(key, &value, ttl).await;
        Ok(value)
    }
}

impl<S, C> AuxDataSource for AuxCache<S, C>
where
    S: AuxDataSource,
    C: CacheBackend,
{
    async fn fetch_exchange_rate(&self) -> Result<Decimal, AuxDataError> {
        let cached = self
            .read_through(EXCHANGE_RATE_KEY, self.policy.exchange_rate_ttl, &self.rate_flight, || async {
                let rate = self.source.fetch_exchange_rate().await?;
                Ok(CachedRate { rate, updated_at: self.clock.now() })
            })
            .await?;
        Ok(cached.rate)
    }

    async fn fetch_boosted_team_ids(&self) -> Result<Vec<String>, AuxDataError> {
        self.read_through(BOOSTED_TEAMS_KEY, self.policy.boosted_teams_ttl, &self.teams_flight, || {
            self.source.fetch_boosted_team_ids()
        })
        .await
    }
}
