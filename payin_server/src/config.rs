//! Server configuration.
//!
//! Everything is read from environment variables (a `.env` file is honoured, see `main`). Values that cannot be
//! parsed are logged and replaced with their defaults, so a typo never stops the server from starting.
//!
//! | Variable                        | Default                        |
//! |---------------------------------|--------------------------------|
//! | `PAYIN_HOST`                    | `127.0.0.1`                    |
//! | `PAYIN_PORT`                    | `8360`                         |
//! | `PAYIN_DATABASE_URL`            | `sqlite://data/payin_store.db` |
//! | `PAYIN_REDIS_URL`               | unset (in-memory cache)        |
//! | `PAYIN_EXCHANGE_RATE_TTL`       | `300` seconds                  |
//! | `PAYIN_BOOSTED_TEAMS_TTL`       | `300` seconds                  |
//! | `PAYIN_ALLOCATION_TIMEOUT_MS`   | unset (no timeout)             |
//! | `PAYIN_MAX_ALLOCATION_ATTEMPTS` | `3`                            |
//! | `PAYIN_RUN_MIGRATIONS`          | `true`                         |
use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;
use payin_common::{
    helpers::{parse_boolean_flag, parse_number},
    Secret,
};
use payin_engine::{cache::CachePolicy, sqlite::db::db_url, FlowSettings};

const DEFAULT_PAYIN_HOST: &str = "127.0.0.1";
const DEFAULT_PAYIN_PORT: u16 = 8360;
const DEFAULT_DB_CONNECTIONS: u32 = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_db_connections: u32,
    /// When set, the exchange rate and boosted team list are cached in Redis rather than in process memory.
    pub redis_url: Option<Secret<String>>,
    pub cache_policy: CachePolicy,
    pub flow_settings: FlowSettings,
    /// Apply outstanding schema migrations at start-up.
    pub run_migrations: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PAYIN_HOST.to_string(),
            port: DEFAULT_PAYIN_PORT,
            database_url: String::default(),
            max_db_connections: DEFAULT_DB_CONNECTIONS,
            redis_url: None,
            cache_policy: CachePolicy::default(),
            flow_settings: FlowSettings::default(),
            run_migrations: true,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let host = env::var("PAYIN_HOST").ok().unwrap_or_else(|| DEFAULT_PAYIN_HOST.into());
        let port = number_or_default("PAYIN_PORT", DEFAULT_PAYIN_PORT);
        let database_url = db_url();
        let redis_url = env::var("PAYIN_REDIS_URL").ok().filter(|s| !s.trim().is_empty()).map(Secret::new);
        match &redis_url {
            Some(_) => info!("🪛️ Auxiliary data will be cached in Redis"),
            None => info!("🪛️ PAYIN_REDIS_URL is not set. Auxiliary data will be cached in memory."),
        }
        let cache_policy = CachePolicy {
            exchange_rate_ttl: seconds_or_default("PAYIN_EXCHANGE_RATE_TTL", defaults.cache_policy.exchange_rate_ttl),
            boosted_teams_ttl: seconds_or_default("PAYIN_BOOSTED_TEAMS_TTL", defaults.cache_policy.boosted_teams_ttl),
        };
        let flow_settings = configure_flow(defaults.flow_settings);
        let run_migrations = parse_boolean_flag(env::var("PAYIN_RUN_MIGRATIONS").ok(), true);
        Self {
            host,
            port,
            database_url,
            max_db_connections: DEFAULT_DB_CONNECTIONS,
            redis_url,
            cache_policy,
            flow_settings,
            run_migrations,
        }
    }
}

fn configure_flow(defaults: FlowSettings) -> FlowSettings {
    let allocation_timeout = match env::var("PAYIN_ALLOCATION_TIMEOUT_MS").ok() {
        None => {
            info!("🪛️ PAYIN_ALLOCATION_TIMEOUT_MS is not set. Requisite allocation will not time out.");
            defaults.allocation_timeout
        },
        Some(value) => millis_from(Some(value), "PAYIN_ALLOCATION_TIMEOUT_MS", defaults.allocation_timeout),
    };
    let max_allocation_attempts =
        match number_or_default("PAYIN_MAX_ALLOCATION_ATTEMPTS", defaults.max_allocation_attempts) {
            0 => {
                warn!("🪛️ PAYIN_MAX_ALLOCATION_ATTEMPTS must be at least 1. Using 1.");
                1
            },
            n => n,
        };
    FlowSettings { allocation_timeout, max_allocation_attempts }
}

fn number_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    parse_number(env::var(name).ok(), default).unwrap_or_else(|e| {
        error!("🪛️ Invalid value for {name}. {e} Using the default, {default}, instead.");
        default
    })
}

fn seconds_or_default(name: &str, default: Duration) -> Duration {
    seconds_from(env::var(name).ok(), name, default)
}

fn seconds_from(value: Option<String>, name: &str, default: Duration) -> Duration {
    match parse_number::<u64>(value, default.as_secs()) {
        Ok(secs) => Duration::from_secs(secs),
        Err(e) => {
            error!("🪛️ Invalid value for {name}. {e} Using the default of {} seconds.", default.as_secs());
            default
        },
    }
}

fn millis_from(value: Option<String>, name: &str, default: Option<Duration>) -> Option<Duration> {
    match parse_number::<u64>(value, 0) {
        Ok(0) => None,
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(e) => {
            error!("🪛️ Invalid value for {name}. {e} Using the default instead.");
            default
        },
    }
}
