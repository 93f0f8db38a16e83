//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interaction are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool,
//! or create an atomic transaction as the need arises and call through to the functions without any other changes.
//!
//! Money is stored as integer kopecks and timestamps as unix milliseconds. The helpers below convert at the boundary.
use std::env;

use chrono::{DateTime, TimeZone, Utc};
use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod aux_data;
pub mod invoices;
pub mod merchants;
pub mod requisites;
pub mod seed;

const SQLITE_DB_URL: &str = "sqlite://data/payin_store.db";
const MILLIS_PER_DAY: i64 = 86_400_000;

pub fn db_url() -> String {
    let result = env::var("PAYIN_DATABASE_URL").unwrap_or_else(|_| {
        info!("PAYIN_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

/// 00:00 UTC of the day containing `now`, in unix milliseconds. Usage aggregates only count invoices from this point.
pub fn start_of_day_millis(now: DateTime<Utc>) -> i64 {
    let ms = now.timestamp_millis();
    ms - ms.rem_euclid(MILLIS_PER_DAY)
}

pub(crate) fn from_millis(ms: i64) -> Result<DateTime<Utc>, SqlxError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| SqlxError::Decode(format!("Timestamp {ms} is out of range").into()))
}

pub(crate) fn amount_to_db(amount: rust_decimal::Decimal) -> Result<i64, SqlxError> {
    payin_common::to_minor_units(amount).map_err(|e| SqlxError::Protocol(e.to_string()))
}
