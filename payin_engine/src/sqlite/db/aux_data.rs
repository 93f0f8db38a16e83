use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;

use crate::traits::AuxDataError;

const EXCHANGE_RATE_SETTING: &str = "exchange_rate";

pub async fn fetch_exchange_rate(conn: &mut SqliteConnection) -> Result<Decimal, AuxDataError> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = $1")
        .bind(EXCHANGE_RATE_SETTING)
        .fetch_optional(conn)
        .await?;
    let value = value.ok_or_else(|| AuxDataError::NotConfigured("exchange rate".into()))?;
    Decimal::from_str(&value).map_err(|e| AuxDataError::Source(format!("Stored exchange rate '{value}' is invalid. {e}")))
}

pub async fn set_exchange_rate(
    rate: Decimal,
    updated_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO settings (key, value, updated_at) VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(EXCHANGE_RATE_SETTING)
    .bind(rate.to_string())
    .bind(updated_at.timestamp_millis())
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_boosted_team_ids(conn: &mut SqliteConnection) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT id FROM teams WHERE is_boosted = 1 ORDER BY id").fetch_all(conn).await
}

/// Marks the team as boosted or not. Returns `false` if the team does not exist.
pub async fn set_team_boost(team_id: &str, boosted: bool, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE teams SET is_boosted = $1 WHERE id = $2").bind(boosted).bind(team_id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}
