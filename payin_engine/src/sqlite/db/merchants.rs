use payin_common::from_minor_units;
use sqlx::{FromRow, SqliteConnection};

use super::amount_to_db;
use crate::db_types::Merchant;

#[derive(Debug, Clone, FromRow)]
struct MerchantRow {
    id: String,
    in_limit_card: i64,
    in_limit_wallet: i64,
    in_limit_sbp: i64,
}

impl From<MerchantRow> for Merchant {
    fn from(row: MerchantRow) -> Self {
        Merchant {
            id: row.id,
            in_limit_card: from_minor_units(row.in_limit_card),
            in_limit_wallet: from_minor_units(row.in_limit_wallet),
            in_limit_sbp: from_minor_units(row.in_limit_sbp),
        }
    }
}

pub async fn fetch_merchant(merchant_id: &str, conn: &mut SqliteConnection) -> Result<Option<Merchant>, sqlx::Error> {
    let row: Option<MerchantRow> =
        sqlx::query_as("SELECT id, in_limit_card, in_limit_wallet, in_limit_sbp FROM merchants WHERE id = $1")
            .bind(merchant_id)
            .fetch_optional(conn)
            .await?;
    Ok(row.map(Merchant::from))
}

/// Inserts the merchant, or replaces the thresholds of an existing one.
pub async fn upsert_merchant(merchant: &Merchant, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO merchants (id, in_limit_card, in_limit_wallet, in_limit_sbp) VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                in_limit_card = excluded.in_limit_card,
                in_limit_wallet = excluded.in_limit_wallet,
                in_limit_sbp = excluded.in_limit_sbp
        "#,
    )
    .bind(&merchant.id)
    .bind(amount_to_db(merchant.in_limit_card)?)
    .bind(amount_to_db(merchant.in_limit_wallet)?)
    .bind(amount_to_db(merchant.in_limit_sbp)?)
    .execute(conn)
    .await?;
    Ok(())
}

/// Allows the merchant to route pay-ins to the given trader account.
pub async fn authorize_merchant(
    merchant_id: &str,
    trader_account_id: &str,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO merchant_authorizations (merchant_id, trader_account_id) VALUES ($1, $2)")
        .bind(merchant_id)
        .bind(trader_account_id)
        .execute(conn)
        .await?;
    Ok(())
}
