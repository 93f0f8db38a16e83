use std::str::FromStr;

use chrono::{DateTime, Utc};
use log::*;
use payin_common::from_minor_units;
use rust_decimal::Decimal;
use sqlx::{FromRow, SqliteConnection};

use super::{amount_to_db, from_millis, start_of_day_millis};
use crate::{
    db_types::{Invoice, InvoiceStatus, NewInvoice, RequisiteType},
    traits::InvoiceStoreError,
};

#[derive(Debug, Clone, FromRow)]
struct InvoiceRow {
    id: String,
    merchant_id: String,
    amount: i64,
    status: InvoiceStatus,
    requisite_type: RequisiteType,
    is_flexible_amount: bool,
    terminal_id: String,
    user_id: String,
    bank_id: String,
    trader_account_id: String,
    requisite_id: String,
    callback_url: String,
    callback_key: String,
    internal_request_id: String,
    created_at: i64,
    expires_at: i64,
    exchange_rate: String,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = sqlx::Error;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        let exchange_rate = Decimal::from_str(&row.exchange_rate)
            .map_err(|e| sqlx::Error::Decode(format!("Invalid exchange rate on invoice {}: {e}", row.id).into()))?;
        Ok(Invoice {
            id: row.id,
            merchant_id: row.merchant_id,
            amount: from_minor_units(row.amount),
            status: row.status,
            channel_type: row.requisite_type,
            is_flexible_amount: row.is_flexible_amount,
            terminal_id: row.terminal_id,
            user_id: row.user_id,
            bank_id: row.bank_id,
            trader_account_id: row.trader_account_id,
            requisite_id: row.requisite_id,
            callback_url: row.callback_url,
            callback_key: row.callback_key,
            internal_request_id: row.internal_request_id,
            created_at: from_millis(row.created_at)?,
            expires_at: from_millis(row.expires_at)?,
            exchange_rate,
        })
    }
}

/// Inserts the invoice with a freshly generated id. This is not atomic and performs no availability checks. Use
/// [`reserve_and_insert`] inside a transaction for new invoices.
pub async fn insert_invoice(invoice: &NewInvoice, conn: &mut SqliteConnection) -> Result<String, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        r#"
            INSERT INTO invoices (
                id,
                merchant_id,
                amount,
                status,
                requisite_type,
                is_flexible_amount,
                terminal_id,
                user_id,
                bank_id,
                trader_account_id,
                requisite_id,
                callback_url,
                callback_key,
                internal_request_id,
                created_at,
                expires_at,
                exchange_rate
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        "#,
    )
    .bind(&id)
    .bind(&invoice.merchant_id)
    .bind(amount_to_db(invoice.amount)?)
    .bind(invoice.status.to_string())
    .bind(invoice.channel_type.to_string())
    .bind(invoice.is_flexible_amount)
    .bind(&invoice.terminal_id)
    .bind(&invoice.user_id)
    .bind(&invoice.bank_id)
    .bind(&invoice.trader_account_id)
    .bind(&invoice.requisite_id)
    .bind(&invoice.callback_url)
    .bind(&invoice.callback_key)
    .bind(&invoice.internal_request_id)
    .bind(invoice.created_at.timestamp_millis())
    .bind(invoice.expires_at.timestamp_millis())
    .bind(invoice.exchange_rate.to_string())
    .execute(conn)
    .await?;
    Ok(id)
}

/// Whether the requisite has an invoice other than `except_id` for `amount` in `CREATED` status since the start of
/// the day containing `now`.
pub async fn other_pending_invoice_exists(
    requisite_id: &str,
    amount: Decimal,
    now: DateTime<Utc>,
    except_id: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let exists: bool = sqlx::query_scalar(
        r#"SELECT EXISTS (
            SELECT 1 FROM invoices
            WHERE requisite_id = $1 AND amount = $2 AND status = $3 AND created_at >= $4 AND id <> $5
        )"#,
    )
    .bind(requisite_id)
    .bind(amount_to_db(amount)?)
    .bind(InvoiceStatus::Created.to_string())
    .bind(start_of_day_millis(now))
    .bind(except_id)
    .fetch_one(conn)
    .await?;
    Ok(exists)
}

/// Inserts the invoice, then checks that no other pending invoice holds its requisite at the same amount today.
///
/// Must run inside a transaction, and the caller rolls back on `ChannelConflict`. Writing first makes the
/// transaction take SQLite's write lock before it reads, so a concurrent writer waits and then sees this row.
pub async fn reserve_and_insert(invoice: &NewInvoice, conn: &mut SqliteConnection) -> Result<String, InvoiceStoreError> {
    let id = insert_invoice(invoice, conn).await?;
    if other_pending_invoice_exists(&invoice.requisite_id, invoice.amount, invoice.created_at, &id, conn).await? {
        debug!(
            "🧾️ Requisite {} already has a pending invoice for {}. Refusing the write.",
            invoice.requisite_id, invoice.amount
        );
        return Err(InvoiceStoreError::ChannelConflict(invoice.requisite_id.clone()));
    }
    Ok(id)
}

pub async fn fetch_invoice(id: &str, conn: &mut SqliteConnection) -> Result<Option<Invoice>, sqlx::Error> {
    let row: Option<InvoiceRow> =
        sqlx::query_as("SELECT * FROM invoices WHERE id = $1").bind(id).fetch_optional(conn).await?;
    row.map(Invoice::try_from).transpose()
}

/// All invoices issued on the given requisite, oldest first.
pub async fn fetch_invoices_for_requisite(
    requisite_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Invoice>, sqlx::Error> {
    let rows: Vec<InvoiceRow> =
        sqlx::query_as("SELECT * FROM invoices WHERE requisite_id = $1 ORDER BY created_at, id")
            .bind(requisite_id)
            .fetch_all(conn)
            .await?;
    rows.into_iter().map(Invoice::try_from).collect()
}

pub async fn count_invoices(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM invoices").fetch_one(conn).await
}

/// Moves an invoice to a new status. Returns `false` if there is no invoice with this id.
pub async fn update_invoice_status(
    id: &str,
    status: InvoiceStatus,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE invoices SET status = $1 WHERE id = $2").bind(status.to_string()).bind(id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}
