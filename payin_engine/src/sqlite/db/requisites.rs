//! Candidate requisite lookups.
//!
//! A single query loads every requisite of the requested type, joined with its terminal, trader account and wallet,
//! plus today's usage figures for all three. The eligibility rules themselves are applied in Rust by
//! [`ChannelSnapshot::check`].
use chrono::{DateTime, Utc};
use log::*;
use payin_common::from_minor_units;
use rust_decimal::Decimal;
use sqlx::{FromRow, SqliteConnection};

use super::{from_millis, start_of_day_millis};
use crate::{
    db_types::{FlexibleMatch, InvoiceStatus, Requisite, RequisiteType},
    eligibility::{
        AccountLimits,
        AccountUsage,
        AmountBand,
        ChannelSnapshot,
        RequisiteLimits,
        RequisiteUsage,
        TerminalLimits,
        TerminalUsage,
        UsageAggregates,
    },
    traits::CandidateQuery,
};

#[derive(Debug, Clone, FromRow)]
struct SnapshotRow {
    id: String,
    requisite_type: RequisiteType,
    user_id: String,
    trader_account_id: String,
    terminal_id: String,
    team_id: Option<String>,
    bank_id: String,
    bank_name: String,
    phone_number: String,
    card_number: String,
    wallet_number: String,
    recipient_name: String,
    r_is_can_work: bool,
    r_is_blocked: bool,
    r_min_invoice_amount: i64,
    r_max_invoice_amount: i64,
    r_max_active_invoice: Option<i64>,
    r_daily_limit_invoices: Option<i64>,
    r_invoice_interval: i64,
    t_is_can_work: bool,
    t_is_blocked: bool,
    t_min_invoice_amount: i64,
    t_max_invoice_amount: i64,
    t_daily_limit_money: Option<i64>,
    t_max_active_invoice: Option<i64>,
    t_daily_limit_invoices: Option<i64>,
    t_invoice_interval: i64,
    a_is_can_work: bool,
    a_is_blocked: bool,
    a_is_work_on_type: bool,
    a_min_invoice_amount: i64,
    a_max_invoice_amount: i64,
    a_max_active_invoices_in: Option<i64>,
    pay_in_balance: i64,
    merchant_authorized: bool,
    account_invoice_count: i64,
    account_pending_sum: i64,
    terminal_invoice_count: i64,
    terminal_total_amount: i64,
    terminal_last_invoice_at: Option<i64>,
    requisite_invoice_count: i64,
    requisite_last_invoice_at: Option<i64>,
    requisite_pending_amounts: Option<String>,
}

fn parse_pending_amounts(s: Option<&str>) -> Result<Vec<Decimal>, sqlx::Error> {
    let Some(s) = s.filter(|s| !s.is_empty()) else {
        return Ok(Vec::new());
    };
    s.split(',')
        .map(|v| {
            v.trim()
                .parse::<i64>()
                .map(from_minor_units)
                .map_err(|e| sqlx::Error::Decode(format!("Invalid pending amount '{v}': {e}").into()))
        })
        .collect()
}

impl TryFrom<SnapshotRow> for ChannelSnapshot {
    type Error = sqlx::Error;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        let pending_amounts = parse_pending_amounts(row.requisite_pending_amounts.as_deref())?;
        let terminal_last = row.terminal_last_invoice_at.map(from_millis).transpose()?;
        let requisite_last = row.requisite_last_invoice_at.map(from_millis).transpose()?;
        Ok(ChannelSnapshot {
            requisite: Requisite {
                id: row.id,
                channel_type: row.requisite_type,
                user_id: row.user_id,
                trader_account_id: row.trader_account_id,
                terminal_id: row.terminal_id,
                team_id: row.team_id,
                bank_id: row.bank_id,
                bank_name: row.bank_name,
                phone_number: row.phone_number,
                card_number: row.card_number,
                wallet_number: row.wallet_number,
                recipient_name: row.recipient_name,
            },
            requisite_limits: RequisiteLimits {
                is_can_work: row.r_is_can_work,
                is_blocked: row.r_is_blocked,
                min_invoice_amount: from_minor_units(row.r_min_invoice_amount),
                max_invoice_amount: from_minor_units(row.r_max_invoice_amount),
                max_active_invoice: row.r_max_active_invoice,
                daily_limit_invoices: row.r_daily_limit_invoices,
                invoice_interval: row.r_invoice_interval,
            },
            terminal: TerminalLimits {
                is_can_work: row.t_is_can_work,
                is_blocked: row.t_is_blocked,
                min_invoice_amount: from_minor_units(row.t_min_invoice_amount),
                max_invoice_amount: from_minor_units(row.t_max_invoice_amount),
                daily_limit_money: row.t_daily_limit_money.map(from_minor_units),
                max_active_invoice: row.t_max_active_invoice,
                daily_limit_invoices: row.t_daily_limit_invoices,
                invoice_interval: row.t_invoice_interval,
            },
            account: AccountLimits {
                is_can_work: row.a_is_can_work,
                is_blocked: row.a_is_blocked,
                is_work_on_type: row.a_is_work_on_type,
                min_invoice_amount: from_minor_units(row.a_min_invoice_amount),
                max_invoice_amount: from_minor_units(row.a_max_invoice_amount),
                max_active_invoices_in: row.a_max_active_invoices_in,
                pay_in_balance: from_minor_units(row.pay_in_balance),
                merchant_authorized: row.merchant_authorized,
            },
            usage: UsageAggregates {
                account: AccountUsage {
                    invoice_count: row.account_invoice_count,
                    pending_sum: from_minor_units(row.account_pending_sum),
                },
                terminal: TerminalUsage {
                    invoice_count: row.terminal_invoice_count,
                    total_amount: from_minor_units(row.terminal_total_amount),
                    last_invoice_at: terminal_last,
                },
                requisite: RequisiteUsage {
                    invoice_count: row.requisite_invoice_count,
                    last_invoice_at: requisite_last,
                    pending_amounts,
                },
            },
        })
    }
}

const SNAPSHOT_QUERY: &str = r#"
    WITH today AS (
        SELECT * FROM invoices
        WHERE created_at >= $4 AND status IN ($5, $6, $7, $8)
    ),
    account_usage AS (
        SELECT trader_account_id,
               COUNT(*) AS invoice_count,
               COALESCE(SUM(CASE WHEN status = $5 THEN amount END), 0) AS pending_sum
        FROM today GROUP BY trader_account_id
    ),
    terminal_usage AS (
        SELECT terminal_id,
               COUNT(*) AS invoice_count,
               COALESCE(SUM(amount), 0) AS total_amount,
               MAX(created_at) AS last_invoice_at
        FROM today GROUP BY terminal_id
    ),
    requisite_usage AS (
        SELECT requisite_id,
               COUNT(*) AS invoice_count,
               MAX(created_at) AS last_invoice_at,
               GROUP_CONCAT(CASE WHEN status = $5 THEN amount END) AS pending_amounts
        FROM today GROUP BY requisite_id
    )
    SELECT
        r.id,
        r.requisite_type,
        a.user_id,
        a.id AS trader_account_id,
        r.terminal_id,
        a.team_id,
        r.bank_id,
        b.name AS bank_name,
        r.phone_number,
        r.card_number,
        r.wallet_number,
        r.recipient_name,
        r.is_can_work AS r_is_can_work,
        r.is_blocked AS r_is_blocked,
        r.min_invoice_amount AS r_min_invoice_amount,
        r.max_invoice_amount AS r_max_invoice_amount,
        r.max_active_invoice AS r_max_active_invoice,
        r.daily_limit_invoices AS r_daily_limit_invoices,
        r.invoice_interval AS r_invoice_interval,
        t.is_can_work AS t_is_can_work,
        t.is_blocked AS t_is_blocked,
        t.min_invoice_amount AS t_min_invoice_amount,
        t.max_invoice_amount AS t_max_invoice_amount,
        t.daily_limit_money AS t_daily_limit_money,
        t.max_active_invoice AS t_max_active_invoice,
        t.daily_limit_invoices AS t_daily_limit_invoices,
        t.invoice_interval AS t_invoice_interval,
        a.is_can_work AS a_is_can_work,
        a.is_blocked AS a_is_blocked,
        CASE $1
            WHEN 'CARD' THEN a.is_work_on_card_pay_in
            WHEN 'WALLET' THEN a.is_work_on_wallet_pay_in
            ELSE a.is_work_on_sbp_pay_in
        END AS a_is_work_on_type,
        CASE $1
            WHEN 'CARD' THEN a.min_invoice_amount_card
            WHEN 'WALLET' THEN a.min_invoice_amount_wallet
            ELSE a.min_invoice_amount_sbp
        END AS a_min_invoice_amount,
        a.max_invoice_amount AS a_max_invoice_amount,
        a.max_active_invoices_in AS a_max_active_invoices_in,
        COALESCE(w.pay_in_balance, 0) AS pay_in_balance,
        EXISTS (
            SELECT 1 FROM merchant_authorizations ma
            WHERE ma.trader_account_id = a.id AND ma.merchant_id = $2
        ) AS merchant_authorized,
        COALESCE(au.invoice_count, 0) AS account_invoice_count,
        COALESCE(au.pending_sum, 0) AS account_pending_sum,
        COALESCE(tu.invoice_count, 0) AS terminal_invoice_count,
        COALESCE(tu.total_amount, 0) AS terminal_total_amount,
        tu.last_invoice_at AS terminal_last_invoice_at,
        COALESCE(ru.invoice_count, 0) AS requisite_invoice_count,
        ru.last_invoice_at AS requisite_last_invoice_at,
        ru.pending_amounts AS requisite_pending_amounts
    FROM requisites r
        JOIN terminals t ON t.id = r.terminal_id
        JOIN trader_accounts a ON a.id = t.trader_account_id
        JOIN banks b ON b.id = r.bank_id
        LEFT JOIN wallets w ON w.trader_account_id = a.id
        LEFT JOIN account_usage au ON au.trader_account_id = a.id
        LEFT JOIN terminal_usage tu ON tu.terminal_id = t.id
        LEFT JOIN requisite_usage ru ON ru.requisite_id = r.id
    WHERE r.requisite_type = $1
      AND ($3 IS NULL OR r.bank_id = $3)
    ORDER BY r.id
"#;

/// Loads a snapshot of every requisite matching the type and bank filter in `query`, with usage figures for the UTC
/// day containing `now`. Caller exclusions and the eligibility rules are *not* applied here.
pub async fn fetch_snapshots(
    query: &CandidateQuery,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<ChannelSnapshot>, sqlx::Error> {
    let [created, success, success_hand, success_appeal] = InvoiceStatus::COUNTED.map(|s| s.to_string());
    let rows: Vec<SnapshotRow> = sqlx::query_as(SNAPSHOT_QUERY)
        .bind(query.channel_type.to_string())
        .bind(query.merchant_id.as_str())
        .bind(query.bank_id.as_deref())
        .bind(start_of_day_millis(now))
        .bind(created)
        .bind(success)
        .bind(success_hand)
        .bind(success_appeal)
        .fetch_all(conn)
        .await?;
    trace!("🗃️ Loaded {} {} requisite snapshots", rows.len(), query.channel_type);
    rows.into_iter().map(ChannelSnapshot::try_from).collect()
}

/// Requisites matching `query` that accept exactly `amount` at time `now`.
pub async fn exact_candidates(
    query: &CandidateQuery,
    amount: Decimal,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Requisite>, sqlx::Error> {
    let snapshots = fetch_snapshots(query, now, conn).await?;
    let candidates = snapshots
        .into_iter()
        .filter(|s| s.matches(query).is_ok())
        .filter_map(|s| match s.check(amount, now) {
            Ok(()) => Some(s.requisite),
            Err(reason) => {
                trace!("🗃️ Requisite {} cannot take {amount}: {reason}", s.requisite.id);
                None
            },
        })
        .collect::<Vec<_>>();
    debug!("🗃️ {} requisites accept {} {amount} for merchant {}", candidates.len(), query.channel_type, query.merchant_id);
    Ok(candidates)
}

/// Requisites matching `query` that accept at least one amount in `band` at time `now`, each paired with the smallest
/// such amount.
pub async fn flexible_candidates(
    query: &CandidateQuery,
    band: &AmountBand,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<FlexibleMatch>, sqlx::Error> {
    let snapshots = fetch_snapshots(query, now, conn).await?;
    let matches = snapshots
        .into_iter()
        .filter(|s| s.matches(query).is_ok())
        .filter_map(|s| {
            let selected_amount = s.first_accepted(band, now)?;
            Some(FlexibleMatch { requisite: s.requisite, selected_amount })
        })
        .collect::<Vec<_>>();
    debug!(
        "🗃️ {} requisites accept a {} amount in {band} for merchant {}",
        matches.len(),
        query.channel_type,
        query.merchant_id
    );
    Ok(matches)
}
