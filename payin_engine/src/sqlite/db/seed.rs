//! Helpers for populating a database with banks, teams, trader accounts, terminals and requisites.
//!
//! The engine never writes these tables. The helpers exist for tests and for setting up a local development database.
//! Every `*Seed` struct has permissive defaults: active, unblocked, no ceilings, a large balance. Tests override only
//! the fields they care about.
use rust_decimal::Decimal;
use sqlx::SqliteConnection;

use super::amount_to_db;
use crate::db_types::RequisiteType;

pub async fn insert_bank(id: &str, name: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO banks (id, name) VALUES ($1, $2) ON CONFLICT (id) DO UPDATE SET name = excluded.name")
        .bind(id)
        .bind(name)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn insert_team(id: &str, is_boosted: bool, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO teams (id, name, is_boosted) VALUES ($1, $1, $2) ON CONFLICT (id) DO UPDATE SET is_boosted = $2",
    )
    .bind(id)
    .bind(is_boosted)
    .execute(conn)
    .await?;
    Ok(())
}

//--------------------------------------    Trader accounts    ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct TraderAccountSeed {
    pub id: String,
    pub user_id: String,
    pub team_id: Option<String>,
    pub is_can_work: bool,
    pub is_blocked: bool,
    pub is_work_on_card_pay_in: bool,
    pub is_work_on_wallet_pay_in: bool,
    pub is_work_on_sbp_pay_in: bool,
    pub min_invoice_amount_card: Decimal,
    pub min_invoice_amount_wallet: Decimal,
    pub min_invoice_amount_sbp: Decimal,
    pub max_invoice_amount: Decimal,
    pub max_active_invoices_in: Option<i64>,
    pub pay_in_balance: Decimal,
}

impl TraderAccountSeed {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            user_id: format!("user-{id}"),
            team_id: None,
            is_can_work: true,
            is_blocked: false,
            is_work_on_card_pay_in: true,
            is_work_on_wallet_pay_in: true,
            is_work_on_sbp_pay_in: true,
            min_invoice_amount_card: Decimal::ZERO,
            min_invoice_amount_wallet: Decimal::ZERO,
            min_invoice_amount_sbp: Decimal::ZERO,
            max_invoice_amount: Decimal::from(1_000_000),
            max_active_invoices_in: None,
            pay_in_balance: Decimal::from(1_000_000),
        }
    }

    pub fn in_team(mut self, team_id: &str) -> Self {
        self.team_id = Some(team_id.to_string());
        self
    }
}

/// Inserts the trader account together with its wallet.
pub async fn insert_trader_account(account: &TraderAccountSeed, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO trader_accounts (
                id,
                user_id,
                team_id,
                is_can_work,
                is_blocked,
                is_work_on_card_pay_in,
                is_work_on_wallet_pay_in,
                is_work_on_sbp_pay_in,
                min_invoice_amount_card,
                min_invoice_amount_wallet,
                min_invoice_amount_sbp,
                max_invoice_amount,
                max_active_invoices_in
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(&account.id)
    .bind(&account.user_id)
    .bind(account.team_id.as_deref())
    .bind(account.is_can_work)
    .bind(account.is_blocked)
    .bind(account.is_work_on_card_pay_in)
    .bind(account.is_work_on_wallet_pay_in)
    .bind(account.is_work_on_sbp_pay_in)
    .bind(amount_to_db(account.min_invoice_amount_card)?)
    .bind(amount_to_db(account.min_invoice_amount_wallet)?)
    .bind(amount_to_db(account.min_invoice_amount_sbp)?)
    .bind(amount_to_db(account.max_invoice_amount)?)
    .bind(account.max_active_invoices_in)
    .execute(&mut *conn)
    .await?;
    sqlx::query("INSERT INTO wallets (id, trader_account_id, pay_in_balance) VALUES ($1, $2, $3)")
        .bind(format!("wallet-{}", account.id))
        .bind(&account.id)
        .bind(amount_to_db(account.pay_in_balance)?)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn set_pay_in_balance(
    trader_account_id: &str,
    balance: Decimal,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE wallets SET pay_in_balance = $1 WHERE trader_account_id = $2")
        .bind(amount_to_db(balance)?)
        .bind(trader_account_id)
        .execute(conn)
        .await?;
    Ok(())
}

//--------------------------------------       Terminals       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct TerminalSeed {
    pub id: String,
    pub trader_account_id: String,
    pub is_can_work: bool,
    pub is_blocked: bool,
    pub min_invoice_amount: Decimal,
    pub max_invoice_amount: Decimal,
    pub daily_limit_money: Option<Decimal>,
    pub max_active_invoice: Option<i64>,
    pub daily_limit_invoices: Option<i64>,
    pub invoice_interval: i64,
}

impl TerminalSeed {
    pub fn new(id: &str, trader_account_id: &str) -> Self {
        Self {
            id: id.to_string(),
            trader_account_id: trader_account_id.to_string(),
            is_can_work: true,
            is_blocked: false,
            min_invoice_amount: Decimal::ZERO,
            max_invoice_amount: Decimal::from(1_000_000),
            daily_limit_money: None,
            max_active_invoice: None,
            daily_limit_invoices: None,
            invoice_interval: 0,
        }
    }
}

pub async fn insert_terminal(terminal: &TerminalSeed, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    let daily_limit_money = terminal.daily_limit_money.map(amount_to_db).transpose()?;
    sqlx::query(
        r#"
            INSERT INTO terminals (
                id,
                trader_account_id,
                is_can_work,
                is_blocked,
                min_invoice_amount,
                max_invoice_amount,
                daily_limit_money,
                max_active_invoice,
                daily_limit_invoices,
                invoice_interval
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(&terminal.id)
    .bind(&terminal.trader_account_id)
    .bind(terminal.is_can_work)
    .bind(terminal.is_blocked)
    .bind(amount_to_db(terminal.min_invoice_amount)?)
    .bind(amount_to_db(terminal.max_invoice_amount)?)
    .bind(daily_limit_money)
    .bind(terminal.max_active_invoice)
    .bind(terminal.daily_limit_invoices)
    .bind(terminal.invoice_interval)
    .execute(conn)
    .await?;
    Ok(())
}

//--------------------------------------       Requisites      ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct RequisiteSeed {
    pub id: String,
    pub terminal_id: String,
    pub requisite_type: RequisiteType,
    pub bank_id: String,
    pub phone_number: String,
    pub card_number: String,
    pub wallet_number: String,
    pub recipient_name: String,
    pub is_can_work: bool,
    pub is_blocked: bool,
    pub min_invoice_amount: Decimal,
    pub max_invoice_amount: Decimal,
    pub max_active_invoice: Option<i64>,
    pub daily_limit_invoices: Option<i64>,
    pub invoice_interval: i64,
}

impl RequisiteSeed {
    pub fn new(id: &str, terminal_id: &str, requisite_type: RequisiteType, bank_id: &str) -> Self {
        let (phone_number, card_number, wallet_number) = match requisite_type {
            RequisiteType::Card => (String::new(), "2200700000000000".to_string(), String::new()),
            RequisiteType::Wallet => (String::new(), String::new(), format!("W-{id}")),
            RequisiteType::Sbp => ("+79000000000".to_string(), String::new(), String::new()),
        };
        Self {
            id: id.to_string(),
            terminal_id: terminal_id.to_string(),
            requisite_type,
            bank_id: bank_id.to_string(),
            phone_number,
            card_number,
            wallet_number,
            recipient_name: format!("Holder {id}"),
            is_can_work: true,
            is_blocked: false,
            min_invoice_amount: Decimal::ZERO,
            max_invoice_amount: Decimal::from(1_000_000),
            max_active_invoice: None,
            daily_limit_invoices: None,
            invoice_interval: 0,
        }
    }
}

pub async fn insert_requisite(requisite: &RequisiteSeed, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO requisites (
                id,
                terminal_id,
                requisite_type,
                bank_id,
                phone_number,
                card_number,
                wallet_number,
                recipient_name,
                is_can_work,
                is_blocked,
                min_invoice_amount,
                max_invoice_amount,
                max_active_invoice,
                daily_limit_invoices,
                invoice_interval
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        "#,
    )
    .bind(&requisite.id)
    .bind(&requisite.terminal_id)
    .bind(requisite.requisite_type.to_string())
    .bind(&requisite.bank_id)
    .bind(&requisite.phone_number)
    .bind(&requisite.card_number)
    .bind(&requisite.wallet_number)
    .bind(&requisite.recipient_name)
    .bind(requisite.is_can_work)
    .bind(requisite.is_blocked)
    .bind(amount_to_db(requisite.min_invoice_amount)?)
    .bind(amount_to_db(requisite.max_invoice_amount)?)
    .bind(requisite.max_active_invoice)
    .bind(requisite.daily_limit_invoices)
    .bind(requisite.invoice_interval)
    .execute(conn)
    .await?;
    Ok(())
}

/// Sets up a complete, fully permissive channel in one go: a trader account (in `team_id`, if given) authorized for
/// `merchant_id`, a terminal `term-{requisite_id}` and the requisite itself. The bank, team and merchant must already
/// exist.
pub async fn insert_channel(
    requisite_id: &str,
    requisite_type: RequisiteType,
    bank_id: &str,
    team_id: Option<&str>,
    merchant_id: &str,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    let account_id = format!("acc-{requisite_id}");
    let terminal_id = format!("term-{requisite_id}");
    let mut account = TraderAccountSeed::new(&account_id);
    account.team_id = team_id.map(String::from);
    insert_trader_account(&account, &mut *conn).await?;
    super::merchants::authorize_merchant(merchant_id, &account_id, &mut *conn).await?;
    insert_terminal(&TerminalSeed::new(&terminal_id, &account_id), &mut *conn).await?;
    insert_requisite(&RequisiteSeed::new(requisite_id, &terminal_id, requisite_type, bank_id), conn).await?;
    Ok(())
}
