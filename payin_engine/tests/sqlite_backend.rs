//! Exercises the SQLite backend against a real, freshly migrated database.
use std::{collections::HashSet, sync::Arc, time::Duration as StdDuration};

use chrono::{DateTime, Duration, TimeZone, Utc};
use payin_engine::{
    db_types::{InvoiceStatus, Merchant, NewInvoice, RequisiteType},
    eligibility::AmountBand,
    helpers::ManualClock,
    sqlite::db::{aux_data, invoices, merchants, seed},
    test_utils::prepare_env::new_test_database,
    traits::{
        AuxDataError,
        AuxDataSource,
        CandidateQuery,
        CandidateRepository,
        InvoicePersistence,
        InvoiceStoreError,
        MerchantStore,
        PayinDatabase,
    },
    SqliteDatabase,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const MERCHANT: &str = "M1";

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

async fn setup() -> (SqliteDatabase, ManualClock) {
    let clock = ManualClock::new(noon());
    let db = new_test_database().await.with_clock(Arc::new(clock.clone()));
    let mut conn = db.pool().acquire().await.unwrap();
    seed::insert_bank("sber", "Sberbank", &mut conn).await.unwrap();
    seed::insert_bank("tbank", "T-Bank", &mut conn).await.unwrap();
    let merchant = Merchant {
        id: MERCHANT.into(),
        in_limit_card: dec!(50),
        in_limit_wallet: dec!(10),
        in_limit_sbp: dec!(100),
    };
    merchants::upsert_merchant(&merchant, &mut conn).await.unwrap();
    (db, clock)
}

async fn add_card(db: &SqliteDatabase, id: &str, bank: &str) {
    let mut conn = db.pool().acquire().await.unwrap();
    seed::insert_channel(id, RequisiteType::Card, bank, None, MERCHANT, &mut conn).await.unwrap();
}

/// An invoice on a requisite created by [`seed::insert_channel`].
fn invoice_on(requisite_id: &str, amount: Decimal, status: InvoiceStatus, at: DateTime<Utc>) -> NewInvoice {
    NewInvoice {
        merchant_id: MERCHANT.into(),
        amount,
        status,
        channel_type: RequisiteType::Card,
        is_flexible_amount: false,
        terminal_id: format!("term-{requisite_id}"),
        user_id: format!("user-acc-{requisite_id}"),
        bank_id: "sber".into(),
        trader_account_id: format!("acc-{requisite_id}"),
        requisite_id: requisite_id.into(),
        callback_url: "https://merchant.example/cb".into(),
        callback_key: String::new(),
        internal_request_id: "req-1".into(),
        created_at: at,
        expires_at: at + Duration::minutes(15),
        exchange_rate: dec!(92.5),
    }
}

async fn store(db: &SqliteDatabase, invoice: &NewInvoice) -> String {
    let mut conn = db.pool().acquire().await.unwrap();
    invoices::insert_invoice(invoice, &mut conn).await.unwrap()
}

fn ids<'a, I: IntoIterator<Item = &'a str>>(ids: I) -> HashSet<String> {
    ids.into_iter().map(String::from).collect()
}

async fn exact_ids(db: &SqliteDatabase, query: &CandidateQuery, amount: Decimal) -> HashSet<String> {
    db.query_exact(query, amount).await.unwrap().into_iter().map(|r| r.id).collect()
}

#[tokio::test]
async fn exact_query_returns_every_permissive_requisite() {
    let (db, _) = setup().await;
    add_card(&db, "C1", "sber").await;
    add_card(&db, "C2", "tbank").await;
    let query = CandidateQuery::new(MERCHANT, RequisiteType::Card);
    assert_eq!(exact_ids(&db, &query, dec!(100)).await, ids(["C1", "C2"]));

    let requisites = db.query_exact(&query, dec!(100)).await.unwrap();
    let c1 = requisites.iter().find(|r| r.id == "C1").unwrap();
    assert_eq!(c1.terminal_id, "term-C1");
    assert_eq!(c1.trader_account_id, "acc-C1");
    assert_eq!(c1.bank_name, "Sberbank");
    assert_eq!(c1.card_number, "2200700000000000");
}

#[tokio::test]
async fn type_bank_and_exclusions_narrow_the_pool() {
    let (db, _) = setup().await;
    add_card(&db, "C1", "sber").await;
    add_card(&db, "C2", "tbank").await;
    let mut conn = db.pool().acquire().await.unwrap();
    seed::insert_channel("S1", RequisiteType::Sbp, "sber", None, MERCHANT, &mut conn).await.unwrap();
    drop(conn);

    let cards = CandidateQuery::new(MERCHANT, RequisiteType::Card);
    let sber_cards = cards.clone().with_bank(Some("sber".into()));
    assert_eq!(exact_ids(&db, &sber_cards, dec!(100)).await, ids(["C1"]));
    let excluded = cards.clone().excluding("C1");
    assert_eq!(exact_ids(&db, &excluded, dec!(100)).await, ids(["C2"]));
    let sbp = CandidateQuery::new(MERCHANT, RequisiteType::Sbp);
    assert_eq!(exact_ids(&db, &sbp, dec!(100)).await, ids(["S1"]));
}

#[tokio::test]
async fn unauthorized_merchants_see_nothing() {
    let (db, _) = setup().await;
    add_card(&db, "C1", "sber").await;
    let mut conn = db.pool().acquire().await.unwrap();
    let other = Merchant { id: "M2".into(), ..merchants::fetch_merchant(MERCHANT, &mut conn).await.unwrap().unwrap() };
    merchants::upsert_merchant(&other, &mut conn).await.unwrap();
    drop(conn);
    let query = CandidateQuery::new("M2", RequisiteType::Card);
    assert!(exact_ids(&db, &query, dec!(100)).await.is_empty());
}

#[tokio::test]
async fn blocked_levels_and_amount_bounds_are_respected() {
    let (db, _) = setup().await;
    let mut conn = db.pool().acquire().await.unwrap();
    // A blocked trader account
    let mut account = seed::TraderAccountSeed::new("acc-blocked");
    account.is_blocked = true;
    seed::insert_trader_account(&account, &mut conn).await.unwrap();
    merchants::authorize_merchant(MERCHANT, "acc-blocked", &mut conn).await.unwrap();
    seed::insert_terminal(&seed::TerminalSeed::new("term-blocked", "acc-blocked"), &mut conn).await.unwrap();
    let req = seed::RequisiteSeed::new("C-blocked", "term-blocked", RequisiteType::Card, "sber");
    seed::insert_requisite(&req, &mut conn).await.unwrap();
    // A requisite that only takes 200..=500
    let account = seed::TraderAccountSeed::new("acc-narrow");
    seed::insert_trader_account(&account, &mut conn).await.unwrap();
    merchants::authorize_merchant(MERCHANT, "acc-narrow", &mut conn).await.unwrap();
    seed::insert_terminal(&seed::TerminalSeed::new("term-narrow", "acc-narrow"), &mut conn).await.unwrap();
    let mut req = seed::RequisiteSeed::new("C-narrow", "term-narrow", RequisiteType::Card, "sber");
    req.min_invoice_amount = dec!(200);
    req.max_invoice_amount = dec!(500);
    seed::insert_requisite(&req, &mut conn).await.unwrap();
    drop(conn);

    let query = CandidateQuery::new(MERCHANT, RequisiteType::Card);
    assert!(exact_ids(&db, &query, dec!(100)).await.is_empty());
    assert_eq!(exact_ids(&db, &query, dec!(200)).await, ids(["C-narrow"]));
    assert_eq!(exact_ids(&db, &query, dec!(500)).await, ids(["C-narrow"]));
    assert!(exact_ids(&db, &query, dec!(500.01)).await.is_empty());
}

#[tokio::test]
async fn pending_amount_blocks_the_same_amount_only() {
    let (db, _) = setup().await;
    add_card(&db, "C1", "sber").await;
    store(&db, &invoice_on("C1", dec!(100), InvoiceStatus::Created, noon())).await;
    let query = CandidateQuery::new(MERCHANT, RequisiteType::Card);
    assert!(exact_ids(&db, &query, dec!(100)).await.is_empty());
    assert_eq!(exact_ids(&db, &query, dec!(105)).await, ids(["C1"]));
}

#[tokio::test]
async fn yesterdays_and_cancelled_invoices_do_not_count() {
    let (db, _) = setup().await;
    add_card(&db, "C1", "sber").await;
    store(&db, &invoice_on("C1", dec!(100), InvoiceStatus::Created, noon() - Duration::days(1))).await;
    store(&db, &invoice_on("C1", dec!(100), InvoiceStatus::Cancelled, noon())).await;
    let query = CandidateQuery::new(MERCHANT, RequisiteType::Card);
    assert_eq!(exact_ids(&db, &query, dec!(100)).await, ids(["C1"]));
}

#[tokio::test]
async fn daily_invoice_ceiling_resets_at_midnight() {
    let (db, clock) = setup().await;
    let mut conn = db.pool().acquire().await.unwrap();
    seed::insert_trader_account(&seed::TraderAccountSeed::new("acc-C1"), &mut conn).await.unwrap();
    merchants::authorize_merchant(MERCHANT, "acc-C1", &mut conn).await.unwrap();
    seed::insert_terminal(&seed::TerminalSeed::new("term-C1", "acc-C1"), &mut conn).await.unwrap();
    let mut req = seed::RequisiteSeed::new("C1", "term-C1", RequisiteType::Card, "sber");
    req.daily_limit_invoices = Some(2);
    seed::insert_requisite(&req, &mut conn).await.unwrap();
    drop(conn);

    store(&db, &invoice_on("C1", dec!(100), InvoiceStatus::Success, noon())).await;
    let query = CandidateQuery::new(MERCHANT, RequisiteType::Card);
    assert_eq!(exact_ids(&db, &query, dec!(150)).await, ids(["C1"]));
    store(&db, &invoice_on("C1", dec!(110), InvoiceStatus::SuccessHand, noon())).await;
    assert!(exact_ids(&db, &query, dec!(150)).await.is_empty());

    clock.set(Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap());
    assert_eq!(exact_ids(&db, &query, dec!(150)).await, ids(["C1"]));
}

#[tokio::test]
async fn requisite_cooldown_elapses() {
    let (db, clock) = setup().await;
    let mut conn = db.pool().acquire().await.unwrap();
    seed::insert_trader_account(&seed::TraderAccountSeed::new("acc-C1"), &mut conn).await.unwrap();
    merchants::authorize_merchant(MERCHANT, "acc-C1", &mut conn).await.unwrap();
    seed::insert_terminal(&seed::TerminalSeed::new("term-C1", "acc-C1"), &mut conn).await.unwrap();
    let mut req = seed::RequisiteSeed::new("C1", "term-C1", RequisiteType::Card, "sber");
    req.invoice_interval = 10;
    seed::insert_requisite(&req, &mut conn).await.unwrap();
    drop(conn);

    store(&db, &invoice_on("C1", dec!(100), InvoiceStatus::Success, noon())).await;
    let query = CandidateQuery::new(MERCHANT, RequisiteType::Card);
    clock.advance(Duration::minutes(5));
    assert!(exact_ids(&db, &query, dec!(200)).await.is_empty());
    clock.advance(Duration::minutes(5));
    assert_eq!(exact_ids(&db, &query, dec!(200)).await, ids(["C1"]));
}

#[tokio::test]
async fn balance_must_exceed_pending_sum() {
    let (db, _) = setup().await;
    add_card(&db, "C1", "sber").await;
    let mut conn = db.pool().acquire().await.unwrap();
    seed::set_pay_in_balance("acc-C1", dec!(300), &mut conn).await.unwrap();
    drop(conn);
    let query = CandidateQuery::new(MERCHANT, RequisiteType::Card);
    store(&db, &invoice_on("C1", dec!(200), InvoiceStatus::Created, noon())).await;
    assert_eq!(exact_ids(&db, &query, dec!(100)).await, ids(["C1"]));
    store(&db, &invoice_on("C1", dec!(100), InvoiceStatus::Created, noon())).await;
    assert!(exact_ids(&db, &query, dec!(50)).await.is_empty());
}

#[tokio::test]
async fn terminal_daily_money_limit() {
    let (db, _) = setup().await;
    let mut conn = db.pool().acquire().await.unwrap();
    seed::insert_trader_account(&seed::TraderAccountSeed::new("acc-C1"), &mut conn).await.unwrap();
    merchants::authorize_merchant(MERCHANT, "acc-C1", &mut conn).await.unwrap();
    let mut terminal = seed::TerminalSeed::new("term-C1", "acc-C1");
    terminal.daily_limit_money = Some(dec!(1000));
    seed::insert_terminal(&terminal, &mut conn).await.unwrap();
    seed::insert_requisite(&seed::RequisiteSeed::new("C1", "term-C1", RequisiteType::Card, "sber"), &mut conn)
        .await
        .unwrap();
    drop(conn);

    store(&db, &invoice_on("C1", dec!(900), InvoiceStatus::Success, noon())).await;
    let query = CandidateQuery::new(MERCHANT, RequisiteType::Card);
    assert_eq!(exact_ids(&db, &query, dec!(100)).await, ids(["C1"]));
    assert!(exact_ids(&db, &query, dec!(100.01)).await.is_empty());
}

#[tokio::test]
async fn flexible_query_picks_the_smallest_free_amount() {
    let (db, _) = setup().await;
    add_card(&db, "C1", "sber").await;
    add_card(&db, "C2", "sber").await;
    store(&db, &invoice_on("C1", dec!(100), InvoiceStatus::Created, noon())).await;
    store(&db, &invoice_on("C2", dec!(100), InvoiceStatus::Created, noon())).await;
    store(&db, &invoice_on("C2", dec!(105), InvoiceStatus::Created, noon())).await;

    let query = CandidateQuery::new(MERCHANT, RequisiteType::Card);
    let band = AmountBand::new(dec!(100), dec!(120), dec!(5)).unwrap();
    let mut matches = db.query_flexible(&query, &band).await.unwrap();
    matches.sort_by(|a, b| a.requisite.id.cmp(&b.requisite.id));
    let found = matches.iter().map(|m| (m.requisite.id.as_str(), m.selected_amount)).collect::<Vec<_>>();
    assert_eq!(found, vec![("C1", dec!(105)), ("C2", dec!(110))]);
}

#[tokio::test]
async fn insert_refuses_a_second_pending_invoice_for_the_same_amount() {
    let (db, _) = setup().await;
    add_card(&db, "C1", "sber").await;
    let first = invoice_on("C1", dec!(100), InvoiceStatus::Created, noon());
    let id = db.insert_invoice(&first).await.unwrap();
    let err = db.insert_invoice(&first).await.unwrap_err();
    assert!(matches!(err, InvoiceStoreError::ChannelConflict(ref r) if r == "C1"));
    // A different amount on the same requisite is fine
    db.insert_invoice(&invoice_on("C1", dec!(105), InvoiceStatus::Created, noon())).await.unwrap();

    let mut conn = db.pool().acquire().await.unwrap();
    assert_eq!(invoices::count_invoices(&mut conn).await.unwrap(), 2);
    let stored = invoices::fetch_invoice(&id, &mut conn).await.unwrap().unwrap();
    assert_eq!(stored.amount, dec!(100));
    assert_eq!(stored.status, InvoiceStatus::Created);
    assert_eq!(stored.exchange_rate, dec!(92.5));
    assert_eq!(stored.created_at, noon());

    // Once the first one is paid, the amount is free again
    assert!(invoices::update_invoice_status(&id, InvoiceStatus::Success, &mut conn).await.unwrap());
    drop(conn);
    db.insert_invoice(&first).await.unwrap();
}

#[tokio::test]
async fn a_cancelled_insert_leaves_no_transaction_behind() {
    let (db, _) = setup().await;
    add_card(&db, "C1", "sber").await;
    // One connection, so a transaction left open would break every later insert
    let single = SqliteDatabase::new_with_url(db.url(), 1).await.unwrap();
    let deadlines = [1u64, 10, 50, 100, 250, 500, 1_000, 5_000];
    for (i, micros) in deadlines.into_iter().enumerate() {
        let amount = Decimal::from(100 + 20 * i as i64);
        let cancelled = invoice_on("C1", amount, InvoiceStatus::Created, noon());
        let _ = tokio::time::timeout(StdDuration::from_micros(micros), single.insert_invoice(&cancelled)).await;
        let next = invoice_on("C1", amount + dec!(5), InvoiceStatus::Created, noon());
        single.insert_invoice(&next).await.expect("Insert after a cancelled insert failed");
    }
    let mut conn = single.pool().acquire().await.unwrap();
    let stored = invoices::fetch_invoices_for_requisite("C1", &mut conn).await.unwrap();
    let followups = stored.iter().filter(|i| (i.amount - dec!(5)) % dec!(20) == Decimal::ZERO).count();
    assert_eq!(followups, deadlines.len());
    assert!(stored.len() <= 2 * deadlines.len());
}

#[tokio::test]
async fn merchants_are_fetched_with_their_thresholds() {
    let (db, _) = setup().await;
    let merchant = db.fetch_merchant(MERCHANT).await.unwrap().unwrap();
    assert_eq!(merchant.min_amount_for(RequisiteType::Card), dec!(50));
    assert_eq!(merchant.min_amount_for(RequisiteType::Wallet), dec!(10));
    assert_eq!(merchant.min_amount_for(RequisiteType::Sbp), dec!(100));
    assert!(db.fetch_merchant("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn auxiliary_data_is_read_from_settings_and_teams() {
    let (db, _) = setup().await;
    let err = db.fetch_exchange_rate().await.unwrap_err();
    assert!(matches!(err, AuxDataError::NotConfigured(_)));

    let mut conn = db.pool().acquire().await.unwrap();
    aux_data::set_exchange_rate(dec!(91.25), noon(), &mut conn).await.unwrap();
    seed::insert_team("T1", false, &mut conn).await.unwrap();
    seed::insert_team("T2", true, &mut conn).await.unwrap();
    assert!(aux_data::set_team_boost("T1", true, &mut conn).await.unwrap());
    assert!(!aux_data::set_team_boost("T9", true, &mut conn).await.unwrap());
    drop(conn);

    assert_eq!(db.fetch_exchange_rate().await.unwrap(), dec!(91.25));
    assert_eq!(db.fetch_boosted_team_ids().await.unwrap(), vec!["T1".to_string(), "T2".to_string()]);
}
