use std::str::FromStr;

use chrono::{Duration, Utc};
use cucumber::given;
use payin_engine::{
    db_types::{InvoiceStatus, Merchant, NewInvoice, RequisiteType},
    sqlite::db::{aux_data, invoices, merchants, seed},
};
use rust_decimal::Decimal;

use crate::cucumber::{payin_world::PayinSystem, PayinWorld};

pub const BANK: &str = "sber";

#[given("a fresh install")]
async fn fresh_database(world: &mut PayinWorld) {
    let system = PayinSystem::new().await;
    let mut conn = system.db.pool().acquire().await.expect("Error acquiring connection");
    seed::insert_bank(BANK, "Sberbank", &mut conn).await.expect("Error creating bank");
    drop(conn);
    world.system = Some(system);
}

#[given(expr = "merchant {word} with a minimum invoice amount of {int}")]
async fn merchant_with_minimum(world: &mut PayinWorld, merchant_id: String, minimum: i64) {
    let minimum = Decimal::from(minimum);
    let merchant = Merchant { id: merchant_id, in_limit_card: minimum, in_limit_wallet: minimum, in_limit_sbp: minimum };
    let mut conn = world.db().pool().acquire().await.expect("Error acquiring connection");
    merchants::upsert_merchant(&merchant, &mut conn).await.expect("Error creating merchant");
}

#[given(expr = "team {word} is boosted")]
async fn boosted_team(world: &mut PayinWorld, team_id: String) {
    let mut conn = world.db().pool().acquire().await.expect("Error acquiring connection");
    seed::insert_team(&team_id, true, &mut conn).await.expect("Error creating team");
}

#[given(expr = "team {word} is not boosted")]
async fn ordinary_team(world: &mut PayinWorld, team_id: String) {
    let mut conn = world.db().pool().acquire().await.expect("Error acquiring connection");
    seed::insert_team(&team_id, false, &mut conn).await.expect("Error creating team");
}

#[given(expr = "a {word} requisite {word} for merchant {word}")]
async fn requisite(world: &mut PayinWorld, channel_type: String, requisite_id: String, merchant_id: String) {
    add_requisite(world, &channel_type, &requisite_id, None, &merchant_id).await;
}

#[given(expr = "a {word} requisite {word} in team {word} for merchant {word}")]
async fn requisite_in_team(
    world: &mut PayinWorld,
    channel_type: String,
    requisite_id: String,
    team_id: String,
    merchant_id: String,
) {
    add_requisite(world, &channel_type, &requisite_id, Some(&team_id), &merchant_id).await;
}

async fn add_requisite(
    world: &mut PayinWorld,
    channel_type: &str,
    requisite_id: &str,
    team_id: Option<&str>,
    merchant_id: &str,
) {
    let channel_type = RequisiteType::from_str(channel_type).expect("Not a valid requisite type");
    let mut conn = world.db().pool().acquire().await.expect("Error acquiring connection");
    seed::insert_channel(requisite_id, channel_type, BANK, team_id, merchant_id, &mut conn)
        .await
        .expect("Error creating requisite");
    drop(conn);
    world.system().requisite_types.insert(requisite_id.to_string(), channel_type);
}

#[given(expr = "requisite {word} already has a pending invoice for {int} from merchant {word}")]
async fn pending_invoice(world: &mut PayinWorld, requisite_id: String, amount: i64, merchant_id: String) {
    let channel_type = *world.system().requisite_types.get(&requisite_id).expect("Unknown requisite");
    let now = Utc::now();
    let invoice = NewInvoice {
        merchant_id,
        amount: Decimal::from(amount),
        status: InvoiceStatus::Created,
        channel_type,
        is_flexible_amount: false,
        terminal_id: format!("term-{requisite_id}"),
        user_id: format!("user-acc-{requisite_id}"),
        bank_id: BANK.into(),
        trader_account_id: format!("acc-{requisite_id}"),
        requisite_id,
        callback_url: "https://merchant.example/earlier".into(),
        callback_key: String::new(),
        internal_request_id: "earlier".into(),
        created_at: now,
        expires_at: now + Duration::minutes(15),
        exchange_rate: Decimal::ONE,
    };
    let mut conn = world.db().pool().acquire().await.expect("Error acquiring connection");
    invoices::insert_invoice(&invoice, &mut conn).await.expect("Error creating invoice");
}

#[given(expr = "the exchange rate is {word}")]
async fn exchange_rate(world: &mut PayinWorld, rate: String) {
    let rate = Decimal::from_str(&rate).expect("Not a valid exchange rate");
    let mut conn = world.db().pool().acquire().await.expect("Error acquiring connection");
    aux_data::set_exchange_rate(rate, Utc::now(), &mut conn).await.expect("Error setting exchange rate");
}
