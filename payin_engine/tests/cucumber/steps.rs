use cucumber::{then, when};
use payin_engine::{sqlite::db::invoices, NewInvoiceRequest};
use rust_decimal::Decimal;

use crate::cucumber::PayinWorld;

fn invoice_request(merchant_id: &str, channel_type: &str, amount: i64) -> NewInvoiceRequest {
    NewInvoiceRequest {
        merchant_id: merchant_id.to_string(),
        amount: Decimal::from(amount),
        channel_type: channel_type.to_string(),
        internal_request_id: format!("{merchant_id}-{amount}"),
        callback_url: "https://merchant.example/callback".into(),
        callback_key: "s3cr3t".into(),
        active_time: 0,
        bank_id: None,
        flexible_range: None,
        allow_flexible_amount: false,
    }
}

#[when(expr = "merchant {word} requests a {word} invoice for {int}")]
async fn request_invoice(world: &mut PayinWorld, merchant_id: String, channel_type: String, amount: i64) {
    let request = invoice_request(&merchant_id, &channel_type, amount);
    let outcome = world.api().create_invoice(request).await;
    world.last_outcome = Some(outcome);
}

#[when(expr = "merchant {word} requests a {word} invoice for {int} allowing a flexible amount within {int}")]
async fn request_flexible_invoice(
    world: &mut PayinWorld,
    merchant_id: String,
    channel_type: String,
    amount: i64,
    range: u32,
) {
    let mut request = invoice_request(&merchant_id, &channel_type, amount);
    request.allow_flexible_amount = true;
    request.flexible_range = Some(range);
    let outcome = world.api().create_invoice(request).await;
    world.last_outcome = Some(outcome);
}

#[when(expr = "merchant {word} requests {int} {word} invoices starting at {int} in steps of {int}")]
async fn request_many_invoices(
    world: &mut PayinWorld,
    merchant_id: String,
    count: i64,
    channel_type: String,
    start: i64,
    step: i64,
) {
    for i in 0..count {
        let request = invoice_request(&merchant_id, &channel_type, start + i * step);
        let invoice = world.api().create_invoice(request).await.expect("Error creating invoice");
        world.issued.push(invoice);
    }
}

#[then(expr = "the invoice is issued on requisite {word} for {int}")]
async fn check_invoice(world: &mut PayinWorld, requisite_id: String, amount: i64) {
    let issued = world.last_invoice();
    let invoice = &issued.invoice;
    assert_eq!(invoice.requisite_id, requisite_id, "Invoice was issued on the wrong requisite");
    assert_eq!(issued.requisite.id, requisite_id);
    assert_eq!(invoice.amount, Decimal::from(amount), "Invoice amount is incorrect");
    assert_eq!(invoice.terminal_id, format!("term-{requisite_id}"));
    assert_eq!(invoice.trader_account_id, format!("acc-{requisite_id}"));
}

#[then("the invoice has a flexible amount")]
async fn check_flexible(world: &mut PayinWorld) {
    assert!(world.last_invoice().invoice.is_flexible_amount, "Expected a flexible amount");
}

#[then("the invoice has a fixed amount")]
async fn check_fixed(world: &mut PayinWorld) {
    assert!(!world.last_invoice().invoice.is_flexible_amount, "Expected a fixed amount");
}

#[then(expr = "the invoice carries the exchange rate {word}")]
async fn check_exchange_rate(world: &mut PayinWorld, rate: String) {
    assert_eq!(world.last_invoice().invoice.exchange_rate.to_string(), rate);
}

#[then(expr = "every invoice is issued on requisite {word}")]
async fn check_all_invoices(world: &mut PayinWorld, requisite_id: String) {
    assert!(!world.issued.is_empty(), "No invoices were issued");
    for invoice in world.issued.iter().map(|i| &i.invoice) {
        assert_eq!(invoice.requisite_id, requisite_id, "Invoice for {} went to the wrong requisite", invoice.amount);
    }
}

#[then(expr = "the request fails with {string}")]
async fn check_failure(world: &mut PayinWorld, message: String) {
    match world.last_outcome.as_ref().expect("No invoice has been requested") {
        Ok(issued) => panic!("Expected the request to fail, but invoice {} was issued", issued.invoice.id),
        Err(e) => assert_eq!(e.public_message(), message),
    }
}

#[then(expr = "the database holds {int} invoice(s)")]
async fn check_invoice_count(world: &mut PayinWorld, count: i64) {
    let mut conn = world.db().pool().acquire().await.expect("Error acquiring connection");
    let stored = invoices::count_invoices(&mut conn).await.expect("Error counting invoices");
    assert_eq!(stored, count, "Unexpected number of stored invoices");
}
