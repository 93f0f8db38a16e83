use actix_web::http::StatusCode;
use serde_json::json;

use super::helpers::{api_for, get_request, post_request, seeded_database};
use crate::data_objects::CreateInvoiceResponse;

fn invoice_body(merchant: &str, requisite_type: &str, amount: i64) -> String {
    json!({
        "amount": amount,
        "internalRequestID": "order-881",
        "callbackUrl": "https://shop.example/callback",
        "callbackKey": "k3y",
        "merchantID": merchant,
        "type": requisite_type,
        "activeTime": 30,
        "bankId": "",
        "flexibleRange": 0,
        "allowFlexibleAmount": false
    })
    .to_string()
}

fn failure(body: &str) -> String {
    let response: CreateInvoiceResponse = serde_json::from_str(body).expect("Not a response envelope");
    assert_eq!(response.status, "error");
    assert!(response.error);
    assert!(response.data.is_none());
    response.message
}

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init().ok();
    let api = api_for(seeded_database(true).await);
    let (status, body) = get_request("/health", api).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn create_invoice() {
    let _ = env_logger::try_init().ok();
    let api = api_for(seeded_database(true).await);
    let (status, body) = post_request("/api/invoice-in", &invoice_body("M1", "CARD", 100), api).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: CreateInvoiceResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.status, "ok");
    assert!(!response.error);
    assert_eq!(response.message, "success");
    let data = response.data.expect("Missing invoice data");
    assert_eq!(data.invoice_status, "CREATED");
    assert_eq!(data.amount, "100");
    assert!(!data.is_flexible_amount);
    assert_eq!(data.currency_code, "RUB");
    assert_eq!(data.merchant_id, "M1");
    assert_eq!(data.internal_request_id, "order-881");
    assert_eq!(data.callback_key, "k3y");
    assert_eq!(data.card_number, "2200700000000000");
    assert_eq!(data.card_name, "Holder C1");
    assert_eq!(data.issuer, "Sberbank");
    assert!(!data.invoice_id.is_empty());
}

#[actix_web::test]
async fn unknown_merchant() {
    let _ = env_logger::try_init().ok();
    let api = api_for(seeded_database(true).await);
    let (status, body) = post_request("/api/invoice-in", &invoice_body("M404", "CARD", 100), api).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(failure(&body), "merchant not found");
}

#[actix_web::test]
async fn amount_below_merchant_minimum() {
    let _ = env_logger::try_init().ok();
    let api = api_for(seeded_database(true).await);
    let (status, body) = post_request("/api/invoice-in", &invoice_body("M1", "CARD", 49), api).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(failure(&body), "amount less than limit");
}

#[actix_web::test]
async fn unknown_requisite_type() {
    let _ = env_logger::try_init().ok();
    let api = api_for(seeded_database(true).await);
    let (status, body) = post_request("/api/invoice-in", &invoice_body("M1", "crypto", 100), api).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(failure(&body), "unknown requisite type");
}

#[actix_web::test]
async fn invalid_amount() {
    let _ = env_logger::try_init().ok();
    let api = api_for(seeded_database(true).await);
    let (status, body) = post_request("/api/invoice-in", &invoice_body("M1", "CARD", -5), api).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(failure(&body), "invalid amount");
}

#[actix_web::test]
async fn malformed_body() {
    let _ = env_logger::try_init().ok();
    let api = api_for(seeded_database(true).await);
    let (status, body) = post_request("/api/invoice-in", r#"{"amount": "a lot"}"#, api).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(failure(&body).starts_with("parse request body"));
}

#[actix_web::test]
async fn no_available_requisites() {
    let _ = env_logger::try_init().ok();
    let api = api_for(seeded_database(true).await);
    let (status, body) = post_request("/api/invoice-in", &invoice_body("M1", "SBP", 100), api).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(failure(&body), "no available requisites");
}

#[actix_web::test]
async fn missing_exchange_rate() {
    let _ = env_logger::try_init().ok();
    let api = api_for(seeded_database(false).await);
    let (status, body) = post_request("/api/invoice-in", &invoice_body("M1", "CARD", 100), api).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(failure(&body), "failed to get exchange rate");
}

#[actix_web::test]
async fn oversized_flexible_range() {
    let _ = env_logger::try_init().ok();
    let api = api_for(seeded_database(true).await);
    let mut body: serde_json::Value = serde_json::from_str(&invoice_body("M1", "CARD", 100)).unwrap();
    body["allowFlexibleAmount"] = json!(true);
    body["flexibleRange"] = json!(u32::MAX);
    let (status, body) = post_request("/api/invoice-in", &body.to_string(), api).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(failure(&body), "invalid flexible range");
}
