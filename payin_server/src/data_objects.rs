use chrono::{DateTime, Utc};
use payin_common::CURRENCY_CODE;
use payin_engine::{db_types::IssuedInvoice, NewInvoiceRequest, MAX_FLEXIBLE_RANGE};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

/// The body of `POST /api/invoice-in`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub amount: i64,
    #[serde(rename = "internalRequestID", default)]
    pub internal_request_id: String,
    #[serde(default)]
    pub callback_url: String,
    #[serde(default)]
    pub callback_key: String,
    #[serde(rename = "merchantID", default)]
    pub merchant_id: String,
    #[serde(rename = "type", default)]
    pub requisite_type: String,
    /// Minutes
    #[serde(default)]
    pub active_time: u32,
    #[serde(default)]
    pub bank_id: String,
    #[serde(default)]
    pub flexible_range: u32,
    #[serde(default)]
    pub allow_flexible_amount: bool,
}

impl CreateInvoiceRequest {
    pub fn validate(&self) -> Result<(), ServerError> {
        let reason = if self.amount <= 0 {
            "invalid amount"
        } else if self.merchant_id.is_empty() {
            "empty merchantId field"
        } else if self.callback_url.is_empty() {
            "empty callbackUrl field"
        } else if self.requisite_type.is_empty() {
            "empty requisiteType field"
        } else if self.flexible_range > MAX_FLEXIBLE_RANGE {
            "invalid flexible range"
        } else {
            return Ok(());
        };
        Err(ServerError::InvalidRequestBody(reason.to_string()))
    }
}

impl From<CreateInvoiceRequest> for NewInvoiceRequest {
    fn from(req: CreateInvoiceRequest) -> Self {
        NewInvoiceRequest {
            merchant_id: req.merchant_id,
            amount: Decimal::from(req.amount),
            channel_type: req.requisite_type,
            internal_request_id: req.internal_request_id,
            callback_url: req.callback_url,
            callback_key: req.callback_key,
            active_time: req.active_time,
            bank_id: Some(req.bank_id).filter(|b| !b.is_empty()),
            flexible_range: Some(req.flexible_range).filter(|r| *r > 0),
            allow_flexible_amount: req.allow_flexible_amount,
        }
    }
}

/// The envelope every invoice response is wrapped in. `data` is only present on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInvoiceResponse {
    pub status: String,
    pub error: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<CreateInvoiceResponseData>,
}

impl CreateInvoiceResponse {
    pub fn success(data: CreateInvoiceResponseData) -> Self {
        Self { status: "ok".into(), error: false, message: "success".into(), data: Some(data) }
    }

    pub fn failure<S: Into<String>>(message: S) -> Self {
        Self { status: "error".into(), error: true, message: message.into(), data: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceResponseData {
    pub invoice_id: String,
    pub invoice_status: String,
    pub amount: String,
    pub is_flexible_amount: bool,
    pub currency_code: String,
    pub merchant_id: String,
    pub internal_request_id: String,
    pub callback_url: String,
    pub callback_key: String,
    pub phone_number: String,
    pub wallet_number: String,
    pub card_number: String,
    pub card_name: String,
    pub issuer: String,
    pub time_expires: DateTime<Utc>,
}

impl From<IssuedInvoice> for CreateInvoiceResponseData {
    fn from(issued: IssuedInvoice) -> Self {
        let IssuedInvoice { invoice, requisite } = issued;
        Self {
            invoice_id: invoice.id,
            invoice_status: invoice.status.to_string(),
            amount: invoice.amount.normalize().to_string(),
            is_flexible_amount: invoice.is_flexible_amount,
            currency_code: CURRENCY_CODE.to_string(),
            merchant_id: invoice.merchant_id,
            internal_request_id: invoice.internal_request_id,
            callback_url: invoice.callback_url,
            callback_key: invoice.callback_key,
            phone_number: requisite.phone_number,
            wallet_number: requisite.wallet_number,
            card_number: requisite.card_number,
            card_name: requisite.recipient_name,
            issuer: requisite.bank_name,
            time_expires: invoice.expires_at,
        }
    }
}
