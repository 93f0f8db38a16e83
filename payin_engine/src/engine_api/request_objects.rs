use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{db_types::RequisiteType, traits::CandidateQuery};

/// The widest flexible range a merchant may ask for, in whole currency units.
pub const MAX_FLEXIBLE_RANGE: u32 = 10_000;

/// A merchant's request for a new pay-in invoice, as received from the transport layer.
///
/// The requisite type is kept as the raw string the merchant sent. It is parsed by the merchant gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvoiceRequest {
    pub merchant_id: String,
    pub amount: Decimal,
    pub channel_type: String,
    pub internal_request_id: String,
    pub callback_url: String,
    pub callback_key: String,
    /// Minutes until the invoice expires. Zero selects the default.
    pub active_time: u32,
    pub bank_id: Option<String>,
    /// How far above the requested amount a flexible match may go. `None` or zero selects the default.
    pub flexible_range: Option<u32>,
    pub allow_flexible_amount: bool,
}

impl NewInvoiceRequest {
    /// Checks the fields that must be present before any lookup is made.
    pub fn validate(&self) -> Result<(), String> {
        if self.amount <= Decimal::ZERO {
            return Err("invalid amount".into());
        }
        if self.merchant_id.trim().is_empty() {
            return Err("invalid merchant id".into());
        }
        if self.callback_url.trim().is_empty() {
            return Err("invalid callback url".into());
        }
        if self.flexible_range.is_some_and(|r| r > MAX_FLEXIBLE_RANGE) {
            return Err("invalid flexible range".into());
        }
        Ok(())
    }

    pub fn allocation_request(&self, channel_type: RequisiteType) -> AllocationRequest {
        AllocationRequest {
            merchant_id: self.merchant_id.clone(),
            amount: self.amount,
            channel_type,
            bank_id: self.bank_id.clone().filter(|b| !b.is_empty()),
            flexible_range: self.flexible_range,
            allow_flexible_amount: self.allow_flexible_amount,
            excluded_requisites: Vec::new(),
        }
    }

    pub fn merchant_context(&self) -> MerchantContext {
        MerchantContext {
            merchant_id: self.merchant_id.clone(),
            internal_request_id: self.internal_request_id.clone(),
            callback_url: self.callback_url.clone(),
            callback_key: self.callback_key.clone(),
        }
    }
}

/// What the allocation engine needs to pick a requisite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRequest {
    pub merchant_id: String,
    pub amount: Decimal,
    pub channel_type: RequisiteType,
    pub bank_id: Option<String>,
    pub flexible_range: Option<u32>,
    pub allow_flexible_amount: bool,
    /// Requisites that must not be picked, typically ones lost to a concurrent invoice
    pub excluded_requisites: Vec<String>,
}

impl AllocationRequest {
    pub fn new<S: Into<String>>(merchant_id: S, amount: Decimal, channel_type: RequisiteType) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            amount,
            channel_type,
            bank_id: None,
            flexible_range: None,
            allow_flexible_amount: false,
            excluded_requisites: Vec::new(),
        }
    }

    pub fn with_bank<S: Into<String>>(mut self, bank_id: S) -> Self {
        self.bank_id = Some(bank_id.into());
        self
    }

    pub fn flexible(mut self, range: Option<u32>) -> Self {
        self.allow_flexible_amount = true;
        self.flexible_range = range;
        self
    }

    pub fn candidate_query(&self) -> CandidateQuery {
        let mut query = CandidateQuery::new(self.merchant_id.as_str(), self.channel_type).with_bank(self.bank_id.clone());
        query.excluded_requisites.clone_from(&self.excluded_requisites);
        query
    }
}

/// Merchant-supplied details copied onto the invoice verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerchantContext {
    pub merchant_id: String,
    pub internal_request_id: String,
    pub callback_url: String,
    pub callback_key: String,
}
