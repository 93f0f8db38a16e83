use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    db_types::{FlexibleMatch, Requisite, RequisiteType},
    eligibility::{AmountBand, InvalidConstraintInput},
};

#[derive(Debug, Clone, Error)]
pub enum CandidateError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("{0}")]
    InvalidConstraintInput(#[from] InvalidConstraintInput),
}

impl From<sqlx::Error> for CandidateError {
    fn from(e: sqlx::Error) -> Self {
        CandidateError::Database(e.to_string())
    }
}

/// The static part of a candidate search: who is asking, for which requisite type, and which requisites to skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateQuery {
    pub merchant_id: String,
    pub channel_type: RequisiteType,
    /// When set, only requisites at this bank qualify
    pub bank_id: Option<String>,
    /// Requisite ids that must not be returned, e.g. ones lost to a concurrent allocation
    pub excluded_requisites: Vec<String>,
}

impl CandidateQuery {
    pub fn new<S: Into<String>>(merchant_id: S, channel_type: RequisiteType) -> Self {
        Self { merchant_id: merchant_id.into(), channel_type, bank_id: None, excluded_requisites: Vec::new() }
    }

    pub fn with_bank(mut self, bank_id: Option<String>) -> Self {
        self.bank_id = bank_id.filter(|b| !b.is_empty());
        self
    }

    pub fn excluding(mut self, requisite_id: &str) -> Self {
        self.excluded_requisites.push(requisite_id.to_string());
        self
    }
}

/// Finds requisites that may receive a new invoice.
///
/// Implementations must apply every rule in [`crate::eligibility`] using aggregates over today's counted invoices.
/// An empty result is a normal outcome and is never reported as an error.
#[allow(async_fn_in_trait)]
pub trait CandidateRepository {
    /// All requisites matching `query` that accept exactly `amount`.
    async fn query_exact(&self, query: &CandidateQuery, amount: Decimal) -> Result<Vec<Requisite>, CandidateError>;

    /// All requisites matching `query` that accept at least one amount in `band`. Each match carries the smallest such
    /// amount.
    async fn query_flexible(
        &self,
        query: &CandidateQuery,
        band: &AmountBand,
    ) -> Result<Vec<FlexibleMatch>, CandidateError>;
}
