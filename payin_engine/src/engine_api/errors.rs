use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    db_types::{RequisiteType, UnknownChannelType},
    eligibility::InvalidConstraintInput,
    traits::{AuxDataError, CandidateError, InvoiceStoreError, MerchantStoreError},
};

#[derive(Debug, Clone, Error)]
pub enum MerchantGateError {
    #[error("Merchant {0} does not exist")]
    MerchantNotFound(String),
    #[error("{0}")]
    UnknownChannelType(#[from] UnknownChannelType),
    #[error("Amount {amount} is below the {channel_type} minimum of {minimum} for merchant {merchant_id}")]
    AmountBelowMerchantMinimum { merchant_id: String, channel_type: RequisiteType, amount: Decimal, minimum: Decimal },
    #[error("Could not look up the merchant. {0}")]
    StoreError(#[from] MerchantStoreError),
}

#[derive(Debug, Clone, Error)]
pub enum AllocationError {
    #[error("No requisites are available for merchant {merchant_id}, {channel_type} {amount}")]
    NoAvailableChannels { merchant_id: String, channel_type: RequisiteType, amount: Decimal },
    #[error("{0}")]
    InvalidConstraintInput(#[from] InvalidConstraintInput),
    #[error("Candidate lookup failed. {0}")]
    RepositoryError(String),
}

impl From<CandidateError> for AllocationError {
    fn from(e: CandidateError) -> Self {
        match e {
            CandidateError::InvalidConstraintInput(e) => AllocationError::InvalidConstraintInput(e),
            CandidateError::Database(s) => AllocationError::RepositoryError(s),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum AssemblyError {
    #[error("Could not get the exchange rate. {0}")]
    ExchangeRateUnavailable(#[from] AuxDataError),
    #[error("Requisite {0} was taken by another invoice before this one could be stored")]
    ChannelConflict(String),
    #[error("Could not store the invoice. {0}")]
    InvoiceCreationFailed(String),
}

impl From<InvoiceStoreError> for AssemblyError {
    fn from(e: InvoiceStoreError) -> Self {
        match e {
            InvoiceStoreError::ChannelConflict(id) => AssemblyError::ChannelConflict(id),
            InvoiceStoreError::Database(s) => AssemblyError::InvoiceCreationFailed(s),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum InvoiceFlowError {
    #[error("Invalid invoice request: {0}")]
    InvalidRequest(String),
    #[error("{0}")]
    GateError(#[from] MerchantGateError),
    #[error("{0}")]
    AllocationError(#[from] AllocationError),
    #[error("Requisite allocation did not finish within {0} ms")]
    AllocationTimedOut(u128),
    #[error("{0}")]
    AssemblyError(#[from] AssemblyError),
}

impl InvoiceFlowError {
    /// A short message that is safe to show to the merchant. Backend and transport details never appear in it.
    pub fn public_message(&self) -> String {
        let msg = match self {
            InvoiceFlowError::InvalidRequest(reason) => return reason.clone(),
            InvoiceFlowError::GateError(MerchantGateError::MerchantNotFound(_)) => "merchant not found",
            InvoiceFlowError::GateError(MerchantGateError::UnknownChannelType(_)) => "unknown requisite type",
            InvoiceFlowError::GateError(MerchantGateError::AmountBelowMerchantMinimum { .. }) => "amount less than limit",
            InvoiceFlowError::GateError(MerchantGateError::StoreError(_)) => "failed to find merchant",
            InvoiceFlowError::AllocationError(AllocationError::InvalidConstraintInput(_)) => "invalid flexible range",
            InvoiceFlowError::AllocationError(_) => "no available requisites",
            InvoiceFlowError::AllocationTimedOut(_) => "no available requisites",
            InvoiceFlowError::AssemblyError(AssemblyError::ExchangeRateUnavailable(_)) => "failed to get exchange rate",
            InvoiceFlowError::AssemblyError(_) => "failed to create invoice",
        };
        msg.to_string()
    }
}
