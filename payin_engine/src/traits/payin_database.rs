use crate::traits::{AuxDataSource, CandidateRepository, InvoicePersistence, MerchantStore};

/// The highest level of behaviour for backends supporting the payin engine.
///
/// A `PayinDatabase` can answer every question the invoice flow asks: it looks up merchants, finds candidate
/// requisites, stores invoices and serves the auxiliary data. It is cheap to clone, so each engine component can hold
/// its own handle.
pub trait PayinDatabase: Clone + CandidateRepository + InvoicePersistence + MerchantStore + AuxDataSource {
    /// The URL of the database
    fn url(&self) -> &str;
}
