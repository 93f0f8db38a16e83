//! # Backend contracts
//!
//! This module defines the interfaces that payin engine database *backends* must provide.
//!
//! The engine itself is stateless. Everything that changes between requests (pending invoices, balances, quotas,
//! merchant thresholds, the exchange rate) lives behind one of these traits.
//!
//! * [`CandidateRepository`] returns the requisites that can take an invoice for a given amount right now.
//! * [`InvoicePersistence`] stores a freshly assembled invoice and assigns its id.
//! * [`MerchantStore`] looks up merchant records for the pre-allocation checks.
//! * [`AuxDataSource`] supplies the two slowly changing facts the engine reads on every request: the exchange rate and
//!   the set of boosted teams. [`crate::cache::AuxCache`] is an `AuxDataSource` that fronts another one.
//! * [`PayinDatabase`] is the umbrella trait for a backend that does all of the above.
mod aux_data;
mod candidate_repository;
mod invoice_persistence;
mod merchant_store;
mod payin_database;

pub use aux_data::{AuxDataError, AuxDataSource};
pub use candidate_repository::{CandidateError, CandidateQuery, CandidateRepository};
pub use invoice_persistence::{InvoicePersistence, InvoiceStoreError};
pub use merchant_store::{MerchantStore, MerchantStoreError};
pub use payin_database::PayinDatabase;
