//! Payin Engine
//!
//! The payin engine accepts a merchant's request to fund an incoming payment (an *invoice*) and binds it to exactly
//! one payment channel (a *requisite*: a card, wallet or SBP phone number) drawn from a large, constantly changing
//! pool.
//!
//! The library is divided into these sections:
//! 1. The domain types ([`mod@db_types`]) and the rules deciding whether a requisite may take an invoice
//!    ([`mod@eligibility`]).
//! 2. The backend contracts ([`mod@traits`]). Specific backends need to implement these traits in order to act as a
//!    backend for the payin server. A SQLite backend is provided (feature `sqlite`, on by default).
//! 3. The auxiliary data cache ([`mod@cache`]), which keeps the exchange rate and the boosted team list close at hand.
//! 4. The public API ([`mod@engine_api`]): merchant checks, requisite allocation and invoice assembly.
pub mod cache;
pub mod db_types;
pub mod eligibility;
pub mod engine_api;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(all(feature = "sqlite", any(feature = "test_utils", test)))]
pub mod test_utils;

pub use engine_api::{
    allocation_engine::{AllocationEngine, AllocationPolicy, ChannelPicker},
    errors::{AllocationError, AssemblyError, InvoiceFlowError, MerchantGateError},
    invoice_assembler::InvoiceAssembler,
    invoice_flow_api::{FlowSettings, InvoiceFlowApi},
    merchant_gate::MerchantGate,
    request_objects::{AllocationRequest, MerchantContext, NewInvoiceRequest, MAX_FLEXIBLE_RANGE},
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::PayinDatabase;
