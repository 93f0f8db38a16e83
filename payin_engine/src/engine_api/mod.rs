//! # Payin engine public API
//!
//! The `engine_api` module exposes the programmatic API of the payin engine. Each component is usable on its own, and
//! [`InvoiceFlowApi`](invoice_flow_api::InvoiceFlowApi) strings them together into the full invoice flow:
//!
//! * [`merchant_gate`] checks the merchant and its per-type minimum amounts before anything else happens.
//! * [`allocation_engine`] picks the requisite, falling back to flexible amounts and preferring boosted teams.
//! * [`invoice_assembler`] stamps the exchange rate and expiry on the invoice and stores it.
//! * [`invoice_flow_api`] runs the three in order, with an optional allocation timeout and a bounded retry when a
//!   requisite is claimed by a concurrent invoice.
//!
//! # API usage
//!
//! An API instance is created by supplying a database backend that implements the backend traits it needs, and an
//! auxiliary data source (usually an [`AuxCache`](crate::cache::AuxCache) in front of the same database).
//!
//! ```rust,ignore
//! use payin_engine::{cache::{AuxCache, MemoryCache}, InvoiceFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/payin.db", 25).await?;
//! let aux = AuxCache::new(db.clone(), MemoryCache::default());
//! let api = InvoiceFlowApi::new(db, aux);
//! let invoice = api.create_invoice(request).await?;
//! ```
pub mod allocation_engine;
pub mod errors;
pub mod invoice_assembler;
pub mod invoice_flow_api;
pub mod merchant_gate;
pub mod request_objects;
