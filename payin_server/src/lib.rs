//! # Payin server
//! This crate hosts the HTTP front end of the pay-in gateway. It is responsible for:
//! Accepting invoice requests from merchants.
//! Handing them to the [`payin_engine::InvoiceFlowApi`], which picks a requisite and stores the invoice.
//! Reporting the outcome back to the merchant in a stable JSON envelope.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/invoice-in`: Creates a pay-in invoice.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
