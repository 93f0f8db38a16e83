//! SQLite database module for the payin engine.
//!
//! [`SqliteDatabase`] implements every backend trait. The free functions in [`db`] do the actual work against a
//! `&mut SqliteConnection` and can be combined inside a transaction.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
