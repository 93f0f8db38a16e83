//! `SqliteDatabase` is a concrete implementation of a payin engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::{fmt::Debug, sync::Arc};

use log::*;
use rust_decimal::Decimal;
use sqlx::SqlitePool;

use super::db::{aux_data, db_url, invoices, merchants, new_pool, requisites};
use crate::{
    db_types::{FlexibleMatch, Merchant, NewInvoice, Requisite},
    eligibility::AmountBand,
    helpers::{SharedClock, SystemClock},
    traits::{
        AuxDataError,
        AuxDataSource,
        CandidateError,
        CandidateQuery,
        CandidateRepository,
        InvoicePersistence,
        InvoiceStoreError,
        MerchantStore,
        MerchantStoreError,
        PayinDatabase,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
    clock: SharedClock,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl PayinDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }
}

impl CandidateRepository for SqliteDatabase {
    async fn query_exact(&self, query: &CandidateQuery, amount: Decimal) -> Result<Vec<Requisite>, CandidateError> {
        let mut conn = self.pool.acquire().await?;
        let candidates = requisites::exact_candidates(query, amount, self.clock.now(), &mut conn).await?;
        Ok(candidates)
    }

    async fn query_flexible(
        &self,
        query: &CandidateQuery,
        band: &AmountBand,
    ) -> Result<Vec<FlexibleMatch>, CandidateError> {
        let mut conn = self.pool.acquire().await?;
        let matches = requisites::flexible_candidates(query, band, self.clock.now(), &mut conn).await?;
        Ok(matches)
    }
}

impl InvoicePersistence for SqliteDatabase {
    async fn insert_invoice(&self, invoice: &NewInvoice) -> Result<String, InvoiceStoreError> {
        // If this future is dropped before the commit, dropping `tx` rolls the insert back
        let mut tx = self.pool.begin().await?;
        match invoices::reserve_and_insert(invoice, &mut tx).await {
            Ok(id) => {
                tx.commit().await?;
                Ok(id)
            },
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!("🗃️ Could not roll back the invoice transaction. {rollback}");
                }
                Err(e)
            },
        }
    }
}

impl MerchantStore for SqliteDatabase {
    async fn fetch_merchant(&self, merchant_id: &str) -> Result<Option<Merchant>, MerchantStoreError> {
        let mut conn = self.pool.acquire().await?;
        let merchant = merchants::fetch_merchant(merchant_id, &mut conn).await?;
        Ok(merchant)
    }
}

impl AuxDataSource for SqliteDatabase {
    async fn fetch_exchange_rate(&self) -> Result<Decimal, AuxDataError> {
        let mut conn = self.pool.acquire().await?;
        aux_data::fetch_exchange_rate(&mut conn).await
    }

    async fn fetch_boosted_team_ids(&self) -> Result<Vec<String>, AuxDataError> {
        let mut conn = self.pool.acquire().await?;
        let ids = aux_data::fetch_boosted_team_ids(&mut conn).await?;
        Ok(ids)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool, clock: Arc::new(SystemClock) })
    }

    /// Replaces the clock used for today's usage window and cooldowns.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies any outstanding schema migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}
