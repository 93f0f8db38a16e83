use std::{fmt::Debug, sync::Arc};

use chrono::Duration;
use log::*;

use crate::{
    db_types::{Allocation, Invoice, InvoiceStatus, NewInvoice},
    engine_api::{errors::AssemblyError, request_objects::MerchantContext},
    helpers::{SharedClock, SystemClock},
    traits::{AuxDataSource, InvoicePersistence},
};

pub const DEFAULT_ACTIVE_TIME_MINUTES: u32 = 15;

/// Turns an allocation into a stored invoice, stamped with the current exchange rate and an expiry time.
pub struct InvoiceAssembler<B, A> {
    db: B,
    aux: A,
    clock: SharedClock,
}

impl<B, A> Debug for InvoiceAssembler<B, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InvoiceAssembler")
    }
}

impl<B, A> InvoiceAssembler<B, A> {
    pub fn new(db: B, aux: A) -> Self {
        Self { db, aux, clock: Arc::new(SystemClock) }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }
}

impl<B, A> InvoiceAssembler<B, A>
where
    B: InvoicePersistence,
    A: AuxDataSource,
{
    /// Builds and stores the invoice for `allocation`.
    ///
    /// `active_time` is the lifetime of the invoice in minutes, with zero meaning
    /// [`DEFAULT_ACTIVE_TIME_MINUTES`]. If the exchange rate cannot be read, nothing is stored.
    pub async fn build(
        &self,
        allocation: &Allocation,
        merchant: &MerchantContext,
        active_time: u32,
    ) -> Result<Invoice, AssemblyError> {
        let exchange_rate = self.aux.fetch_exchange_rate().await.map_err(|e| {
            error!(
                "🧾️ No exchange rate for merchant {} invoice of {}. {e}",
                merchant.merchant_id, allocation.amount
            );
            AssemblyError::ExchangeRateUnavailable(e)
        })?;
        let active_time = if active_time == 0 { DEFAULT_ACTIVE_TIME_MINUTES } else { active_time };
        let now = self.clock.now();
        let requisite = &allocation.requisite;
        let invoice = NewInvoice {
            merchant_id: merchant.merchant_id.clone(),
            amount: allocation.amount,
            status: InvoiceStatus::Created,
            channel_type: requisite.channel_type,
            is_flexible_amount: allocation.is_flexible,
            terminal_id: requisite.terminal_id.clone(),
            user_id: requisite.user_id.clone(),
            bank_id: requisite.bank_id.clone(),
            trader_account_id: requisite.trader_account_id.clone(),
            requisite_id: requisite.id.clone(),
            callback_url: merchant.callback_url.clone(),
            callback_key: merchant.callback_key.clone(),
            internal_request_id: merchant.internal_request_id.clone(),
            created_at: now,
            expires_at: now + Duration::minutes(i64::from(active_time)),
            exchange_rate,
        };
        let id = self.db.insert_invoice(&invoice).await?;
        info!(
            "🧾️ Invoice {id} created for merchant {} on requisite {} ({} {})",
            invoice.merchant_id, invoice.requisite_id, invoice.channel_type, invoice.amount
        );
        Ok(invoice.into_invoice(id))
    }
}
