use thiserror::Error;

use crate::db_types::NewInvoice;

#[derive(Debug, Clone, Error)]
pub enum InvoiceStoreError {
    #[error("Database error: {0}")]
    Database(String),
    /// Another invoice claimed the requisite for the same amount between selection and the write.
    #[error("Requisite {0} is no longer available for this amount")]
    ChannelConflict(String),
}

impl From<sqlx::Error> for InvoiceStoreError {
    fn from(e: sqlx::Error) -> Self {
        InvoiceStoreError::Database(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait InvoicePersistence {
    /// Durably stores the invoice and returns the id assigned to it.
    ///
    /// The write must fail with [`InvoiceStoreError::ChannelConflict`] if the requisite already has a pending invoice
    /// for the same amount today. This closes the window between selecting a requisite and recording the invoice.
    async fn insert_invoice(&self, invoice: &NewInvoice) -> Result<String, InvoiceStoreError>;
}
