use thiserror::Error;

use crate::db_types::Merchant;

#[derive(Debug, Clone, Error)]
pub enum MerchantStoreError {
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for MerchantStoreError {
    fn from(e: sqlx::Error) -> Self {
        MerchantStoreError::Database(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait MerchantStore {
    /// Fetches the merchant with the given id. If no such merchant exists, `None` is returned.
    async fn fetch_merchant(&self, merchant_id: &str) -> Result<Option<Merchant>, MerchantStoreError>;
}
