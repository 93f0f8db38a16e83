use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AuxDataError {
    #[error("Could not read from the data source: {0}")]
    Source(String),
    #[error("The value has not been configured: {0}")]
    NotConfigured(String),
}

impl From<sqlx::Error> for AuxDataError {
    fn from(e: sqlx::Error) -> Self {
        AuxDataError::Source(e.to_string())
    }
}

/// Slowly changing values read on every invoice request. Both reads are free of side effects.
#[allow(async_fn_in_trait)]
pub trait AuxDataSource {
    /// The current exchange rate to stamp on new invoices.
    async fn fetch_exchange_rate(&self) -> Result<Decimal, AuxDataError>;
    /// Ids of the teams whose requisites are currently preferred during allocation.
    async fn fetch_boosted_team_ids(&self) -> Result<Vec<String>, AuxDataError>;
}
