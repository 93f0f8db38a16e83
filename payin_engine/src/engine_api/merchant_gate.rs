use std::fmt::Debug;

use log::*;
use rust_decimal::Decimal;

use crate::{
    db_types::RequisiteType,
    engine_api::errors::MerchantGateError,
    traits::MerchantStore,
};

/// The pre-allocation check. A request that fails here never reaches the allocation engine.
pub struct MerchantGate<B> {
    db: B,
}

impl<B> Debug for MerchantGate<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MerchantGate")
    }
}

impl<B> MerchantGate<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> MerchantGate<B>
where B: MerchantStore
{
    /// Checks that the merchant exists, that `channel_type` names a known requisite type and that `amount` is not
    /// below the merchant's minimum for that type. Returns the parsed requisite type.
    pub async fn validate(
        &self,
        merchant_id: &str,
        amount: Decimal,
        channel_type: &str,
    ) -> Result<RequisiteType, MerchantGateError> {
        let merchant = self
            .db
            .fetch_merchant(merchant_id)
            .await?
            .ok_or_else(|| MerchantGateError::MerchantNotFound(merchant_id.to_string()))?;
        let channel_type = channel_type.parse::<RequisiteType>()?;
        let minimum = merchant.min_amount_for(channel_type);
        if amount < minimum {
            debug!("🚦️ Merchant {merchant_id} rejected {channel_type} {amount}. The minimum is {minimum}");
            return Err(MerchantGateError::AmountBelowMerchantMinimum {
                merchant_id: merchant_id.to_string(),
                channel_type,
                amount,
                minimum,
            });
        }
        Ok(channel_type)
    }
}
