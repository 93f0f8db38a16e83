use rust_decimal::{prelude::ToPrimitive, Decimal};
use thiserror::Error;

/// The currency every pay-in invoice is denominated in.
pub const CURRENCY_CODE: &str = "RUB";

/// Amounts are persisted as integer kopecks.
pub const MINOR_UNIT_SCALE: u32 = 2;

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in minor units: {0}")]
pub struct MinorUnitsConversionError(String);

/// Converts a decimal amount into integer minor units.
///
/// Amounts with more precision than [`MINOR_UNIT_SCALE`] cannot be stored without loss, and are rejected rather than
/// silently rounded.
pub fn to_minor_units(amount: Decimal) -> Result<i64, MinorUnitsConversionError> {
    let scaled = amount * Decimal::from(10i64.pow(MINOR_UNIT_SCALE));
    if scaled.fract() != Decimal::ZERO {
        return Err(MinorUnitsConversionError(format!("{amount} has more than {MINOR_UNIT_SCALE} decimal places")));
    }
    scaled.to_i64().ok_or_else(|| MinorUnitsConversionError(format!("{amount} is out of range")))
}

pub fn from_minor_units(value: i64) -> Decimal {
    Decimal::new(value, MINOR_UNIT_SCALE).normalize()
}
