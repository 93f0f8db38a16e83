pub mod helpers;
mod money;
mod secret;

pub use money::{from_minor_units, to_minor_units, MinorUnitsConversionError, CURRENCY_CODE, MINOR_UNIT_SCALE};
pub use secret::Secret;
