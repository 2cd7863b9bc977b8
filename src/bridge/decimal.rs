//! Conversions between binary floating point and exact decimals.
//!
//! Stored simulation values are frequently `f64`. They are converted through
//! their shortest round-trip text form, so `0.1f64` becomes exactly `0.1` rather
//! than the binary expansion `0.1000000000000000055511151231`.

use std::str::FromStr;

use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::error::NucdiffError;

/// Converts an `f64` cell to a decimal.
///
/// NaN is a missing cell. Infinities and magnitudes beyond the decimal range
/// (about 7.9e28) are also missing, with a warning, so one extreme value never
/// stops a run.
pub fn decimal_from_f64(value: f64) -> Option<Decimal> {
    if value.is_nan() {
        return None;
    }
    let text = value.to_string();
    let decimal = Decimal::from_str(&text)
        .ok()
        .or_else(|| Decimal::from_f64(value));
    if decimal.is_none() {
        log::warn!("{} is outside the decimal range; treating it as missing", text);
    }
    decimal
}

/// Converts a decimal back to the nearest `f64`, for outputs that only store doubles.
pub fn decimal_to_f64(value: Decimal) -> Result<f64, NucdiffError> {
    value.to_f64().ok_or_else(|| {
        NucdiffError::DecimalConversion(format!("{} cannot be represented as f64", value))
    })
}
