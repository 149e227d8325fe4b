//! Exact-decimal helpers.
//!
//! Every price, quantity and balance is a [`Decimal`]; binary floating point
//! never enters the engine. Values arriving at the boundary are quantised to
//! a fixed number of places with half-up rounding.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{CallmatchError, Result};

/// Round `value` to `places` decimal places, ties away from zero.
#[must_use]
pub fn quantize(value: Decimal, places: u32) -> Decimal {
    value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

/// `a × b`, or [`CallmatchError::ArithmeticOverflow`].
pub fn checked_mul(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_mul(b)
        .ok_or_else(|| CallmatchError::ArithmeticOverflow(format!("{a} * {b}")))
}

/// `a + b`, or [`CallmatchError::ArithmeticOverflow`].
pub fn checked_add(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b)
        .ok_or_else(|| CallmatchError::ArithmeticOverflow(format!("{a} + {b}")))
}

/// Sum that fails instead of panicking when it leaves `Decimal` range.
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Result<Decimal> {
    values.into_iter().try_fold(Decimal::ZERO, checked_add)
}

/// Parse decimal text and quantise it.
///
/// # Errors
/// Returns [`CallmatchError::InvalidDecimal`] if `text` is not a decimal number.
pub fn parse_decimal(text: &str, places: u32) -> Result<Decimal> {
    let value = Decimal::from_str(text.trim())
        .map_err(|_| CallmatchError::InvalidDecimal(text.to_string()))?;
    Ok(quantize(value, places))
}
