//! Display rounding.
//!
//! Engine arithmetic stays in unrounded `f64`; these helpers are applied
//! only when a value is shown to a user.

use rust_decimal::prelude::*;

const MONEY_PLACES: u32 = 2;

#[inline]
fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

#[inline]
fn round_to(value: f64, places: u32) -> f64 {
    to_decimal(value)
        .round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Currency amount, 2 decimal places, half away from zero.
pub fn round_money(value: f64) -> f64 {
    round_to(value, MONEY_PLACES)
}

/// Percentages are shown with the same precision as money.
pub fn round_percent(value: f64) -> f64 {
    round_to(value, MONEY_PLACES)
}

/// Whole points.
pub fn round_points(value: f64) -> f64 {
    round_to(value, 0)
}
