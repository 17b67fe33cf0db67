//! Reward/points converter.
//!
//! `ratio` is always points per currency unit. Values stay unrounded here;
//! callers round with [`crate::money`] when they display.

use serde::{Deserialize, Serialize};

use crate::card::RewardConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsDisplay {
    pub points_amount: f64,
    pub points_currency: String,
    /// Cash equivalent of `points_amount`, for comparing across reward units
    pub points_cash_value: Option<f64>,
    /// Spend per point, e.g. dollars per mile
    pub cost_per_point: Option<f64>,
}

/// `None` for cash-rebate cards.
pub fn to_display(config: &RewardConfig, reward_amount: f64, amount: f64) -> Option<PointsDisplay> {
    let (ratio, currency, cash_value) = match config {
        RewardConfig::Direct => return None,
        RewardConfig::DirectRate { ratio, currency } => (*ratio, currency, None),
        RewardConfig::Conversion { ratio, currency } => {
            (*ratio, currency, Some(points_to_cash(reward_amount * ratio, *ratio)))
        }
    };
    if !(ratio.is_finite() && ratio > 0.0) {
        tracing::warn!(ratio, currency = %currency, "ignoring non-positive points ratio");
        return None;
    }

    let points_amount = reward_amount * ratio;
    let cost_per_point = (points_amount > 0.0).then(|| amount / points_amount);
    Some(PointsDisplay {
        points_amount,
        points_currency: currency.clone(),
        points_cash_value: cash_value,
        cost_per_point,
    })
}

/// Dollars spent per airline mile, for cards whose points convert to miles.
/// `None` for cash rebates and cash-equivalent point schemes.
pub fn miles_cost(
    config: &RewardConfig,
    percentage: f64,
    reward_amount: f64,
    amount: f64,
) -> Option<f64> {
    let RewardConfig::Conversion { ratio, currency } = config else {
        return None;
    };
    let ratio = *ratio;
    if !(ratio.is_finite() && ratio > 0.0) || percentage <= 0.0 || !earns_miles(currency, ratio) {
        return None;
    }
    if ratio >= 1.0 {
        let miles = reward_amount * ratio;
        (miles > 0.0).then(|| amount / miles)
    } else {
        // Fractional ratios quote miles per point; approximate from the rate
        Some(100.0 / percentage)
    }
}

fn earns_miles(currency: &str, ratio: f64) -> bool {
    let c = currency.to_lowercase();
    let miles = c.contains("mile")
        || c.contains('里')
        || c.contains("avios")
        || c == "rc"
        || (c == "points" && ratio < 1.0);
    let cash_like =
        c.contains("yuu") || c.contains("club") || c.contains("a. point") || ratio >= 100.0;
    miles && !cash_like
}

pub fn cash_to_points(cash: f64, ratio: f64) -> f64 {
    cash * ratio
}

pub fn points_to_cash(points: f64, ratio: f64) -> f64 {
    if ratio > 0.0 { points / ratio } else { 0.0 }
}
