//! Currency fee adjuster.

use serde::{Deserialize, Serialize};

use crate::card::Card;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FxAdjustment {
    /// Card-level foreign-currency fee, percent; 0 for local transactions
    pub fx_fee: f64,
    pub fee_free: bool,
    pub net_percentage: f64,
    pub net_reward_amount: f64,
}

/// Nets the card's foreign-currency fee out of a gross percentage.
///
/// Local transactions pass through unchanged. The fee is subtracted once,
/// after matching, even when the matched rule is itself foreign-only.
pub fn apply_fx(
    card: &Card,
    percentage: f64,
    reward_amount: f64,
    amount: f64,
    is_foreign: bool,
) -> FxAdjustment {
    if !is_foreign {
        return FxAdjustment {
            fx_fee: 0.0,
            fee_free: card.is_fee_free_abroad(),
            net_percentage: percentage,
            net_reward_amount: reward_amount,
        };
    }

    let fee = card.foreign_currency_fee.max(0.0);
    let net_percentage = (percentage - fee).max(0.0);
    FxAdjustment {
        fx_fee: fee,
        fee_free: fee == 0.0,
        net_percentage,
        net_reward_amount: amount * net_percentage / 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{RewardConfig, RewardRule};

    fn card(fee: f64) -> Card {
        Card {
            id: "fx".into(),
            name: "FX".into(),
            bank: "Bank".into(),
            annual_fee: 0.0,
            fee_waiver_condition: None,
            foreign_currency_fee: fee,
            rules: vec![RewardRule::base("base", 0.4)],
            reward_config: RewardConfig::Direct,
            tags: vec![],
            apply_url: None,
            style: None,
        }
    }

    #[test]
    fn test_foreign_fee_is_netted_once() {
        let adj = apply_fx(&card(1.0), 4.0, 40.0, 1000.0, true);
        assert_eq!(adj.net_percentage, 3.0);
        assert!((adj.net_reward_amount - 30.0).abs() < 1e-9);
        assert_eq!(adj.fx_fee, 1.0);
        assert!(!adj.fee_free);
    }

    #[test]
    fn test_net_never_negative_or_above_gross() {
        for (fee, pct) in [(1.95, 0.4), (0.0, 2.0), (1.0, 1.0)] {
            let adj = apply_fx(&card(fee), pct, 1000.0 * pct / 100.0, 1000.0, true);
            assert!(adj.net_percentage >= 0.0);
            assert!(adj.net_percentage <= pct);
            assert!(adj.net_reward_amount >= 0.0);
        }
    }

    #[test]
    fn test_local_transaction_passes_through() {
        let adj = apply_fx(&card(1.95), 4.0, 40.0, 1000.0, false);
        assert_eq!(adj.fx_fee, 0.0);
        assert_eq!(adj.net_percentage, 4.0);
        assert_eq!(adj.net_reward_amount, 40.0);
    }

    #[test]
    fn test_fee_free_flag() {
        assert!(apply_fx(&card(0.0), 2.0, 20.0, 1000.0, true).fee_free);
    }
}
