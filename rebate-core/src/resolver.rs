//! Rate & cap resolver: turns a matched rule into an effective percentage
//! and reward amount.
//!
//! Order of operations:
//! 1. minimum-spend gating (per transaction, then monthly card spend);
//!    an unmet threshold falls back to the base rate and is reported as a
//!    shortfall, never an error
//! 2. cap enforcement against the rule's cap pool (its own, or the
//!    `shareCapWith` group), reading prior usage from the ledger
//! 3. unreachable-bonus diagnostic when the threshold exceeds a spending cap

use serde::{Deserialize, Serialize};

use crate::card::{Cap, CapPeriod, CapType, Card, RewardRule};
use crate::context::TransactionContext;
use crate::ledger::{CapConsumption, LedgerKey, SpendLedger};
use crate::matcher::{self, MatchedRule};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// Index of the rule whose rate was actually applied
    pub applied_rule: Option<usize>,
    /// Effective gross percentage (reflects capping)
    pub percentage: f64,
    pub reward_amount: f64,
    pub is_capped: bool,
    pub over_cap: Option<OverCapInfo>,
    pub shortfall: Option<SpendShortfall>,
    /// What this transaction would draw from its cap pool
    pub consumption: Option<CapConsumption>,
    pub base_percentage: f64,
}

/// The rule's own terms make part of the bonus unreachable: its spend
/// threshold sits above its spending cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverCapInfo {
    pub rule_description: String,
    pub min_spend: f64,
    pub cap: f64,
    pub unreachable_gap: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ThresholdKind {
    PerTransaction,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendShortfall {
    pub kind: ThresholdKind,
    pub rule_index: usize,
    pub rule_description: String,
    /// Rate the rule would grant once the threshold is met
    pub rule_percentage: f64,
    pub threshold: f64,
    pub current_spend: f64,
    pub shortfall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountInfo {
    pub rule_description: String,
    pub percentage: f64,
    pub amount: f64,
}

pub fn resolve(
    card: &Card,
    matched: MatchedRule<'_>,
    ctx: &TransactionContext,
    ledger: &SpendLedger,
) -> Resolution {
    let base = matcher::base_rule(card, ctx);
    let base_percentage = base.map_or(0.0, |b| b.rule.percentage);
    let over_cap = over_cap_info(matched.rule);

    let shortfall = check_threshold(card, matched, ctx, ledger);
    let applied = match &shortfall {
        None => Some(matched),
        Some(s) => {
            tracing::debug!(
                card = %card.id,
                rule = %matched.rule.description,
                shortfall = s.shortfall,
                "minimum spend unmet, falling back to base rate"
            );
            base.filter(|b| b.index != matched.index)
        }
    };

    let mut resolution = match applied {
        Some(rule) => apply_rate(card, rule, base, ctx, ledger),
        None => Resolution {
            applied_rule: None,
            percentage: 0.0,
            reward_amount: 0.0,
            is_capped: false,
            over_cap: None,
            shortfall: None,
            consumption: None,
            base_percentage,
        },
    };
    resolution.over_cap = over_cap;
    resolution.shortfall = shortfall;
    resolution
}

/// Discounts bypass caps; a per-transaction
/// minimum still gates whether the discount applies.
pub fn resolve_discount(rule: &RewardRule, amount: f64) -> Option<DiscountInfo> {
    if rule.min_spend.is_some_and(|m| amount < m) {
        return None;
    }
    Some(DiscountInfo {
        rule_description: rule.description.clone(),
        percentage: rule.percentage,
        amount: amount * rule.percentage / 100.0,
    })
}

fn check_threshold(
    card: &Card,
    matched: MatchedRule<'_>,
    ctx: &TransactionContext,
    ledger: &SpendLedger,
) -> Option<SpendShortfall> {
    let rule = matched.rule;
    if rule.is_discount {
        return None;
    }
    if let Some(min) = rule.min_spend {
        if ctx.amount < min {
            return Some(SpendShortfall {
                kind: ThresholdKind::PerTransaction,
                rule_index: matched.index,
                rule_description: rule.description.clone(),
                rule_percentage: rule.percentage,
                threshold: min,
                current_spend: ctx.amount,
                shortfall: min - ctx.amount,
            });
        }
    }
    if let Some(monthly) = rule.monthly_min_spend {
        let spent = ledger.card_spend(&card.id, CapPeriod::Monthly) + ctx.amount;
        if spent < monthly {
            return Some(SpendShortfall {
                kind: ThresholdKind::Monthly,
                rule_index: matched.index,
                rule_description: rule.description.clone(),
                rule_percentage: rule.percentage,
                threshold: monthly,
                current_spend: spent,
                shortfall: monthly - spent,
            });
        }
    }
    None
}

fn over_cap_info(rule: &RewardRule) -> Option<OverCapInfo> {
    if rule.is_discount {
        return None;
    }
    let cap = rule.cap?;
    let threshold = rule.min_spend_threshold()?;
    if cap.cap_type == CapType::Spending && threshold > cap.amount {
        return Some(OverCapInfo {
            rule_description: rule.description.clone(),
            min_spend: threshold,
            cap: cap.amount,
            unreachable_gap: threshold - cap.amount,
        });
    }
    None
}

/// The cap governing `rule`: its own, or the tightest cap declared in its
/// `shareCapWith` group, with the ledger key of the pool.
pub fn cap_pool(card: &Card, matched: MatchedRule<'_>) -> Option<(Cap, LedgerKey)> {
    let rule = matched.rule;
    match rule.share_cap_with.as_deref() {
        Some(group) => {
            let members = card.cap_group(group);
            let own_type = rule.cap.map(|c| c.cap_type);
            let cap = members
                .iter()
                .filter_map(|(_, r)| r.cap)
                .filter(|c| own_type.is_none_or(|t| c.cap_type == t))
                .min_by(|a, b| a.amount.total_cmp(&b.amount))?;
            Some((cap, LedgerKey::new(&card.id, group, cap.period)))
        }
        None => {
            let cap = rule.cap?;
            let group = format!("rule-{}", matched.index);
            Some((cap, LedgerKey::new(&card.id, group, cap.period)))
        }
    }
}

fn apply_rate(
    card: &Card,
    matched: MatchedRule<'_>,
    base: Option<MatchedRule<'_>>,
    ctx: &TransactionContext,
    ledger: &SpendLedger,
) -> Resolution {
    let rule = matched.rule;
    let amount = ctx.amount;
    let raw = amount * rule.percentage / 100.0;
    let base_percentage = base.map_or(0.0, |b| b.rule.percentage);
    // Spend above a spending cap earns the base rate, unless this is the base.
    let overflow_rate = base
        .filter(|b| b.index != matched.index)
        .map_or(0.0, |b| b.rule.percentage);

    let (reward_amount, is_capped, consumption) = match cap_pool(card, matched) {
        None => (raw, false, None),
        Some((cap, key)) => {
            let used = ledger.usage(&key);
            match cap.cap_type {
                CapType::Spending => {
                    let remaining = (cap.amount - used.spent).max(0.0);
                    let eligible = amount.min(remaining);
                    let bonus = eligible * rule.percentage / 100.0;
                    let reward = bonus + (amount - eligible) * overflow_rate / 100.0;
                    let consumption = CapConsumption { key, spend: eligible, reward: bonus };
                    (reward, amount > remaining, Some(consumption))
                }
                CapType::Reward => {
                    let remaining = (cap.amount - used.rewarded).max(0.0);
                    let reward = raw.min(remaining);
                    let consumption = CapConsumption { key, spend: amount, reward };
                    (reward, raw > remaining, Some(consumption))
                }
            }
        }
    };

    // Reflects capping; uncapped results keep the exact rule rate.
    let percentage = if is_capped && amount > 0.0 {
        reward_amount / amount * 100.0
    } else {
        rule.percentage
    };

    Resolution {
        applied_rule: Some(matched.index),
        percentage,
        reward_amount,
        is_capped,
        over_cap: None,
        shortfall: None,
        consumption,
        base_percentage,
    }
}
