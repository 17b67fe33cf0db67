//! Per-card suggestions: a better payment channel, a better day, or the
//! spend needed to clear a threshold.
//!
//! Every suggestion re-runs the matcher and resolver on a modified copy of the
//! context; nothing here mutates caller state.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::card::{CapPeriod, Card, DateRange};
use crate::context::TransactionContext;
use crate::fx;
use crate::ledger::SpendLedger;
use crate::matcher::{self, MatchedRule};
use crate::resolver::{self, Resolution, SpendShortfall, ThresholdKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodSuggestion {
    pub method: String,
    pub potential_percentage: f64,
    pub potential_reward_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DateSuggestion {
    /// A better rule becomes active soon.
    #[serde(rename_all = "camelCase")]
    Upcoming {
        rule_description: String,
        first_active: NaiveDate,
        valid_date_range: Option<DateRange>,
        valid_days: Vec<u8>,
        valid_dates: Vec<u32>,
        new_percentage: f64,
        new_reward_amount: f64,
    },
    /// The matched rule stops applying soon.
    #[serde(rename_all = "camelCase")]
    Expiring {
        rule_description: String,
        ends_on: NaiveDate,
        percentage_after: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingSuggestion {
    pub kind: ThresholdKind,
    pub rule_description: String,
    /// Transaction amount (per-transaction) or monthly card spend to reach
    pub target_amount: f64,
    pub shortfall: f64,
    pub new_percentage: f64,
    pub new_reward_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissedDiscount {
    pub rule_description: String,
    pub percentage: f64,
    pub amount: f64,
    /// Next active date within the lookahead window, if any
    pub next_active: Option<NaiveDate>,
}

/// Net reward of `card` for `ctx`, or 0 when nothing matches.
pub fn net_reward(card: &Card, ctx: &TransactionContext, ledger: &SpendLedger) -> (f64, f64) {
    match matcher::match_rule(card, ctx) {
        Some(m) => {
            let r = resolver::resolve(card, m, ctx, ledger);
            let adj = fx::apply_fx(
                card,
                r.percentage,
                r.reward_amount,
                ctx.amount,
                ctx.is_foreign_currency,
            );
            (adj.net_percentage, adj.net_reward_amount)
        }
        None => (0.0, 0.0),
    }
}

/// Tries alternate methods, only when the caller paid by plain card.
pub fn suggest_payment_method(
    card: &Card,
    ctx: &TransactionContext,
    ledger: &SpendLedger,
    current_reward: f64,
    alternates: &[String],
) -> Option<PaymentMethodSuggestion> {
    if !ctx.is_plain_card_payment() {
        return None;
    }
    let mut best: Option<PaymentMethodSuggestion> = None;
    for method in alternates {
        let trial = ctx.clone().with_payment_method(method.as_str());
        let (pct, reward) = net_reward(card, &trial, ledger);
        let threshold = best.as_ref().map_or(current_reward, |b| b.potential_reward_amount);
        if reward > threshold {
            best = Some(PaymentMethodSuggestion {
                method: method.clone(),
                potential_percentage: pct,
                potential_reward_amount: reward,
            });
        }
    }
    best
}

pub fn suggest_date(
    card: &Card,
    ctx: &TransactionContext,
    ledger: &SpendLedger,
    matched: Option<MatchedRule<'_>>,
    current_reward: f64,
    lookahead_days: u32,
) -> Option<DateSuggestion> {
    upcoming(card, ctx, ledger, current_reward, lookahead_days)
        .or_else(|| expiring(card, ctx, ledger, matched?, current_reward, lookahead_days))
}

fn days_ahead(from: NaiveDate, lookahead_days: u32) -> impl Iterator<Item = NaiveDate> {
    (1..=i64::from(lookahead_days)).filter_map(move |n| from.checked_add_signed(Duration::days(n)))
}

fn upcoming(
    card: &Card,
    ctx: &TransactionContext,
    ledger: &SpendLedger,
    current_reward: f64,
    lookahead_days: u32,
) -> Option<DateSuggestion> {
    let dormant: Vec<usize> = matcher::dormant_rules(card, ctx)
        .into_iter()
        .filter(|m| !m.rule.is_discount)
        .map(|m| m.index)
        .collect();
    if dormant.is_empty() {
        return None;
    }

    for day in days_ahead(ctx.date, lookahead_days) {
        let trial = ctx.clone().on(day);
        let Some(m) = matcher::match_rule(card, &trial) else {
            continue;
        };
        if !dormant.contains(&m.index) {
            continue;
        }
        let (pct, reward) = net_reward(card, &trial, ledger);
        if reward > current_reward {
            return Some(DateSuggestion::Upcoming {
                rule_description: m.rule.description.clone(),
                first_active: day,
                valid_date_range: m.rule.valid_date_range,
                valid_days: m.rule.valid_days.clone(),
                valid_dates: m.rule.valid_dates.clone(),
                new_percentage: pct,
                new_reward_amount: reward,
            });
        }
    }
    None
}

fn expiring(
    card: &Card,
    ctx: &TransactionContext,
    ledger: &SpendLedger,
    matched: MatchedRule<'_>,
    current_reward: f64,
    lookahead_days: u32,
) -> Option<DateSuggestion> {
    let end = matched.rule.valid_date_range?.end;
    if (end - ctx.date).num_days() > i64::from(lookahead_days) {
        return None;
    }
    let after = end.succ_opt()?;
    let (pct_after, reward_after) = net_reward(card, &ctx.clone().on(after), ledger);
    if reward_after >= current_reward {
        return None;
    }
    Some(DateSuggestion::Expiring {
        rule_description: matched.rule.description.clone(),
        ends_on: end,
        percentage_after: pct_after,
    })
}

/// Turns an unmet threshold into the spend needed and the reward it unlocks.
pub fn suggest_spending(
    card: &Card,
    ctx: &TransactionContext,
    ledger: &SpendLedger,
    shortfall: &SpendShortfall,
    current: &Resolution,
) -> Option<SpendingSuggestion> {
    let rule = card.rules.get(shortfall.rule_index)?;
    let matched = MatchedRule { index: shortfall.rule_index, rule };

    let resolved = match shortfall.kind {
        ThresholdKind::PerTransaction => {
            let trial = ctx.clone().with_amount(shortfall.threshold);
            resolver::resolve(card, matched, &trial, ledger)
        }
        ThresholdKind::Monthly => {
            let mut topped_up = ledger.clone();
            topped_up.add_card_spend(&card.id, CapPeriod::Monthly, shortfall.shortfall);
            resolver::resolve(card, matched, ctx, &topped_up)
        }
    };
    if resolved.shortfall.is_some() || resolved.percentage <= current.percentage {
        return None;
    }
    Some(SpendingSuggestion {
        kind: shortfall.kind,
        rule_description: shortfall.rule_description.clone(),
        target_amount: shortfall.threshold,
        shortfall: shortfall.shortfall,
        new_percentage: resolved.percentage,
        new_reward_amount: resolved.reward_amount,
    })
}

/// Best discount that fits the transaction but is inactive on its date.
pub fn missed_discount(
    card: &Card,
    ctx: &TransactionContext,
    lookahead_days: u32,
) -> Option<MissedDiscount> {
    let best = matcher::dormant_rules(card, ctx)
        .into_iter()
        .filter(|m| m.rule.is_discount)
        .fold(None::<MatchedRule<'_>>, |best, m| match best {
            Some(b) if b.rule.percentage >= m.rule.percentage => Some(b),
            _ => Some(m),
        })?;
    let next_active = days_ahead(ctx.date, lookahead_days).find(|d| best.rule.is_active_on(*d));
    Some(MissedDiscount {
        rule_description: best.rule.description.clone(),
        percentage: best.rule.percentage,
        amount: ctx.amount * best.rule.percentage / 100.0,
        next_active,
    })
}
