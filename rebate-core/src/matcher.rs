//! Rule matcher: picks the single best-fitting rule of a card for a context.
//!
//! Tiers are tried in order merchant > category > payment method > base.
//! Within a tier the highest percentage wins and ties go to the rule declared
//! first. Rules outside their activity window are invisible here.

use crate::card::{Card, MatchKind, ONLINE, RewardRule, RuleTarget};
use crate::context::TransactionContext;

/// A rule together with its position in the card's declared order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchedRule<'a> {
    pub index: usize,
    pub rule: &'a RewardRule,
}

impl MatchedRule<'_> {
    pub fn kind(&self) -> MatchKind {
        self.rule.target.kind()
    }
}

/// Best reward (non-discount) rule active on `ctx.date`.
pub fn match_rule<'a>(card: &'a Card, ctx: &TransactionContext) -> Option<MatchedRule<'a>> {
    let matched = select(card, ctx, false, &MatchKind::TIERS);
    if let Some(m) = &matched {
        tracing::debug!(
            card = %card.id,
            tier = m.kind().as_str(),
            rule = %m.rule.description,
            "matched rule"
        );
    }
    matched
}

/// Best discount rule active on `ctx.date`, matched with the same tiers.
pub fn match_discount<'a>(card: &'a Card, ctx: &TransactionContext) -> Option<MatchedRule<'a>> {
    select(card, ctx, true, &MatchKind::TIERS)
}

/// Best base rule for the context; the fallback rate for caps and unmet
/// minimum spend. Plain base rules (no spend threshold, no cap) are preferred.
pub fn base_rule<'a>(card: &'a Card, ctx: &TransactionContext) -> Option<MatchedRule<'a>> {
    let unconditional = card
        .base_rules()
        .filter(|(_, rule)| {
            !rule.is_discount && rule.min_spend_threshold().is_none() && rule.cap.is_none()
        })
        .filter(|(_, rule)| is_eligible(rule, ctx) && rule.is_active_on(ctx.date))
        .fold(None::<MatchedRule<'a>>, |best, (index, rule)| match best {
            Some(b) if b.rule.percentage >= rule.percentage => Some(b),
            _ => Some(MatchedRule { index, rule }),
        });
    unconditional.or_else(|| select(card, ctx, false, &[MatchKind::Base]))
}

/// Rules that fit the context but are outside their activity window on
/// `ctx.date`.
pub fn dormant_rules<'a>(card: &'a Card, ctx: &TransactionContext) -> Vec<MatchedRule<'a>> {
    card.rules
        .iter()
        .enumerate()
        .filter(|(_, rule)| is_eligible(rule, ctx) && !rule.is_active_on(ctx.date))
        .map(|(index, rule)| MatchedRule { index, rule })
        .collect()
}

fn select<'a>(
    card: &'a Card,
    ctx: &TransactionContext,
    discount: bool,
    tiers: &[MatchKind],
) -> Option<MatchedRule<'a>> {
    for tier in tiers {
        let mut best: Option<MatchedRule<'a>> = None;

        for (index, rule) in card.rules.iter().enumerate() {
            if rule.is_discount != discount || rule.target.kind() != *tier {
                continue;
            }
            if !is_eligible(rule, ctx) || !rule.is_active_on(ctx.date) {
                continue;
            }
            match best {
                None => best = Some(MatchedRule { index, rule }),
                // Strictly greater keeps the earlier rule on ties.
                Some(b) if rule.percentage > b.rule.percentage => {
                    best = Some(MatchedRule { index, rule })
                }
                _ => {}
            }
        }

        if best.is_some() {
            return best;
        }
    }
    None
}

/// Structural eligibility: flags, exclusions and target, ignoring dates.
pub fn is_eligible(rule: &RewardRule, ctx: &TransactionContext) -> bool {
    if rule.percentage < 0.0 || !rule.percentage.is_finite() {
        return false;
    }
    if rule.is_foreign_currency && !ctx.is_foreign_currency {
        return false;
    }
    if rule.is_physical_store && ctx.is_online_purchase() {
        return false;
    }
    if is_excluded(rule, ctx) {
        return false;
    }
    matches_target(rule, ctx)
}

/// Exclusion lists are checked against the resolved category, every
/// merchant category, and the payment method.
pub fn is_excluded(rule: &RewardRule, ctx: &TransactionContext) -> bool {
    if !rule.exclude_categories.is_empty()
        && ctx
            .target
            .all_categories()
            .iter()
            .any(|c| rule.exclude_categories.iter().any(|e| e == c))
    {
        return true;
    }
    if let Some(method) = ctx.payment_method.as_deref() {
        if rule.exclude_payment_methods.iter().any(|m| m == method) {
            return true;
        }
    }
    false
}

pub fn matches_target(rule: &RewardRule, ctx: &TransactionContext) -> bool {
    let unresolved = ctx.target.is_empty();

    match &rule.target {
        RuleTarget::Base => true,
        RuleTarget::Merchant(values) => match ctx.target.merchant_id.as_deref() {
            Some(id) => values.iter().any(|v| v == id),
            None => unresolved && values.iter().any(|v| query_matches(&ctx.query, v)),
        },
        RuleTarget::Category(values) => {
            let online = ctx.is_online_purchase();
            let is_online_rule = values.iter().any(|v| v == ONLINE);
            if online && is_online_rule {
                return true;
            }
            // A physical swipe never satisfies an online category.
            let comparable = |c: &str| online || c != ONLINE;

            if unresolved {
                return values
                    .iter()
                    .filter(|v| comparable(v.as_str()))
                    .any(|v| query_matches(&ctx.query, v));
            }
            ctx.target
                .all_categories()
                .into_iter()
                .filter(|c| comparable(*c))
                .any(|c| values.iter().any(|v| v == c))
        }
        RuleTarget::PaymentMethod(values) => {
            let method = ctx.payment_method.as_deref().unwrap_or("");
            if !method.is_empty() && values.iter().any(|v| v == method) {
                return true;
            }
            if ctx.is_mobile_wallet() && values.iter().any(|v| v == "mobile") {
                return true;
            }
            ctx.is_online_purchase() && values.iter().any(|v| v == ONLINE)
        }
    }
}

/// Best-effort case-insensitive substring match, used only when no
/// registry resolved the query.
fn query_matches(query: &str, value: &str) -> bool {
    let q = query.trim().to_lowercase();
    let v = value.trim().to_lowercase();
    if q.is_empty() || v.is_empty() {
        return false;
    }
    q.contains(&v) || v.contains(&q)
}
