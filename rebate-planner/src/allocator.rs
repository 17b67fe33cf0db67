//! Portfolio allocator: assign each spend category to one card, using at
//! most `max_cards` distinct cards.
//!
//! Greedy, not optimal. Categories are visited largest spend first and each
//! one takes the best card available at that moment; a brute-force search
//! over card sets can beat it when an early choice crowds out a better pair.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use rebate_core::card::ONLINE;
use rebate_core::{
    CapConsumption, CapPeriod, Card, CatalogSnapshot, EngineError, ResolvedTarget, SpendLedger,
    TransactionContext, apply_fx, match_rule, resolve,
};

use crate::spend_profile::{CategorySpend, SpendProfile};

const PERPETUAL_WAIVER: &str =
    r"(?i)永久免年費|終身免年費|perpetual|lifetime|for\s+life|no\s+annual\s+fee";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    pub max_cards: usize,
    pub no_annual_fee_only: bool,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            max_cards: 3,
            no_annual_fee_only: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAssignment {
    pub category: String,
    pub amount: f64,
    pub percentage: f64,
    pub reward_amount: f64,
    pub is_capped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardAssignment {
    pub card_id: String,
    pub card_name: String,
    pub categories: Vec<CategoryAssignment>,
    pub monthly_reward: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleCardComparison {
    pub best_card_id: String,
    pub best_card_name: String,
    pub monthly_reward: f64,
    /// Gain of the allocation over the best single card, percent
    pub improvement_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub card_assignments: Vec<CardAssignment>,
    /// category -> card id
    pub category_allocation: BTreeMap<String, String>,
    pub total_monthly_reward: f64,
    pub total_yearly_reward: f64,
    pub total_spending: f64,
    pub comparison: Option<SingleCardComparison>,
    /// Categories no eligible card could take
    pub unassigned: Vec<String>,
}

/// What one card would earn on one category given the ledger so far.
#[derive(Debug, Clone)]
struct Quote<'a> {
    card: &'a Card,
    percentage: f64,
    reward_amount: f64,
    is_capped: bool,
    consumption: Option<CapConsumption>,
}

fn category_context(entry: &CategorySpend, date: NaiveDate) -> TransactionContext {
    let mut ctx = TransactionContext::new(&entry.category, entry.amount, date)
        .with_target(ResolvedTarget::category(&entry.category));
    if entry.is_foreign {
        ctx = ctx.foreign();
    }
    if entry.category == ONLINE {
        ctx = ctx.online();
    }
    ctx
}

fn quote<'a>(card: &'a Card, ctx: &TransactionContext, ledger: &SpendLedger) -> Quote<'a> {
    let Some(matched) = match_rule(card, ctx) else {
        return Quote {
            card,
            percentage: 0.0,
            reward_amount: 0.0,
            is_capped: false,
            consumption: None,
        };
    };
    let resolution = resolve(card, matched, ctx, ledger);
    let adj = apply_fx(
        card,
        resolution.percentage,
        resolution.reward_amount,
        ctx.amount,
        ctx.is_foreign_currency,
    );
    Quote {
        card,
        percentage: adj.net_percentage,
        reward_amount: adj.net_reward_amount,
        is_capped: resolution.is_capped,
        consumption: resolution.consumption,
    }
}

/// Best reward first; ties by card name then id.
fn best_first(quotes: &mut [Quote<'_>]) {
    quotes.sort_by(|a, b| {
        b.reward_amount
            .total_cmp(&a.reward_amount)
            .then_with(|| a.card.name.cmp(&b.card.name))
            .then_with(|| a.card.id.cmp(&b.card.id))
    });
}

fn commit(ledger: &mut SpendLedger, q: &Quote<'_>, amount: f64) {
    if let Some(c) = &q.consumption {
        ledger.record(c);
    }
    ledger.add_card_spend(&q.card.id, CapPeriod::Monthly, amount);
}

pub struct Allocator {
    waiver: Regex,
}

impl Allocator {
    pub fn new() -> Result<Self> {
        let waiver = Regex::new(PERPETUAL_WAIVER).context("compiling fee waiver pattern")?;
        Ok(Self { waiver })
    }

    /// Free to hold forever: no fee at all, or a waiver that never lapses.
    pub fn is_fee_free(&self, card: &Card) -> bool {
        card.annual_fee <= 0.0
            || card
                .fee_waiver_condition
                .as_deref()
                .is_some_and(|w| self.waiver.is_match(w))
    }

    fn eligible<'a>(
        &self,
        snapshot: &'a CatalogSnapshot,
        constraints: &Constraints,
    ) -> Vec<&'a Card> {
        snapshot
            .cards
            .iter()
            .filter(|c| !constraints.no_annual_fee_only || self.is_fee_free(c))
            .collect()
    }

    pub fn allocate(
        &self,
        snapshot: &CatalogSnapshot,
        profile: &SpendProfile,
        constraints: &Constraints,
        ledger: &SpendLedger,
        date: NaiveDate,
    ) -> Result<Allocation> {
        if constraints.max_cards < 1 {
            return Err(EngineError::InvalidMaxCards(constraints.max_cards).into());
        }
        if let Some(bad) = profile
            .entries
            .iter()
            .find(|e| !e.amount.is_finite() || e.amount < 0.0)
        {
            return Err(EngineError::InvalidAmount(bad.amount).into());
        }
        let categories = profile.ordered();
        if categories.is_empty() {
            return Err(EngineError::EmptySpendProfile.into());
        }

        let cards = self.eligible(snapshot, constraints);
        let mut working = ledger.clone();
        let mut assignments: Vec<CardAssignment> = Vec::new();
        let mut category_allocation = BTreeMap::new();
        let mut unassigned = Vec::new();

        for entry in &categories {
            let ctx = category_context(entry, date);
            let mut quotes: Vec<Quote<'_>> =
                cards.iter().map(|&c| quote(c, &ctx, &working)).collect();
            best_first(&mut quotes);

            let is_open = |id: &str| assignments.iter().any(|a| a.card_id == id);
            let choice = match quotes.first() {
                None => None,
                Some(best) if is_open(&best.card.id) => Some(best.clone()),
                Some(best) if assignments.len() < constraints.max_cards => Some(best.clone()),
                Some(_) => quotes.iter().find(|q| is_open(&q.card.id)).cloned(),
            };

            let Some(q) = choice else {
                tracing::debug!(category = %entry.category, "no eligible card for category");
                unassigned.push(entry.category.clone());
                continue;
            };
            tracing::debug!(
                category = %entry.category,
                card = %q.card.id,
                reward = q.reward_amount,
                "category assigned"
            );

            commit(&mut working, &q, entry.amount);
            category_allocation.insert(entry.category.clone(), q.card.id.clone());

            let line = CategoryAssignment {
                category: entry.category.clone(),
                amount: entry.amount,
                percentage: q.percentage,
                reward_amount: q.reward_amount,
                is_capped: q.is_capped,
            };
            match assignments.iter_mut().find(|a| a.card_id == q.card.id) {
                Some(a) => {
                    a.monthly_reward += q.reward_amount;
                    a.categories.push(line);
                }
                None => assignments.push(CardAssignment {
                    card_id: q.card.id.clone(),
                    card_name: q.card.name.clone(),
                    monthly_reward: q.reward_amount,
                    categories: vec![line],
                }),
            }
        }

        let total_monthly_reward: f64 = assignments.iter().map(|a| a.monthly_reward).sum();
        let comparison = best_single_card(&cards, &categories, ledger, date).map(|(card, reward)| {
            SingleCardComparison {
                best_card_id: card.id.clone(),
                best_card_name: card.name.clone(),
                monthly_reward: reward,
                improvement_percent: if reward > 0.0 {
                    (total_monthly_reward - reward) / reward * 100.0
                } else {
                    0.0
                },
            }
        });

        Ok(Allocation {
            card_assignments: assignments,
            category_allocation,
            total_monthly_reward,
            total_yearly_reward: total_monthly_reward * 12.0,
            total_spending: categories.iter().map(|e| e.amount).sum(),
            comparison,
            unassigned,
        })
    }
}

/// Each card alone across the whole mix, with its own copy of the ledger.
fn best_single_card<'a>(
    cards: &[&'a Card],
    categories: &[&CategorySpend],
    ledger: &SpendLedger,
    date: NaiveDate,
) -> Option<(&'a Card, f64)> {
    let mut best: Option<(&Card, f64)> = None;
    for &card in cards {
        let mut working = ledger.clone();
        let mut total = 0.0;
        for entry in categories {
            let q = quote(card, &category_context(entry, date), &working);
            total += q.reward_amount;
            commit(&mut working, &q, entry.amount);
        }
        let better = match best {
            None => true,
            Some((b, r)) => {
                total > r || (total == r && (&card.name, &card.id) < (&b.name, &b.id))
            }
        };
        if better {
            best = Some((card, total));
        }
    }
    best
}

/// One-shot allocation with a freshly compiled allocator.
pub fn allocate(
    snapshot: &CatalogSnapshot,
    profile: &SpendProfile,
    constraints: &Constraints,
    ledger: &SpendLedger,
    date: NaiveDate,
) -> Result<Allocation> {
    Allocator::new()?.allocate(snapshot, profile, constraints, ledger, date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebate_core::{Cap, RewardConfig, RewardRule, RuleTarget};

    fn card(id: &str, fee: f64, waiver: Option<&str>, rules: Vec<RewardRule>) -> Card {
        Card {
            id: id.into(),
            name: id.to_uppercase(),
            bank: "Bank".into(),
            annual_fee: fee,
            fee_waiver_condition: waiver.map(String::from),
            foreign_currency_fee: 1.95,
            rules,
            reward_config: RewardConfig::Direct,
            tags: vec![],
            apply_url: None,
            style: None,
        }
    }

    fn cat(v: &str) -> RuleTarget {
        RuleTarget::Category(vec![v.to_string()])
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn profile(entries: &[(&str, f64)]) -> SpendProfile {
        SpendProfile::new(entries.iter().map(|(c, a)| CategorySpend::new(*c, *a)).collect())
    }

    fn two_cards() -> CatalogSnapshot {
        let a = card(
            "card-a",
            0.0,
            None,
            vec![
                RewardRule::new("dining 5%", cat("dining"), 5.0),
                RewardRule::new("groceries 3%", cat("groceries"), 3.0),
                RewardRule::base("base 1%", 1.0),
            ],
        );
        let b = card(
            "card-b",
            0.0,
            None,
            vec![
                RewardRule::new("dining 2%", cat("dining"), 2.0),
                RewardRule::new("groceries 6%", cat("groceries"), 6.0),
                RewardRule::base("base 0.5%", 0.5),
            ],
        );
        CatalogSnapshot::new(vec![a, b], "test")
    }

    #[test]
    fn test_single_slot_keeps_first_card() {
        let spend = profile(&[("dining", 2000.0), ("groceries", 1500.0)]);
        let constraints = Constraints { max_cards: 1, no_annual_fee_only: false };
        let plan =
            allocate(&two_cards(), &spend, &constraints, &SpendLedger::new(), date()).unwrap();

        assert_eq!(plan.card_assignments.len(), 1);
        assert_eq!(plan.card_assignments[0].card_id, "card-a");
        assert_eq!(plan.category_allocation["groceries"], "card-a");
        // 2000 * 5% + 1500 * 3%
        assert!((plan.total_monthly_reward - 145.0).abs() < 1e-9);
        assert!((plan.total_yearly_reward - 1740.0).abs() < 1e-9);
        assert_eq!(plan.comparison.as_ref().unwrap().improvement_percent, 0.0);
    }

    #[test]
    fn test_second_slot_takes_better_card() {
        let spend = profile(&[("dining", 2000.0), ("groceries", 1500.0)]);
        let constraints = Constraints { max_cards: 2, no_annual_fee_only: false };
        let plan =
            allocate(&two_cards(), &spend, &constraints, &SpendLedger::new(), date()).unwrap();

        assert_eq!(plan.card_assignments.len(), 2);
        assert_eq!(plan.category_allocation["groceries"], "card-b");
        assert!((plan.total_monthly_reward - 190.0).abs() < 1e-9);
        let cmp = plan.comparison.unwrap();
        assert_eq!(cmp.best_card_id, "card-a");
        assert!((cmp.improvement_percent - 45.0 / 145.0 * 100.0).abs() < 1e-9);
        assert_eq!(plan.total_spending, 3500.0);
    }

    #[test]
    fn test_card_count_never_exceeds_max() {
        let cards: Vec<Card> = ["a", "b", "c", "d"]
            .iter()
            .enumerate()
            .map(|(i, id)| {
                card(
                    id,
                    0.0,
                    None,
                    vec![
                        RewardRule::new("bonus", cat(&format!("cat{i}")), 5.0),
                        RewardRule::base("base", 0.4),
                    ],
                )
            })
            .collect();
        let snapshot = CatalogSnapshot::new(cards, "test");
        let spend = profile(&[("cat0", 400.0), ("cat1", 300.0), ("cat2", 200.0), ("cat3", 100.0)]);

        for max_cards in 1..=4 {
            let constraints = Constraints { max_cards, no_annual_fee_only: false };
            let plan =
                allocate(&snapshot, &spend, &constraints, &SpendLedger::new(), date()).unwrap();
            assert!(plan.card_assignments.len() <= max_cards);
            assert_eq!(plan.category_allocation.len(), 4);
        }
    }

    #[test]
    fn test_shared_cap_headroom_carries_between_categories() {
        let shared = card(
            "red",
            0.0,
            None,
            vec![
                RewardRule::new("dining 10%", cat("dining"), 10.0)
                    .with_cap(Cap::reward(100.0, CapPeriod::Monthly))
                    .with_shared_cap("bonus"),
                RewardRule::new("online 10%", cat("online"), 10.0)
                    .with_cap(Cap::reward(100.0, CapPeriod::Monthly))
                    .with_shared_cap("bonus"),
                RewardRule::base("base 0%", 0.0),
            ],
        );
        let snapshot = CatalogSnapshot::new(vec![shared], "test");
        let spend = profile(&[("dining", 800.0), ("online", 500.0)]);
        let plan = allocate(&snapshot, &spend, &Constraints::default(), &SpendLedger::new(), date())
            .unwrap();

        let lines = &plan.card_assignments[0].categories;
        assert!((lines[0].reward_amount - 80.0).abs() < 1e-9);
        assert!((lines[1].reward_amount - 20.0).abs() < 1e-9);
        assert!(lines[1].is_capped);
        assert!((plan.total_monthly_reward - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_annual_fee_only_filter() {
        let fee = card("fee", 1800.0, Some("首年免年費"), vec![RewardRule::base("base 5%", 5.0)]);
        let waived = card(
            "waived",
            1800.0,
            Some("No annual fee for life"),
            vec![RewardRule::base("base 1%", 1.0)],
        );
        let snapshot = CatalogSnapshot::new(vec![fee, waived], "test");
        let spend = profile(&[("dining", 1000.0)]);
        let constraints = Constraints { max_cards: 1, no_annual_fee_only: true };
        let plan = allocate(&snapshot, &spend, &constraints, &SpendLedger::new(), date()).unwrap();
        assert_eq!(plan.category_allocation["dining"], "waived");

        let allocator = Allocator::new().unwrap();
        let lifetime = card("x", 500.0, Some("終身免年費"), vec![]);
        assert!(allocator.is_fee_free(&lifetime));
    }

    #[test]
    fn test_unassigned_when_filter_leaves_nothing() {
        let fee = card("fee", 1800.0, None, vec![RewardRule::base("base", 1.0)]);
        let snapshot = CatalogSnapshot::new(vec![fee], "test");
        let constraints = Constraints { max_cards: 2, no_annual_fee_only: true };
        let spend = profile(&[("dining", 100.0)]);
        let plan = allocate(&snapshot, &spend, &constraints, &SpendLedger::new(), date()).unwrap();
        assert!(plan.card_assignments.is_empty());
        assert_eq!(plan.unassigned, vec!["dining".to_string()]);
        assert!(plan.comparison.is_none());
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let snapshot = two_cards();
        let zero = Constraints { max_cards: 0, no_annual_fee_only: false };
        let dining = profile(&[("dining", 100.0)]);
        let err = allocate(&snapshot, &dining, &zero, &SpendLedger::new(), date()).unwrap_err();
        assert_eq!(err.downcast_ref::<EngineError>(), Some(&EngineError::InvalidMaxCards(0)));

        let nothing = profile(&[("dining", 0.0)]);
        let err =
            allocate(&snapshot, &nothing, &Constraints::default(), &SpendLedger::new(), date())
                .unwrap_err();
        assert_eq!(err.downcast_ref::<EngineError>(), Some(&EngineError::EmptySpendProfile));
    }

    #[test]
    fn test_foreign_category_nets_fee() {
        let snapshot = CatalogSnapshot::new(
            vec![card("abroad", 0.0, None, vec![RewardRule::base("base 4%", 4.0)])],
            "test",
        );
        let spend = profile(&[("overseas", 1000.0)]);
        let plan = allocate(&snapshot, &spend, &Constraints::default(), &SpendLedger::new(), date())
            .unwrap();
        let line = &plan.card_assignments[0].categories[0];
        assert!((line.percentage - 2.05).abs() < 1e-9);
        assert!((line.reward_amount - 20.5).abs() < 1e-9);
    }
}
