//! Single-transaction path: match, resolve, net out fees, convert points,
//! then attach suggestions and diagnostics for every card in a snapshot.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::card::{Card, MatchKind, RewardRule};
use crate::context::TransactionContext;
use crate::error::{EngineError, EngineResult};
use crate::fx;
use crate::ledger::{CapConsumption, SpendLedger};
use crate::matcher;
use crate::points::{self, PointsDisplay};
use crate::ranker::{self, RankedResult, RewardPreference};
use crate::resolver::{self, OverCapInfo, SpendShortfall};
use crate::suggest::{
    self, DateSuggestion, MissedDiscount, PaymentMethodSuggestion, SpendingSuggestion,
};
use crate::validate::{self, CatalogIssue};

/// Immutable catalog captured at call start. Cloning shares the cards, so a
/// refresh upstream swaps the whole `Arc` and never mixes rule versions.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub cards: Arc<Vec<Card>>,
    /// Provenance tag, echoed back as `dataSource`
    pub data_source: String,
}

impl CatalogSnapshot {
    pub fn new(cards: Vec<Card>, data_source: impl Into<String>) -> Self {
        Self {
            cards: Arc::new(cards),
            data_source: data_source.into(),
        }
    }

    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    pub lookahead_days: u32,
    pub alternate_payment_methods: Vec<String>,
    /// Size of the primary ranked slice
    pub limit: usize,
    pub owned_cards: Vec<String>,
    pub preference: RewardPreference,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            lookahead_days: 30,
            alternate_payment_methods: ["apple_pay", "boc_pay", "alipay", "payme"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            limit: 10,
            owned_cards: Vec::new(),
            preference: RewardPreference::Cash,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    pub card_id: String,
    pub card_name: String,
    pub bank: String,
    pub matched_rule: Option<RewardRule>,
    pub match_type: Option<MatchKind>,
    /// Gross effective percentage, after caps
    pub percentage: f64,
    pub reward_amount: f64,
    pub is_capped: bool,
    pub fx_fee: f64,
    pub fee_free: bool,
    pub net_percentage: f64,
    pub net_reward_amount: f64,
    pub discount_rule: Option<String>,
    pub discount_percentage: Option<f64>,
    pub discount_amount: Option<f64>,
    #[serde(flatten)]
    pub points: Option<PointsDisplay>,
    /// Dollars per airline mile; set only for miles-earning cards
    pub miles_cost: Option<f64>,
    pub over_cap_info: Option<OverCapInfo>,
    pub shortfall: Option<SpendShortfall>,
    pub suggested_payment_method: Option<PaymentMethodSuggestion>,
    pub date_suggestion: Option<DateSuggestion>,
    pub spending_suggestion: Option<SpendingSuggestion>,
    pub missed_discount: Option<MissedDiscount>,
    /// Draw on the cap pool this transaction would cause
    pub cap_consumption: Option<CapConsumption>,
    pub diagnostics: Vec<CatalogIssue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub results: Vec<RankedResult>,
    pub count: usize,
    pub total_found: usize,
    pub data_source: String,
}

pub fn validate_context(ctx: &TransactionContext) -> EngineResult<()> {
    if ctx.query.trim().is_empty() && ctx.target.is_empty() {
        return Err(EngineError::EmptyQuery);
    }
    if !ctx.amount.is_finite() || ctx.amount < 0.0 {
        return Err(EngineError::InvalidAmount(ctx.amount));
    }
    Ok(())
}

/// Full calculation for one card. Never fails: catalog problems become
/// `diagnostics` on the result.
pub fn calculate(
    card: &Card,
    ctx: &TransactionContext,
    ledger: &SpendLedger,
    options: &EngineOptions,
) -> CalculationResult {
    let mut diagnostics = validate::validate_card(card);
    let matched = matcher::match_rule(card, ctx);

    let resolution = match matched {
        Some(m) => Some(resolver::resolve(card, m, ctx, ledger)),
        None => {
            tracing::warn!(card = %card.id, query = %ctx.query, "no eligible rule");
            diagnostics.push(CatalogIssue::NoEligibleRule);
            None
        }
    };

    let applied_rule = resolution
        .as_ref()
        .and_then(|r| r.applied_rule)
        .and_then(|i| card.rules.get(i));
    let (percentage, reward_amount, is_capped) = resolution
        .as_ref()
        .map_or((0.0, 0.0, false), |r| (r.percentage, r.reward_amount, r.is_capped));

    let adj = fx::apply_fx(card, percentage, reward_amount, ctx.amount, ctx.is_foreign_currency);
    let discount = matcher::match_discount(card, ctx)
        .and_then(|m| resolver::resolve_discount(m.rule, ctx.amount));
    let points = points::to_display(&card.reward_config, reward_amount, ctx.amount);

    let spending_suggestion = resolution.as_ref().and_then(|r| {
        r.shortfall
            .as_ref()
            .and_then(|s| suggest::suggest_spending(card, ctx, ledger, s, r))
    });

    CalculationResult {
        card_id: card.id.clone(),
        card_name: card.name.clone(),
        bank: card.bank.clone(),
        matched_rule: applied_rule.cloned(),
        match_type: applied_rule.map(|r| r.target.kind()),
        percentage,
        reward_amount,
        is_capped,
        fx_fee: adj.fx_fee,
        fee_free: adj.fee_free,
        net_percentage: adj.net_percentage,
        net_reward_amount: adj.net_reward_amount,
        discount_rule: discount.as_ref().map(|d| d.rule_description.clone()),
        discount_percentage: discount.as_ref().map(|d| d.percentage),
        discount_amount: discount.as_ref().map(|d| d.amount),
        points,
        miles_cost: points::miles_cost(&card.reward_config, percentage, reward_amount, ctx.amount),
        over_cap_info: resolution.as_ref().and_then(|r| r.over_cap.clone()),
        shortfall: resolution.as_ref().and_then(|r| r.shortfall.clone()),
        suggested_payment_method: suggest::suggest_payment_method(
            card,
            ctx,
            ledger,
            adj.net_reward_amount,
            &options.alternate_payment_methods,
        ),
        date_suggestion: suggest::suggest_date(
            card,
            ctx,
            ledger,
            matched,
            adj.net_reward_amount,
            options.lookahead_days,
        ),
        spending_suggestion,
        missed_discount: suggest::missed_discount(card, ctx, options.lookahead_days),
        cap_consumption: resolution.and_then(|r| r.consumption),
        diagnostics,
    }
}

/// Rank every card in the snapshot for one transaction.
pub fn recommend(
    snapshot: &CatalogSnapshot,
    ctx: &TransactionContext,
    ledger: &SpendLedger,
    options: &EngineOptions,
) -> EngineResult<Recommendation> {
    validate_context(ctx)?;
    if options.limit == 0 {
        return Err(EngineError::InvalidLimit);
    }

    let results: Vec<CalculationResult> = snapshot
        .cards
        .iter()
        .map(|card| calculate(card, ctx, ledger, options))
        .collect();
    let total_found = results.len();

    let ranked = ranker::rank(results, options.limit, &options.owned_cards, options.preference);
    tracing::debug!(
        query = %ctx.query,
        total_found,
        returned = ranked.len(),
        "recommendation ranked"
    );

    Ok(Recommendation {
        count: ranked.len(),
        results: ranked,
        total_found,
        data_source: snapshot.data_source.clone(),
    })
}
