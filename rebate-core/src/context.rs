//! Transaction context: the ephemeral input to a single calculation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::card::{MOBILE_WALLETS, ONLINE};

/// Merchant/category ids a query resolved to. Produced by an external
/// registry; the engine never performs the lookup itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTarget {
    pub merchant_id: Option<String>,
    /// Categories the resolved merchant belongs to
    #[serde(default)]
    pub merchant_categories: Vec<String>,
    pub category_id: Option<String>,
}

impl ResolvedTarget {
    pub fn merchant(id: impl Into<String>, categories: &[&str]) -> Self {
        Self {
            merchant_id: Some(id.into()),
            merchant_categories: categories.iter().map(|c| c.to_string()).collect(),
            category_id: None,
        }
    }

    pub fn category(id: impl Into<String>) -> Self {
        Self {
            merchant_id: None,
            merchant_categories: Vec::new(),
            category_id: Some(id.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.merchant_id.is_none() && self.category_id.is_none()
    }

    /// The resolved category plus every merchant category, deduplicated.
    pub fn all_categories(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for c in self.category_id.iter().chain(self.merchant_categories.iter()) {
            if !out.contains(&c.as_str()) {
                out.push(c);
            }
        }
        out
    }
}

/// Resolves a free-text query to merchant/category ids.
pub trait TargetLookup {
    fn resolve(&self, query: &str) -> ResolvedTarget;
}

/// A lookup that resolves nothing; the matcher then falls back to
/// substring matching on the raw query.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl TargetLookup for NoLookup {
    fn resolve(&self, _query: &str) -> ResolvedTarget {
        ResolvedTarget::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionContext {
    /// Merchant-or-category query as typed by the user
    pub query: String,
    #[serde(default)]
    pub target: ResolvedTarget,
    pub amount: f64,
    pub payment_method: Option<String>,
    #[serde(default)]
    pub is_foreign_currency: bool,
    /// Online purchase (as opposed to a physical terminal)
    #[serde(default)]
    pub is_online: bool,
    pub date: NaiveDate,
}

impl TransactionContext {
    pub fn new(query: impl Into<String>, amount: f64, date: NaiveDate) -> Self {
        Self {
            query: query.into(),
            target: ResolvedTarget::default(),
            amount,
            payment_method: None,
            is_foreign_currency: false,
            is_online: false,
            date,
        }
    }

    pub fn with_target(mut self, target: ResolvedTarget) -> Self {
        self.target = target;
        self
    }

    pub fn resolved_with(self, lookup: &dyn TargetLookup) -> Self {
        let target = lookup.resolve(&self.query);
        self.with_target(target)
    }

    pub fn with_payment_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = Some(method.into());
        self
    }

    pub fn foreign(mut self) -> Self {
        self.is_foreign_currency = true;
        self
    }

    pub fn online(mut self) -> Self {
        self.is_online = true;
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }

    /// Online either by flag or by choosing the `online` payment method.
    pub fn is_online_purchase(&self) -> bool {
        self.is_online || self.payment_method.as_deref() == Some(ONLINE)
    }

    pub fn is_mobile_wallet(&self) -> bool {
        self.payment_method
            .as_deref()
            .is_some_and(|m| MOBILE_WALLETS.contains(&m))
    }

    /// No method given, or a plain physical card swipe.
    pub fn is_plain_card_payment(&self) -> bool {
        matches!(self.payment_method.as_deref(), None | Some("physical_card"))
    }
}
