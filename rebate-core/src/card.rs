//! Card and reward-rule types: the catalog snapshot the engine reads.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Payment methods covered by the generic `mobile` rule value.
pub const MOBILE_WALLETS: &[&str] = &["apple_pay", "google_pay", "samsung_pay", "boc_pay"];

/// Category id used by online-only rules.
pub const ONLINE: &str = "online";

/// A credit card with its ordered reward rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Unique key within a catalog
    pub id: String,
    pub name: String,
    pub bank: String,
    /// Annual fee in the catalog currency (>= 0)
    #[serde(default)]
    pub annual_fee: f64,
    /// Free-text waiver terms, e.g. "永久免年費" or "first year free"
    #[serde(default)]
    pub fee_waiver_condition: Option<String>,
    /// Foreign-currency transaction fee, percent of the amount
    #[serde(default)]
    pub foreign_currency_fee: f64,
    /// Declared rule order is significant: earlier rules win ties.
    pub rules: Vec<RewardRule>,
    #[serde(default)]
    pub reward_config: RewardConfig,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub apply_url: Option<String>,
    /// Display hint only
    #[serde(default)]
    pub style: Option<CardStyle>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CardStyle {
    pub bg_color: String,
    pub text_color: String,
}

impl Card {
    /// Base rules in declared order.
    pub fn base_rules(&self) -> impl Iterator<Item = (usize, &RewardRule)> {
        self.rules
            .iter()
            .enumerate()
            .filter(|(_, r)| r.target.kind() == MatchKind::Base)
    }

    pub fn has_base_rule(&self) -> bool {
        self.base_rules().next().is_some()
    }

    /// Members of a `shareCapWith` group, with their rule indices.
    pub fn cap_group(&self, group: &str) -> Vec<(usize, &RewardRule)> {
        self.rules
            .iter()
            .enumerate()
            .filter(|(_, r)| r.share_cap_with.as_deref() == Some(group))
            .collect()
    }

    pub fn is_fee_free_abroad(&self) -> bool {
        self.foreign_currency_fee == 0.0
    }
}

/// What a rule's match value is compared against. Closed: the matcher
/// handles every variant explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "matchType", content = "matchValue", rename_all = "camelCase")]
pub enum RuleTarget {
    Base,
    Category(Vec<String>),
    Merchant(Vec<String>),
    PaymentMethod(Vec<String>),
}

impl RuleTarget {
    pub fn kind(&self) -> MatchKind {
        match self {
            RuleTarget::Base => MatchKind::Base,
            RuleTarget::Category(_) => MatchKind::Category,
            RuleTarget::Merchant(_) => MatchKind::Merchant,
            RuleTarget::PaymentMethod(_) => MatchKind::PaymentMethod,
        }
    }

    /// Match values; empty for `Base`.
    pub fn values(&self) -> &[String] {
        match self {
            RuleTarget::Base => &[],
            RuleTarget::Category(v) | RuleTarget::Merchant(v) | RuleTarget::PaymentMethod(v) => v,
        }
    }
}

/// Matching tiers, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchKind {
    Merchant,
    Category,
    PaymentMethod,
    Base,
}

impl MatchKind {
    pub const TIERS: [MatchKind; 4] = [
        MatchKind::Merchant,
        MatchKind::Category,
        MatchKind::PaymentMethod,
        MatchKind::Base,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Merchant => "merchant",
            MatchKind::Category => "category",
            MatchKind::PaymentMethod => "paymentMethod",
            MatchKind::Base => "base",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CapType {
    /// Ceiling on eligible spend
    Spending,
    /// Ceiling on payable reward
    Reward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CapPeriod {
    Monthly,
    Quarterly,
    Semiannual,
    Yearly,
    Promo,
}

impl CapPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapPeriod::Monthly => "monthly",
            CapPeriod::Quarterly => "quarterly",
            CapPeriod::Semiannual => "semiannual",
            CapPeriod::Yearly => "yearly",
            CapPeriod::Promo => "promo",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "month" => Some(CapPeriod::Monthly),
            "quarterly" | "quarter" => Some(CapPeriod::Quarterly),
            "semiannual" | "semi-annual" | "half-yearly" => Some(CapPeriod::Semiannual),
            "yearly" | "annual" | "year" => Some(CapPeriod::Yearly),
            "promo" | "promotion" => Some(CapPeriod::Promo),
            _ => None,
        }
    }
}

/// A cap always carries its type and period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cap {
    pub amount: f64,
    pub cap_type: CapType,
    pub period: CapPeriod,
}

impl Cap {
    pub fn spending(amount: f64, period: CapPeriod) -> Self {
        Self { amount, cap_type: CapType::Spending, period }
    }

    pub fn reward(amount: f64, period: CapPeriod) -> Self {
        Self { amount, cap_type: CapType::Reward, period }
    }
}

/// Inclusive calendar window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }
}

/// A single reward condition/rate pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RewardRule {
    pub description: String,
    pub target: RuleTarget,
    /// Total effective rate when matched, not a delta over base.
    pub percentage: f64,
    #[serde(default)]
    pub cap: Option<Cap>,
    #[serde(default)]
    pub share_cap_with: Option<String>,
    /// Card spend this month (including the transaction) must reach this.
    #[serde(default)]
    pub monthly_min_spend: Option<f64>,
    /// Per-transaction floor.
    #[serde(default)]
    pub min_spend: Option<f64>,
    #[serde(default)]
    pub exclude_categories: Vec<String>,
    #[serde(default)]
    pub exclude_payment_methods: Vec<String>,
    #[serde(default)]
    pub valid_date_range: Option<DateRange>,
    /// 0 = Sunday .. 6 = Saturday
    #[serde(default)]
    pub valid_days: Vec<u8>,
    /// Day of month, 1..=31
    #[serde(default)]
    pub valid_dates: Vec<u32>,
    #[serde(default)]
    pub is_foreign_currency: bool,
    #[serde(default)]
    pub is_physical_store: bool,
    #[serde(default)]
    pub is_discount: bool,
}

impl RewardRule {
    pub fn new(description: impl Into<String>, target: RuleTarget, percentage: f64) -> Self {
        Self {
            description: description.into(),
            target,
            percentage,
            cap: None,
            share_cap_with: None,
            monthly_min_spend: None,
            min_spend: None,
            exclude_categories: Vec::new(),
            exclude_payment_methods: Vec::new(),
            valid_date_range: None,
            valid_days: Vec::new(),
            valid_dates: Vec::new(),
            is_foreign_currency: false,
            is_physical_store: false,
            is_discount: false,
        }
    }

    pub fn base(description: impl Into<String>, percentage: f64) -> Self {
        Self::new(description, RuleTarget::Base, percentage)
    }

    pub fn with_cap(mut self, cap: Cap) -> Self {
        self.cap = Some(cap);
        self
    }

    pub fn with_shared_cap(mut self, group: impl Into<String>) -> Self {
        self.share_cap_with = Some(group.into());
        self
    }

    pub fn with_min_spend(mut self, min_spend: f64) -> Self {
        self.min_spend = Some(min_spend);
        self
    }

    pub fn with_monthly_min_spend(mut self, min_spend: f64) -> Self {
        self.monthly_min_spend = Some(min_spend);
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.valid_date_range = Some(range);
        self
    }

    pub fn with_valid_days(mut self, days: Vec<u8>) -> Self {
        self.valid_days = days;
        self
    }

    pub fn with_valid_dates(mut self, dates: Vec<u32>) -> Self {
        self.valid_dates = dates;
        self
    }

    pub fn excluding_categories(mut self, categories: &[&str]) -> Self {
        self.exclude_categories = categories.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn excluding_payment_methods(mut self, methods: &[&str]) -> Self {
        self.exclude_payment_methods = methods.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn foreign_currency(mut self) -> Self {
        self.is_foreign_currency = true;
        self
    }

    pub fn physical_store(mut self) -> Self {
        self.is_physical_store = true;
        self
    }

    pub fn discount(mut self) -> Self {
        self.is_discount = true;
        self
    }

    /// The threshold that gates the elevated rate, monthly taking precedence.
    pub fn min_spend_threshold(&self) -> Option<f64> {
        self.monthly_min_spend.or(self.min_spend)
    }

    /// Whether every declared activity window admits `date`.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        if let Some(range) = &self.valid_date_range {
            if !range.contains(date) {
                return false;
            }
        }
        if !self.valid_days.is_empty() {
            let weekday = date.weekday().num_days_from_sunday() as u8;
            if !self.valid_days.contains(&weekday) {
                return false;
            }
        }
        if !self.valid_dates.is_empty() && !self.valid_dates.contains(&date.day()) {
            return false;
        }
        true
    }

    pub fn has_activity_window(&self) -> bool {
        self.valid_date_range.is_some()
            || !self.valid_days.is_empty()
            || !self.valid_dates.is_empty()
    }
}

/// How a card's reward is expressed to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum RewardConfig {
    /// Cash rebate, no conversion
    #[default]
    Direct,
    /// `ratio` points are worth one currency unit
    DirectRate { ratio: f64, currency: String },
    /// Points accrue at the rule percentage and convert at `ratio` points per currency unit
    Conversion { ratio: f64, currency: String },
}

impl RewardConfig {
    pub fn currency(&self) -> Option<&str> {
        match self {
            RewardConfig::Direct => None,
            RewardConfig::DirectRate { currency, .. }
            | RewardConfig::Conversion { currency, .. } => Some(currency),
        }
    }
}
