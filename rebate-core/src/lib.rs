//! rebate-core: reward calculation and recommendation engine for credit cards

pub mod card;
pub mod context;
pub mod engine;
pub mod error;
pub mod fx;
pub mod ledger;
pub mod matcher;
pub mod money;
pub mod points;
pub mod ranker;
pub mod resolver;
pub mod suggest;
pub mod time;
pub mod validate;

pub use card::{
    Cap, CapPeriod, CapType, Card, CardStyle, DateRange, MatchKind, RewardConfig, RewardRule,
    RuleTarget,
};
pub use context::{NoLookup, ResolvedTarget, TargetLookup, TransactionContext};
pub use engine::{
    CalculationResult, CatalogSnapshot, EngineOptions, Recommendation, calculate, recommend,
    validate_context,
};
pub use error::{EngineError, EngineResult};
pub use fx::{FxAdjustment, apply_fx};
pub use ledger::{CapConsumption, CapUsage, LedgerKey, SpendLedger};
pub use matcher::{MatchedRule, match_discount, match_rule};
pub use points::{PointsDisplay, miles_cost, to_display};
pub use ranker::{RankedResult, RewardPreference, rank};
pub use resolver::{DiscountInfo, OverCapInfo, Resolution, SpendShortfall, ThresholdKind, resolve};
pub use suggest::{DateSuggestion, MissedDiscount, PaymentMethodSuggestion, SpendingSuggestion};
pub use validate::{CatalogIssue, validate_card};
