//! Loosely-typed catalog records, as stored upstream.
//!
//! Every field is optional or defaulted; [`crate::normalize`] turns these
//! into strict core types and reports what it had to guess or drop.

use serde::{Deserialize, Serialize};

use crate::registry::{Category, Merchant};

/// A catalog file is either a bare array of cards or a full object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCatalogFile {
    Cards(Vec<RawCard>),
    Full(RawCatalog),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawCatalog {
    pub cards: Vec<RawCard>,
    pub merchants: Vec<Merchant>,
    pub categories: Vec<Category>,
}

impl From<RawCatalogFile> for RawCatalog {
    fn from(file: RawCatalogFile) -> Self {
        match file {
            RawCatalogFile::Cards(cards) => RawCatalog { cards, ..Default::default() },
            RawCatalogFile::Full(catalog) => catalog,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawCard {
    pub id: String,
    pub name: String,
    pub bank: String,
    pub annual_fee: Option<f64>,
    pub fee_waiver_condition: Option<String>,
    pub foreign_currency_fee: Option<f64>,
    pub rules: Vec<RawRule>,
    pub reward_config: Option<RawRewardConfig>,
    pub tags: Vec<String>,
    pub apply_url: Option<String>,
    pub style: Option<RawStyle>,
    /// Hidden cards are kept upstream but never recommended
    pub hidden: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawStyle {
    pub bg_color: Option<String>,
    pub text_color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRewardConfig {
    pub method: Option<String>,
    pub ratio: Option<f64>,
    pub currency: Option<String>,
}

/// `matchValue` may be a single string or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawRule {
    pub description: String,
    pub match_type: String,
    pub match_value: Option<OneOrMany>,
    pub percentage: f64,
    pub cap: Option<f64>,
    pub cap_type: Option<String>,
    pub cap_period: Option<String>,
    pub share_cap_with: Option<String>,
    pub monthly_min_spend: Option<f64>,
    pub min_spend: Option<f64>,
    pub exclude_categories: Vec<String>,
    pub exclude_payment_methods: Vec<String>,
    pub valid_date_range: Option<RawDateRange>,
    pub valid_days: Vec<u8>,
    pub valid_dates: Vec<u32>,
    pub is_foreign_currency: bool,
    pub is_physical_store: bool,
    pub is_discount: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDateRange {
    pub start: String,
    pub end: String,
}
