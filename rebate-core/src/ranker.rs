//! Ranker: orders card results and re-injects owned cards.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::CalculationResult;
use crate::error::EngineError;

/// What the user is collecting, which decides the sort key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardPreference {
    #[default]
    Cash,
    Miles,
}

impl FromStr for RewardPreference {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "miles" => Ok(Self::Miles),
            other => Err(EngineError::InvalidPreference(other.to_string())),
        }
    }
}

impl fmt::Display for RewardPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cash => write!(f, "cash"),
            Self::Miles => write!(f, "miles"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedResult {
    /// 1-based position in the full ordering, not in the returned slice
    pub rank: usize,
    pub is_owned: bool,
    #[serde(flatten)]
    pub result: CalculationResult,
}

/// Net reward desc, then net percentage desc, then card name, then id.
pub fn compare(a: &CalculationResult, b: &CalculationResult) -> Ordering {
    b.net_reward_amount
        .total_cmp(&a.net_reward_amount)
        .then_with(|| b.net_percentage.total_cmp(&a.net_percentage))
        .then_with(|| a.card_name.cmp(&b.card_name))
        .then_with(|| a.card_id.cmp(&b.card_id))
}

/// Cheapest miles first. Cards that earn no miles follow, in cash order.
pub fn compare_miles(a: &CalculationResult, b: &CalculationResult) -> Ordering {
    let by_cost = match (a.miles_cost, b.miles_cost) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_cost.then_with(|| compare(a, b))
}

/// Top `limit` results, followed by any owned card that fell outside the
/// slice, each keeping its true rank.
pub fn rank(
    mut results: Vec<CalculationResult>,
    limit: usize,
    owned: &[String],
    preference: RewardPreference,
) -> Vec<RankedResult> {
    match preference {
        RewardPreference::Cash => results.sort_by(compare),
        RewardPreference::Miles => results.sort_by(compare_miles),
    }

    results
        .into_iter()
        .enumerate()
        .filter_map(|(i, result)| {
            let is_owned = owned.iter().any(|id| *id == result.card_id);
            (i < limit || is_owned).then_some(RankedResult {
                rank: i + 1,
                is_owned,
                result,
            })
        })
        .collect()
}
