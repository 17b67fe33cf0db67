//! Catalog diagnostics.
//!
//! A bad card never aborts a calculation: issues are attached to that
//! card's result and the rest of the catalog is still ranked.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::card::{Cap, Card, RuleTarget};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CatalogIssue {
    MissingBaseRule,
    #[serde(rename_all = "camelCase")]
    NegativePercentage { rule_index: usize },
    #[serde(rename_all = "camelCase")]
    InvertedDateRange { rule_index: usize },
    #[serde(rename_all = "camelCase")]
    EmptyMatchValues { rule_index: usize },
    #[serde(rename_all = "camelCase")]
    SelfExcludedCategory { rule_index: usize, category: String },
    /// Members of one `shareCapWith` group declare different periods.
    #[serde(rename_all = "camelCase")]
    ShareCapPeriodMismatch { group: String },
    /// Members of one `shareCapWith` group mix spending and reward caps.
    #[serde(rename_all = "camelCase")]
    ShareCapTypeMismatch { group: String },
    /// A `shareCapWith` group in which no member declares a cap.
    #[serde(rename_all = "camelCase")]
    ShareCapWithoutCap { group: String },
    /// Nothing matched the transaction, not even a base rule.
    NoEligibleRule,
}

impl fmt::Display for CatalogIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogIssue::MissingBaseRule => write!(f, "card has no base rule"),
            CatalogIssue::NegativePercentage { rule_index } => {
                write!(f, "rule #{rule_index} has a negative percentage")
            }
            CatalogIssue::InvertedDateRange { rule_index } => {
                write!(f, "rule #{rule_index} has validDateRange start after end")
            }
            CatalogIssue::EmptyMatchValues { rule_index } => {
                write!(f, "rule #{rule_index} has no match values")
            }
            CatalogIssue::SelfExcludedCategory { rule_index, category } => {
                write!(f, "rule #{rule_index} excludes its own category '{category}'")
            }
            CatalogIssue::ShareCapPeriodMismatch { group } => {
                write!(f, "cap group '{group}' mixes cap periods")
            }
            CatalogIssue::ShareCapTypeMismatch { group } => {
                write!(f, "cap group '{group}' mixes spending and reward caps")
            }
            CatalogIssue::ShareCapWithoutCap { group } => {
                write!(f, "cap group '{group}' declares no cap")
            }
            CatalogIssue::NoEligibleRule => write!(f, "no rule matched"),
        }
    }
}

pub fn validate_card(card: &Card) -> Vec<CatalogIssue> {
    let mut issues = Vec::new();

    if !card.has_base_rule() {
        issues.push(CatalogIssue::MissingBaseRule);
    }

    let mut groups: BTreeMap<&str, Vec<Option<Cap>>> = BTreeMap::new();

    for (rule_index, rule) in card.rules.iter().enumerate() {
        if rule.percentage < 0.0 {
            issues.push(CatalogIssue::NegativePercentage { rule_index });
        }
        if rule.valid_date_range.is_some_and(|r| r.is_inverted()) {
            issues.push(CatalogIssue::InvertedDateRange { rule_index });
        }
        if !matches!(rule.target, RuleTarget::Base) && rule.target.values().is_empty() {
            issues.push(CatalogIssue::EmptyMatchValues { rule_index });
        }
        if let RuleTarget::Category(values) = &rule.target {
            if let Some(category) = values.iter().find(|v| rule.exclude_categories.contains(v)) {
                issues.push(CatalogIssue::SelfExcludedCategory {
                    rule_index,
                    category: category.clone(),
                });
            }
        }
        if let Some(group) = rule.share_cap_with.as_deref() {
            groups.entry(group).or_default().push(rule.cap);
        }
    }

    for (group, caps) in groups {
        let declared: Vec<Cap> = caps.into_iter().flatten().collect();
        let Some(first) = declared.first() else {
            issues.push(CatalogIssue::ShareCapWithoutCap { group: group.to_string() });
            continue;
        };
        if declared.iter().any(|c| c.period != first.period) {
            issues.push(CatalogIssue::ShareCapPeriodMismatch { group: group.to_string() });
        }
        if declared.iter().any(|c| c.cap_type != first.cap_type) {
            issues.push(CatalogIssue::ShareCapTypeMismatch { group: group.to_string() });
        }
    }

    for issue in &issues {
        tracing::warn!(card = %card.id, %issue, "catalog inconsistency");
    }
    issues
}
