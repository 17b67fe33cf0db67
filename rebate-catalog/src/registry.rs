//! Merchant and category registries: resolve free-text queries to ids.

use serde::{Deserialize, Serialize};

use rebate_core::{ResolvedTarget, TargetLookup};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Merchant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category_ids: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    merchants: Vec<Merchant>,
    categories: Vec<Category>,
}

/// Either string contains the other, ignoring case. Empty never matches.
fn overlaps(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a))
}

impl Registry {
    pub fn new(merchants: Vec<Merchant>, categories: Vec<Category>) -> Self {
        Self { merchants, categories }
    }

    pub fn is_empty(&self) -> bool {
        self.merchants.is_empty() && self.categories.is_empty()
    }

    pub fn merchants(&self) -> &[Merchant] {
        &self.merchants
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Exact id first, then name, then alias.
    pub fn find_merchant(&self, query: &str) -> Option<&Merchant> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return None;
        }
        self.merchants
            .iter()
            .find(|m| m.id.to_lowercase() == q)
            .or_else(|| self.merchants.iter().find(|m| m.name.to_lowercase().contains(&q)))
            .or_else(|| {
                self.merchants
                    .iter()
                    .find(|m| m.aliases.iter().any(|a| overlaps(a, &q)))
            })
    }

    pub fn find_category(&self, query: &str) -> Option<&Category> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return None;
        }
        self.categories
            .iter()
            .find(|c| c.id.to_lowercase() == q)
            .or_else(|| self.categories.iter().find(|c| overlaps(&c.name, &q)))
    }

    /// Resolved merchant or category name, or the query itself.
    pub fn display_name(&self, query: &str) -> String {
        if let Some(m) = self.find_merchant(query) {
            return m.name.clone();
        }
        if let Some(c) = self.find_category(query) {
            return c.name.clone();
        }
        query.to_string()
    }
}

impl TargetLookup for Registry {
    fn resolve(&self, query: &str) -> ResolvedTarget {
        let merchant = self.find_merchant(query);
        let category = self.find_category(query);
        let target = ResolvedTarget {
            merchant_id: merchant.map(|m| m.id.clone()),
            merchant_categories: merchant.map(|m| m.category_ids.clone()).unwrap_or_default(),
            category_id: category.map(|c| c.id.clone()),
        };
        tracing::debug!(
            query,
            merchant = ?target.merchant_id,
            category = ?target.category_id,
            "resolved query"
        );
        target
    }
}
