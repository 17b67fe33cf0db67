//! Monthly spend profiles: how much a user spends per category.
//!
//! CSV layout (header required, `foreign` optional):
//! category,amount,foreign
//! dining,2000,
//! overseas,1500,true

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// Categories treated as foreign-currency spend unless a row says otherwise.
pub const FOREIGN_CATEGORIES: &[&str] = &["overseas", "travel_foreign"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySpend {
    pub category: String,
    /// Monthly amount
    pub amount: f64,
    pub is_foreign: bool,
}

impl CategorySpend {
    pub fn new(category: impl Into<String>, amount: f64) -> Self {
        let category = category.into();
        let is_foreign = FOREIGN_CATEGORIES.contains(&category.as_str());
        Self { category, amount, is_foreign }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpendProfile {
    pub entries: Vec<CategorySpend>,
}

impl SpendProfile {
    pub fn new(entries: Vec<CategorySpend>) -> Self {
        Self { entries }
    }

    /// Add or replace a category.
    pub fn set(&mut self, entry: CategorySpend) {
        match self.entries.iter_mut().find(|e| e.category == entry.category) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.amount.max(0.0)).sum()
    }

    /// Categories with spend, largest first, ties by category id.
    pub fn ordered(&self) -> Vec<&CategorySpend> {
        let mut out: Vec<&CategorySpend> = self.entries.iter().filter(|e| e.amount > 0.0).collect();
        out.sort_by(|a, b| {
            b.amount
                .total_cmp(&a.amount)
                .then_with(|| a.category.cmp(&b.category))
        });
        out
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "" => None,
        "true" | "yes" | "y" | "1" => Some(true),
        _ => Some(false),
    }
}

/// Parse a `category=amount` command-line pair.
pub fn parse_spend_arg(arg: &str) -> Result<CategorySpend> {
    let (category, amount) = arg
        .split_once('=')
        .with_context(|| format!("expected category=amount, got '{arg}'"))?;
    let category = category.trim();
    if category.is_empty() {
        bail!("empty category in '{arg}'");
    }
    let amount: f64 = amount
        .trim()
        .replace(',', "")
        .parse()
        .with_context(|| format!("invalid amount in '{arg}'"))?;
    Ok(CategorySpend::new(category, amount))
}

pub fn parse_spend_reader(reader: impl Read) -> Result<SpendProfile> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut profile = SpendProfile::default();
    for (line, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("reading spend row {}", line + 2))?;
        let category = record.get(0).unwrap_or("");
        if category.is_empty() || category.starts_with('#') {
            continue;
        }
        let amount: f64 = record
            .get(1)
            .unwrap_or("")
            .replace(',', "")
            .parse()
            .with_context(|| format!("invalid amount for '{category}' on row {}", line + 2))?;

        let mut entry = CategorySpend::new(category, amount);
        if let Some(foreign) = record.get(2).and_then(parse_bool) {
            entry.is_foreign = foreign;
        }
        profile.set(entry);
    }
    Ok(profile)
}

pub fn parse_spend_csv(path: impl AsRef<Path>) -> Result<SpendProfile> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_spend_reader(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profile_csv() {
        let csv = "category,amount,foreign\n\
                   dining,\"2,000\",\n\
                   supermarket,1500,\n\
                   overseas,800,\n\
                   travel,500,yes\n";
        let profile = parse_spend_reader(csv.as_bytes()).unwrap();
        assert_eq!(profile.entries.len(), 4);
        assert_eq!(profile.entries[0].amount, 2000.0);
        assert!(profile.entries[2].is_foreign);
        assert!(profile.entries[3].is_foreign);
        assert_eq!(profile.total(), 4800.0);
    }

    #[test]
    fn test_ordered_largest_first_then_id() {
        let profile = SpendProfile::new(vec![
            CategorySpend::new("transport", 500.0),
            CategorySpend::new("dining", 2000.0),
            CategorySpend::new("online", 2000.0),
            CategorySpend::new("tax", 0.0),
        ]);
        let order: Vec<&str> = profile.ordered().iter().map(|e| e.category.as_str()).collect();
        assert_eq!(order, vec!["dining", "online", "transport"]);
    }

    #[test]
    fn test_spend_arg() {
        let entry = parse_spend_arg("overseas=1,500").unwrap();
        assert_eq!(entry.amount, 1500.0);
        assert!(entry.is_foreign);
        assert!(parse_spend_arg("dining").is_err());
        assert!(parse_spend_arg("dining=lots").is_err());
    }

    #[test]
    fn test_bad_amount_reports_row() {
        let err = parse_spend_reader("category,amount\ndining,abc\n".as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("row 2"));
    }
}
