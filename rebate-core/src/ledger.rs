//! Caller-supplied spend ledger.
//!
//! Holds how much spend and reward a card has already used per cap group and
//! period. The engine only reads it; callers that want shared-cap semantics
//! across calls record each result's [`CapConsumption`] into their own copy.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::card::CapPeriod;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerKey {
    pub card_id: String,
    pub cap_group: String,
    pub period: CapPeriod,
}

impl LedgerKey {
    pub fn new(
        card_id: impl Into<String>,
        cap_group: impl Into<String>,
        period: CapPeriod,
    ) -> Self {
        Self {
            card_id: card_id.into(),
            cap_group: cap_group.into(),
            period,
        }
    }
}

/// Spend and reward already drawn from one cap pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapUsage {
    pub spent: f64,
    pub rewarded: f64,
}

/// What a calculation would draw from its cap pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapConsumption {
    pub key: LedgerKey,
    pub spend: f64,
    pub reward: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpendLedger {
    caps: HashMap<LedgerKey, CapUsage>,
    /// Card-level spend per period, for `monthlyMinSpend`
    card_spend: HashMap<(String, CapPeriod), f64>,
}

impl SpendLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.caps.is_empty() && self.card_spend.is_empty()
    }

    pub fn usage(&self, key: &LedgerKey) -> CapUsage {
        self.caps.get(key).copied().unwrap_or_default()
    }

    pub fn card_spend(&self, card_id: &str, period: CapPeriod) -> f64 {
        self.card_spend
            .get(&(card_id.to_string(), period))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn with_usage(mut self, key: LedgerKey, usage: CapUsage) -> Self {
        self.set_usage(key, usage);
        self
    }

    pub fn with_card_spend(
        mut self,
        card_id: impl Into<String>,
        period: CapPeriod,
        spent: f64,
    ) -> Self {
        self.card_spend.insert((card_id.into(), period), spent);
        self
    }

    pub fn set_usage(&mut self, key: LedgerKey, usage: CapUsage) {
        self.caps.insert(key, usage);
    }

    pub fn add_card_spend(&mut self, card_id: &str, period: CapPeriod, amount: f64) {
        *self
            .card_spend
            .entry((card_id.to_string(), period))
            .or_insert(0.0) += amount;
    }

    /// Accumulate a consumption into the pool it came from.
    pub fn record(&mut self, consumption: &CapConsumption) {
        let entry = self.caps.entry(consumption.key.clone()).or_default();
        entry.spent += consumption.spend;
        entry.rewarded += consumption.reward;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_entries_read_as_zero() {
        let ledger = SpendLedger::new();
        let key = LedgerKey::new("hsbc-red", "online", CapPeriod::Monthly);
        assert_eq!(ledger.usage(&key), CapUsage::default());
        assert_eq!(ledger.card_spend("hsbc-red", CapPeriod::Monthly), 0.0);
    }

    #[test]
    fn test_record_accumulates() {
        let key = LedgerKey::new("hsbc-red", "online", CapPeriod::Monthly);
        let mut ledger = SpendLedger::new().with_usage(
            key.clone(),
            CapUsage { spent: 1000.0, rewarded: 40.0 },
        );
        ledger.record(&CapConsumption { key: key.clone(), spend: 500.0, reward: 20.0 });
        assert_eq!(ledger.usage(&key), CapUsage { spent: 1500.0, rewarded: 60.0 });
    }

    #[test]
    fn test_card_spend_is_per_period() {
        let mut ledger = SpendLedger::new().with_card_spend("sc-smart", CapPeriod::Monthly, 2500.0);
        ledger.add_card_spend("sc-smart", CapPeriod::Monthly, 500.0);
        assert_eq!(ledger.card_spend("sc-smart", CapPeriod::Monthly), 3000.0);
        assert_eq!(ledger.card_spend("sc-smart", CapPeriod::Yearly), 0.0);
    }
}
