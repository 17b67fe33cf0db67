//! Import a caller-maintained spend ledger.
//!
//! CSV layout (header required):
//! card_id,cap_group,period,spent,rewarded
//!
//! A row with an empty `cap_group` is card-level period spend, used for
//! monthly minimum-spend thresholds; `rewarded` is ignored there.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use rebate_core::{CapPeriod, CapUsage, LedgerKey, SpendLedger};

#[derive(Debug, Deserialize)]
struct LedgerRow {
    card_id: String,
    #[serde(default)]
    cap_group: String,
    period: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    spent: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    rewarded: Option<f64>,
}

pub fn parse_ledger_reader(reader: impl Read) -> Result<SpendLedger> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut ledger = SpendLedger::new();

    for (line, result) in rdr.deserialize::<LedgerRow>().enumerate() {
        let row = result.with_context(|| format!("reading ledger row {}", line + 2))?;
        let period = CapPeriod::parse(&row.period).with_context(|| {
            format!("unknown period '{}' on ledger row {}", row.period, line + 2)
        })?;

        let spent = row.spent.unwrap_or(0.0);
        let rewarded = row.rewarded.unwrap_or(0.0);

        if row.cap_group.is_empty() {
            ledger.add_card_spend(&row.card_id, period, spent);
        } else {
            let key = LedgerKey::new(row.card_id, row.cap_group, period);
            let prior = ledger.usage(&key);
            ledger.set_usage(
                key,
                CapUsage {
                    spent: prior.spent + spent,
                    rewarded: prior.rewarded + rewarded,
                },
            );
        }
    }
    Ok(ledger)
}

pub fn parse_ledger_csv(path: impl AsRef<Path>) -> Result<SpendLedger> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_ledger_reader(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_rows_and_card_rows() {
        let csv = "card_id,cap_group,period,spent,rewarded\n\
                   hsbc-red,red-bonus,monthly,1000,40\n\
                   hsbc-red,red-bonus,monthly,500,20\n\
                   sc-smart,,monthly,2500,\n";
        let ledger = parse_ledger_reader(csv.as_bytes()).unwrap();
        let key = LedgerKey::new("hsbc-red", "red-bonus", CapPeriod::Monthly);
        assert_eq!(ledger.usage(&key), CapUsage { spent: 1500.0, rewarded: 60.0 });
        assert_eq!(ledger.card_spend("sc-smart", CapPeriod::Monthly), 2500.0);
    }

    #[test]
    fn test_blank_amounts_read_as_zero() {
        let csv = "card_id,cap_group,period,spent,rewarded\n\
                   sc-smart,,monthly,2500,\n\
                   hsbc-red,red-bonus,monthly,,40\n";
        let ledger = parse_ledger_reader(csv.as_bytes()).unwrap();
        assert_eq!(ledger.card_spend("sc-smart", CapPeriod::Monthly), 2500.0);
        let key = LedgerKey::new("hsbc-red", "red-bonus", CapPeriod::Monthly);
        assert_eq!(ledger.usage(&key), CapUsage { spent: 0.0, rewarded: 40.0 });
    }

    #[test]
    fn test_unknown_period_is_an_error() {
        let csv = "card_id,cap_group,period,spent,rewarded\na,g,fortnightly,1,1\n";
        let err = parse_ledger_reader(csv.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("fortnightly"));
    }
}
