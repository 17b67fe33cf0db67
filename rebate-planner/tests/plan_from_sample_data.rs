use chrono::NaiveDate;
use rebate_catalog::load_catalog_file;
use rebate_core::{CapPeriod, LedgerKey, SpendLedger};
use rebate_planner::ledger_csv::parse_ledger_csv;
use rebate_planner::{Constraints, allocate, parse_spend_csv};
use std::path::PathBuf;

fn root_file(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join(name)
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

#[test]
fn test_sample_profile_parses() {
    let profile = parse_spend_csv(root_file("spend.csv")).unwrap();
    assert_eq!(profile.entries.len(), 5);
    assert_eq!(profile.total(), 8000.0);
    let overseas = profile.entries.iter().find(|e| e.category == "overseas").unwrap();
    assert!(overseas.is_foreign);
}

#[test]
fn test_three_card_plan_over_sample_catalog() {
    let loaded = load_catalog_file(root_file("catalog.json")).unwrap();
    let profile = parse_spend_csv(root_file("spend.csv")).unwrap();
    let plan = allocate(
        &loaded.snapshot,
        &profile,
        &Constraints { max_cards: 3, no_annual_fee_only: false },
        &SpendLedger::new(),
        date(),
    )
    .unwrap();

    let cards: Vec<&str> = plan.card_assignments.iter().map(|a| a.card_id.as_str()).collect();
    assert_eq!(cards, vec!["dbs-eminent", "mox-credit", "aeon-wakuwaku"]);
    assert_eq!(plan.category_allocation["dining"], "dbs-eminent");
    assert_eq!(plan.category_allocation["supermarket"], "mox-credit");
    assert_eq!(plan.category_allocation["online"], "aeon-wakuwaku");
    // Fee-free abroad card is already open
    assert_eq!(plan.category_allocation["overseas"], "mox-credit");
    // Citi ties on transport but every slot is taken
    assert_eq!(plan.category_allocation["transport"], "dbs-eminent");

    assert!((plan.total_monthly_reward - 315.0).abs() < 1e-9);
    assert!((plan.total_yearly_reward - 3780.0).abs() < 1e-9);
    assert_eq!(plan.total_spending, 8000.0);
    assert!(plan.unassigned.is_empty());

    let cmp = plan.comparison.unwrap();
    assert_eq!(cmp.best_card_id, "dbs-eminent");
    assert!((cmp.monthly_reward - 190.0).abs() < 1e-9);
    assert!((cmp.improvement_percent - 125.0 / 190.0 * 100.0).abs() < 1e-9);
}

#[test]
fn test_fee_free_plan_over_sample_catalog() {
    let loaded = load_catalog_file(root_file("catalog.json")).unwrap();
    let profile = parse_spend_csv(root_file("spend.csv")).unwrap();
    let plan = allocate(
        &loaded.snapshot,
        &profile,
        &Constraints { max_cards: 3, no_annual_fee_only: true },
        &SpendLedger::new(),
        date(),
    )
    .unwrap();

    assert!(!plan.category_allocation.values().any(|id| id == "dbs-eminent" || id == "boc-cheers"));
    assert_eq!(plan.category_allocation["dining"], "citi-cashback");
    assert!((plan.total_monthly_reward - 225.0).abs() < 1e-9);
    assert_eq!(plan.comparison.unwrap().best_card_id, "aeon-wakuwaku");
}

#[test]
fn test_sample_ledger_feeds_allocation() {
    let ledger = parse_ledger_csv(root_file("ledger.csv")).unwrap();
    let key = LedgerKey::new("hsbc-red", "red-bonus", CapPeriod::Monthly);
    assert_eq!(ledger.usage(&key).rewarded, 80.0);
    assert_eq!(ledger.card_spend("sc-smart", CapPeriod::Monthly), 2500.0);

    let loaded = load_catalog_file(root_file("catalog.json")).unwrap();
    let profile = parse_spend_csv(root_file("spend.csv")).unwrap();
    let plan =
        allocate(&loaded.snapshot, &profile, &Constraints::default(), &ledger, date()).unwrap();
    assert!(plan.card_assignments.len() <= 3);
    assert!((plan.total_monthly_reward - 315.0).abs() < 1e-9);
}

#[test]
fn test_plan_serializes_camel_case() {
    let loaded = load_catalog_file(root_file("catalog.json")).unwrap();
    let profile = parse_spend_csv(root_file("spend.csv")).unwrap();
    let plan = allocate(
        &loaded.snapshot,
        &profile,
        &Constraints::default(),
        &SpendLedger::new(),
        date(),
    )
    .unwrap();

    let v = serde_json::to_value(&plan).unwrap();
    assert_eq!(v["categoryAllocation"]["online"], "aeon-wakuwaku");
    assert_eq!(v["cardAssignments"].as_array().unwrap().len(), 3);
    assert!(v["comparison"]["improvementPercent"].as_f64().unwrap() > 0.0);
}
