use chrono::NaiveDate;
use rebate_catalog::{LoadedCatalog, load_catalog_file};
use rebate_core::{
    EngineOptions, Recommendation, RewardPreference, SpendLedger, TransactionContext, recommend,
    validate_card,
};
use std::path::PathBuf;

fn catalog_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("catalog.json")
}

fn catalog() -> LoadedCatalog {
    load_catalog_file(catalog_path()).unwrap()
}

fn on(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn run(loaded: &LoadedCatalog, ctx: TransactionContext) -> Recommendation {
    let ctx = ctx.resolved_with(&loaded.registry);
    recommend(&loaded.snapshot, &ctx, &SpendLedger::new(), &EngineOptions::default()).unwrap()
}

fn ids(rec: &Recommendation) -> Vec<&str> {
    rec.results.iter().map(|r| r.result.card_id.as_str()).collect()
}

#[test]
fn test_sample_catalog_is_clean() {
    let loaded = catalog();
    assert_eq!(loaded.snapshot.cards.len(), 8);
    assert!(loaded.snapshot.card("legacy-card").is_none());
    assert!(loaded.warnings.is_empty(), "{:?}", loaded.warnings);
    for card in loaded.snapshot.cards.iter() {
        assert!(validate_card(card).is_empty(), "{} has issues", card.id);
    }
}

#[test]
fn test_merchant_query_ranks_designated_merchant_card_first() {
    let loaded = catalog();
    let rec = run(&loaded, TransactionContext::new("壽司郎", 500.0, on(2026, 10, 18)));

    assert_eq!(&ids(&rec)[..3], &["hsbc-red", "dbs-eminent", "citi-cashback"]);
    let top = &rec.results[0].result;
    assert!((top.net_reward_amount - 40.0).abs() < 1e-9);
    assert_eq!(top.points.as_ref().unwrap().points_amount, 400.0);
    assert_eq!(rec.total_found, 8);
    assert!(rec.data_source.ends_with("catalog.json"));
}

#[test]
fn test_foreign_spend_prefers_fee_free_card() {
    let loaded = catalog();
    let rec = run(&loaded, TransactionContext::new("overseas", 6000.0, on(2026, 10, 18)).foreign());

    let top = &rec.results[0].result;
    assert_eq!(top.card_id, "mox-credit");
    assert!(top.fee_free);
    assert!((top.net_reward_amount - 60.0).abs() < 1e-9);

    let boc = rec
        .results
        .iter()
        .map(|r| &r.result)
        .find(|r| r.card_id == "boc-cheers")
        .unwrap();
    assert!(boc.is_capped);
    assert!((boc.reward_amount - 132.0).abs() < 1e-9);
    assert!(boc.net_percentage <= boc.percentage);
    let over = boc.over_cap_info.as_ref().unwrap();
    assert!((over.unreachable_gap - 2000.0).abs() < 1e-9);
}

#[test]
fn test_online_merchant_with_monthly_threshold_suggestion() {
    let loaded = catalog();
    let rec = run(&loaded, TransactionContext::new("hktv", 1000.0, on(2026, 10, 18)).online());

    assert_eq!(rec.results[0].result.card_id, "aeon-wakuwaku");
    let sc = rec
        .results
        .iter()
        .map(|r| &r.result)
        .find(|r| r.card_id == "sc-smart")
        .unwrap();
    assert_eq!(sc.reward_amount, 0.0);
    let s = sc.spending_suggestion.as_ref().unwrap();
    assert!((s.shortfall - 3000.0).abs() < 1e-9);
    assert!((s.new_reward_amount - 50.0).abs() < 1e-9);
}

#[test]
fn test_discount_day_and_missed_discount() {
    let loaded = catalog();

    let on_day = run(&loaded, TransactionContext::new("一田", 500.0, on(2026, 10, 13)));
    let aeon = on_day.results.iter().find(|r| r.result.card_id == "aeon-wakuwaku").unwrap();
    assert!((aeon.result.discount_amount.unwrap() - 40.0).abs() < 1e-9);

    let off_day = run(&loaded, TransactionContext::new("一田", 500.0, on(2026, 10, 18)));
    let aeon = off_day.results.iter().find(|r| r.result.card_id == "aeon-wakuwaku").unwrap();
    assert!(aeon.result.discount_amount.is_none());
    assert_eq!(aeon.result.missed_discount.as_ref().unwrap().next_active, Some(on(2026, 10, 23)));
}

#[test]
fn test_owned_card_reinjected_outside_limit() {
    let loaded = catalog();
    let ctx =
        TransactionContext::new("壽司郎", 500.0, on(2026, 10, 18)).resolved_with(&loaded.registry);
    let options = EngineOptions {
        limit: 2,
        owned_cards: vec!["sc-smart".into()],
        ..EngineOptions::default()
    };
    let rec = recommend(&loaded.snapshot, &ctx, &SpendLedger::new(), &options).unwrap();
    assert_eq!(rec.count, 3);
    let owned = rec.results.last().unwrap();
    assert_eq!(owned.result.card_id, "sc-smart");
    assert!(owned.is_owned);
    assert_eq!(owned.rank, 8);
}

#[test]
fn test_display_name_uses_registry() {
    let loaded = catalog();
    assert_eq!(loaded.registry.display_name("一田"), "YATA 一田");
    assert_eq!(loaded.registry.display_name("unknown shop"), "unknown shop");
}

#[test]
fn test_miles_preference_puts_miles_card_first() {
    let loaded = catalog();
    let ctx = TransactionContext::new("overseas", 6000.0, on(2026, 10, 18))
        .foreign()
        .resolved_with(&loaded.registry);
    let options = EngineOptions {
        preference: RewardPreference::Miles,
        ..EngineOptions::default()
    };
    let rec = recommend(&loaded.snapshot, &ctx, &SpendLedger::new(), &options).unwrap();

    // 0.4% of 6000 = 24 RC = 240 miles
    let top = &rec.results[0].result;
    assert_eq!(top.card_id, "hsbc-red");
    assert!((top.miles_cost.unwrap() - 25.0).abs() < 1e-9);
    // Cards without miles keep cash order after it
    assert_eq!(rec.results[1].result.card_id, "mox-credit");
    assert!(rec.results[1].result.miles_cost.is_none());
}
