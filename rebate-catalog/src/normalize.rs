//! Normalization: loosely-typed catalog records into strict core types.
//!
//! Fallbacks (missing cap type or period, unparseable dates, unknown match
//! types) are recorded as warnings instead of failing the whole catalog.

use std::fmt;

use anyhow::Result;
use chrono::NaiveDate;
use regex::Regex;

use rebate_core::{
    Cap, CapPeriod, CapType, Card, CardStyle, DateRange, RewardConfig, RewardRule, RuleTarget,
};

use crate::types::{RawCard, RawDateRange, RawRewardConfig, RawRule};

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeWarning {
    pub card_id: String,
    pub rule_index: Option<usize>,
    pub message: String,
}

impl fmt::Display for NormalizeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rule_index {
            Some(i) => write!(f, "{} rule #{}: {}", self.card_id, i, self.message),
            None => write!(f, "{}: {}", self.card_id, self.message),
        }
    }
}

/// Parses "2026-02-28" style dates, also accepting unpadded months and
/// days such as "2026-1-31".
pub struct DateParser {
    re: Regex,
}

impl DateParser {
    pub fn new() -> Result<Self> {
        let re = Regex::new(r"^\s*(?P<y>\d{4})-(?P<m>\d{1,2})-(?P<d>\d{1,2})\s*$")?;
        Ok(Self { re })
    }

    pub fn parse(&self, s: &str) -> Option<NaiveDate> {
        let caps = self.re.captures(s)?;
        NaiveDate::from_ymd_opt(
            caps["y"].parse().ok()?,
            caps["m"].parse().ok()?,
            caps["d"].parse().ok()?,
        )
    }
}

struct Normalizer {
    dates: DateParser,
    warnings: Vec<NormalizeWarning>,
}

impl Normalizer {
    fn warn(&mut self, card_id: &str, rule_index: Option<usize>, message: impl Into<String>) {
        let w = NormalizeWarning {
            card_id: card_id.to_string(),
            rule_index,
            message: message.into(),
        };
        tracing::warn!(warning = %w, "catalog normalization");
        self.warnings.push(w);
    }
}

/// Normalize every visible card. Hidden cards and cards without an id are
/// dropped.
pub fn normalize_cards(raw: Vec<RawCard>) -> Result<(Vec<Card>, Vec<NormalizeWarning>)> {
    let mut n = Normalizer {
        dates: DateParser::new()?,
        warnings: Vec::new(),
    };
    let mut cards = Vec::with_capacity(raw.len());

    for card in raw {
        if card.hidden {
            tracing::debug!(card = %card.id, "skipping hidden card");
            continue;
        }
        if card.id.trim().is_empty() {
            n.warn("<unnamed>", None, format!("card '{}' has no id, dropped", card.name));
            continue;
        }
        if cards.iter().any(|c: &Card| c.id == card.id.trim()) {
            n.warn(&card.id, None, "duplicate card id, later entry dropped");
            continue;
        }
        cards.push(normalize_card(card, &mut n));
    }

    Ok((cards, n.warnings))
}

fn normalize_card(raw: RawCard, n: &mut Normalizer) -> Card {
    let id = raw.id.trim().to_string();
    let rules = raw
        .rules
        .into_iter()
        .enumerate()
        .filter_map(|(i, rule)| normalize_rule(&id, i, rule, n))
        .collect();
    let reward_config = normalize_reward_config(&id, raw.reward_config, n);
    let style = raw.style.and_then(|s| {
        Some(CardStyle {
            bg_color: s.bg_color?,
            text_color: s.text_color?,
        })
    });

    Card {
        id,
        name: raw.name,
        bank: raw.bank,
        annual_fee: raw.annual_fee.unwrap_or(0.0).max(0.0),
        fee_waiver_condition: raw.fee_waiver_condition.filter(|s| !s.trim().is_empty()),
        foreign_currency_fee: raw.foreign_currency_fee.unwrap_or(0.0),
        rules,
        reward_config,
        tags: raw.tags,
        apply_url: raw.apply_url,
        style,
    }
}

fn normalize_rule(
    card_id: &str,
    index: usize,
    raw: RawRule,
    n: &mut Normalizer,
) -> Option<RewardRule> {
    let values = raw.match_value.map(|v| v.into_vec()).unwrap_or_default();
    let target = match raw.match_type.trim() {
        "base" => RuleTarget::Base,
        "category" => RuleTarget::Category(values),
        "merchant" => RuleTarget::Merchant(values),
        "paymentMethod" | "payment_method" => RuleTarget::PaymentMethod(values),
        other => {
            n.warn(card_id, Some(index), format!("unknown matchType '{other}', rule dropped"));
            return None;
        }
    };

    let cap = match raw.cap {
        Some(amount) => {
            let cap_type = match raw.cap_type.as_deref().map(str::trim) {
                Some("spending") => CapType::Spending,
                Some("reward") => CapType::Reward,
                other => {
                    n.warn(
                        card_id,
                        Some(index),
                        format!("capType {other:?} not recognized, assuming spending"),
                    );
                    CapType::Spending
                }
            };
            let period = match raw.cap_period.as_deref() {
                None => CapPeriod::Monthly,
                Some(p) => match CapPeriod::parse(p) {
                    Some(period) => period,
                    None => {
                        n.warn(
                            card_id,
                            Some(index),
                            format!("capPeriod '{p}' not recognized, assuming monthly"),
                        );
                        CapPeriod::Monthly
                    }
                },
            };
            Some(Cap { amount, cap_type, period })
        }
        None => None,
    };

    let valid_date_range = raw
        .valid_date_range
        .and_then(|r| normalize_range(card_id, index, &r, n));

    let valid_days: Vec<u8> = raw.valid_days.into_iter().filter(|d| *d <= 6).collect();
    let valid_dates: Vec<u32> =
        raw.valid_dates.into_iter().filter(|d| (1..=31).contains(d)).collect();

    Some(RewardRule {
        description: raw.description,
        target,
        percentage: raw.percentage,
        cap,
        share_cap_with: raw.share_cap_with.filter(|g| !g.trim().is_empty()),
        monthly_min_spend: raw.monthly_min_spend,
        min_spend: raw.min_spend,
        exclude_categories: raw.exclude_categories,
        exclude_payment_methods: raw.exclude_payment_methods,
        valid_date_range,
        valid_days,
        valid_dates,
        is_foreign_currency: raw.is_foreign_currency,
        is_physical_store: raw.is_physical_store,
        is_discount: raw.is_discount,
    })
}

fn normalize_range(
    card_id: &str,
    index: usize,
    raw: &RawDateRange,
    n: &mut Normalizer,
) -> Option<DateRange> {
    match (n.dates.parse(&raw.start), n.dates.parse(&raw.end)) {
        (Some(start), Some(end)) => Some(DateRange::new(start, end)),
        _ => {
            n.warn(
                card_id,
                Some(index),
                format!("validDateRange '{}'..'{}' unparseable, ignored", raw.start, raw.end),
            );
            None
        }
    }
}

fn normalize_reward_config(
    card_id: &str,
    raw: Option<RawRewardConfig>,
    n: &mut Normalizer,
) -> RewardConfig {
    let Some(raw) = raw else {
        return RewardConfig::Direct;
    };
    let method = raw.method.as_deref().map(str::trim).unwrap_or("direct");
    if method == "direct" {
        return RewardConfig::Direct;
    }

    let currency = raw.currency.unwrap_or_default();
    let Some(ratio) = raw.ratio.filter(|r| r.is_finite() && *r > 0.0) else {
        n.warn(
            card_id,
            None,
            format!("rewardConfig '{method}' without a positive ratio, treated as direct"),
        );
        return RewardConfig::Direct;
    };
    match method {
        "direct_rate" => RewardConfig::DirectRate { ratio, currency },
        "conversion" | "miles" => RewardConfig::Conversion { ratio, currency },
        other => {
            n.warn(
                card_id,
                None,
                format!("unknown rewardConfig method '{other}', treated as direct"),
            );
            RewardConfig::Direct
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OneOrMany;

    fn raw_card(rules: Vec<RawRule>) -> RawCard {
        RawCard {
            id: "hsbc-red".into(),
            name: "HSBC Red".into(),
            bank: "HSBC".into(),
            rules,
            ..Default::default()
        }
    }

    fn rule(match_type: &str) -> RawRule {
        RawRule {
            description: "r".into(),
            match_type: match_type.into(),
            percentage: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_loose_dates() {
        let p = DateParser::new().unwrap();
        assert_eq!(p.parse("2026-1-31"), NaiveDate::from_ymd_opt(2026, 1, 31));
        assert_eq!(p.parse("2026-02-28"), NaiveDate::from_ymd_opt(2026, 2, 28));
        assert_eq!(p.parse("2026-02-30"), None);
        assert_eq!(p.parse("soon"), None);
    }

    #[test]
    fn test_single_match_value_becomes_list() {
        let mut r = rule("category");
        r.match_value = Some(OneOrMany::One("dining".into()));
        let (cards, warnings) = normalize_cards(vec![raw_card(vec![rule("base"), r])]).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(cards[0].rules[1].target, RuleTarget::Category(vec!["dining".into()]));
    }

    #[test]
    fn test_cap_defaults_with_warning_for_missing_type() {
        let mut r = rule("category");
        r.cap = Some(100.0);
        let (cards, warnings) = normalize_cards(vec![raw_card(vec![r])]).unwrap();
        let cap = cards[0].rules[0].cap.unwrap();
        assert_eq!(cap.cap_type, CapType::Spending);
        assert_eq!(cap.period, CapPeriod::Monthly);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].rule_index, Some(0));
    }

    #[test]
    fn test_unknown_match_type_dropped() {
        let (cards, warnings) =
            normalize_cards(vec![raw_card(vec![rule("base"), rule("bogus")])]).unwrap();
        assert_eq!(cards[0].rules.len(), 1);
        assert!(warnings[0].message.contains("bogus"));
    }

    #[test]
    fn test_hidden_and_duplicate_cards_skipped() {
        let mut hidden = raw_card(vec![rule("base")]);
        hidden.id = "hidden".into();
        hidden.hidden = true;
        let (cards, warnings) = normalize_cards(vec![
            raw_card(vec![rule("base")]),
            raw_card(vec![rule("base")]),
            hidden,
        ])
        .unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_reward_config_methods() {
        let mut card = raw_card(vec![rule("base")]);
        card.reward_config = Some(RawRewardConfig {
            method: Some("conversion".into()),
            ratio: Some(10.0),
            currency: Some("RC".into()),
        });
        let (cards, _) = normalize_cards(vec![card]).unwrap();
        assert_eq!(
            cards[0].reward_config,
            RewardConfig::Conversion { ratio: 10.0, currency: "RC".into() }
        );

        let mut no_ratio = raw_card(vec![rule("base")]);
        no_ratio.reward_config = Some(RawRewardConfig {
            method: Some("direct_rate".into()),
            ratio: None,
            currency: None,
        });
        let (cards, warnings) = normalize_cards(vec![no_ratio]).unwrap();
        assert_eq!(cards[0].reward_config, RewardConfig::Direct);
        assert_eq!(warnings.len(), 1);
    }
}
