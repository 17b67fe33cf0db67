//! Plain-text output. JSON output bypasses this module entirely.

use std::fmt::Write;

use rebate_catalog::NormalizeWarning;
use rebate_core::money::{round_money, round_percent, round_points};
use rebate_core::{
    CalculationResult, Card, CatalogIssue, DateSuggestion, Recommendation, ThresholdKind,
};
use rebate_planner::Allocation;

fn money(v: f64) -> String {
    format!("${:.2}", round_money(v))
}

fn pct(v: f64) -> String {
    format!("{:.2}%", round_percent(v))
}

fn notes(r: &CalculationResult) -> Vec<String> {
    let mut out = Vec::new();

    if r.fx_fee > 0.0 {
        out.push(format!(
            "gross {} less {} foreign-currency fee",
            pct(r.percentage),
            pct(r.fx_fee)
        ));
    }
    if r.is_capped {
        out.push("cap reached, excess earns the base rate".to_string());
    }
    if let Some(p) = &r.points {
        let mut line = format!("{:.0} {}", round_points(p.points_amount), p.points_currency);
        if let Some(cash) = p.points_cash_value {
            let _ = write!(line, " (worth {})", money(cash));
        }
        if let Some(cpp) = p.cost_per_point {
            let _ = write!(line, ", {} per point", money(cpp));
        }
        out.push(line);
    }
    if let Some(cost) = r.miles_cost {
        out.push(format!("{} per mile", money(cost)));
    }
    if let (Some(rule), Some(amount)) = (&r.discount_rule, r.discount_amount) {
        out.push(format!("discount: {rule}, save {}", money(amount)));
    }
    if let Some(o) = &r.over_cap_info {
        out.push(format!(
            "{}: minimum {} exceeds cap {}, {} of the bonus is unreachable",
            o.rule_description,
            money(o.min_spend),
            money(o.cap),
            money(o.unreachable_gap)
        ));
    }
    if let Some(s) = &r.spending_suggestion {
        let scope = match s.kind {
            ThresholdKind::PerTransaction => "this transaction",
            ThresholdKind::Monthly => "this month",
        };
        out.push(format!(
            "spend {} more {scope} for {} ({}, {})",
            money(s.shortfall),
            s.rule_description,
            pct(s.new_percentage),
            money(s.new_reward_amount)
        ));
    }
    if let Some(s) = &r.suggested_payment_method {
        out.push(format!(
            "pay with {} for {} ({})",
            s.method,
            pct(s.potential_percentage),
            money(s.potential_reward_amount)
        ));
    }
    match &r.date_suggestion {
        Some(DateSuggestion::Upcoming {
            rule_description,
            first_active,
            new_percentage,
            new_reward_amount,
            ..
        }) => out.push(format!(
            "wait until {first_active}: {rule_description} ({}, {})",
            pct(*new_percentage),
            money(*new_reward_amount)
        )),
        Some(DateSuggestion::Expiring {
            rule_description,
            ends_on,
            percentage_after,
        }) => out.push(format!(
            "{rule_description} ends {ends_on}, then {}",
            pct(*percentage_after)
        )),
        None => {}
    }
    if let Some(m) = &r.missed_discount {
        let when = m
            .next_active
            .map(|d| format!(", next on {d}"))
            .unwrap_or_default();
        out.push(format!("not today: {} ({}){when}", m.rule_description, pct(m.percentage)));
    }
    for issue in &r.diagnostics {
        out.push(format!("catalog: {issue}"));
    }
    out
}

pub fn format_recommendation(title: &str, amount: f64, rec: &Recommendation) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "# {title} · {}", money(amount));
    let _ = writeln!(
        s,
        "Showing {} of {} cards (source: {})\n",
        rec.count, rec.total_found, rec.data_source
    );

    for ranked in &rec.results {
        let r = &ranked.result;
        let owned = if ranked.is_owned { " [owned]" } else { "" };
        let rule = r
            .matched_rule
            .as_ref()
            .map(|m| m.description.as_str())
            .unwrap_or("no eligible rule");
        let _ = writeln!(
            s,
            "{:>2}. {}{owned}  {}  {}  [{rule}]",
            ranked.rank,
            r.card_name,
            pct(r.net_percentage),
            money(r.net_reward_amount)
        );
        for note in notes(r) {
            let _ = writeln!(s, "      - {note}");
        }
    }
    s
}

pub fn format_allocation(plan: &Allocation) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "# Card plan · {} per month\n", money(plan.total_spending));

    for a in &plan.card_assignments {
        let _ = writeln!(s, "{}  {} / month", a.card_name, money(a.monthly_reward));
        for c in &a.categories {
            let capped = if c.is_capped { " (capped)" } else { "" };
            let _ = writeln!(
                s,
                "    {:<16} {:>10}  {}  {}{capped}",
                c.category,
                money(c.amount),
                pct(c.percentage),
                money(c.reward_amount)
            );
        }
    }
    if !plan.unassigned.is_empty() {
        let _ = writeln!(s, "\nUnassigned: {}", plan.unassigned.join(", "));
    }

    let _ = writeln!(
        s,
        "\nTotal: {} / month, {} / year",
        money(plan.total_monthly_reward),
        money(plan.total_yearly_reward)
    );
    if let Some(c) = &plan.comparison {
        let _ = writeln!(
            s,
            "Best single card: {} at {} / month ({:+.1}% with this plan)",
            c.best_card_name,
            money(c.monthly_reward),
            round_percent(c.improvement_percent)
        );
    }
    s.push_str("\nGreedy assignment by largest category first; not guaranteed optimal.\n");
    s
}

/// Report for `rebate validate`; the count is cards with at least one issue.
pub fn format_validation(
    warnings: &[NormalizeWarning],
    cards: &[(&Card, Vec<CatalogIssue>)],
) -> (String, usize) {
    let mut s = String::new();
    for w in warnings {
        let _ = writeln!(s, "warning: {w}");
    }
    let mut bad = 0;
    for (card, issues) in cards {
        if issues.is_empty() {
            continue;
        }
        bad += 1;
        let _ = writeln!(s, "{} ({})", card.name, card.id);
        for issue in issues {
            let _ = writeln!(s, "  - {issue}");
        }
    }
    let _ = writeln!(
        s,
        "{} cards checked, {} with issues, {} normalization warnings",
        cards.len(),
        bad,
        warnings.len()
    );
    (s, bad)
}
