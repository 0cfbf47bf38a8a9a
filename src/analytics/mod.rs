//! Ledger analytics
//!
//! Deterministic statistics over an owner's entries: period totals,
//! category breakdowns, month-over-month trends and budget alerts.
//! Forecasting and recommendations live in their own submodules.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{EntryKind, LedgerEntry};

pub mod forecast;
pub mod recommend;

pub use forecast::{forecast, Forecast, FORECAST_WINDOW};
pub use recommend::{recommend, Recommendations, TIP_POOL};

/// Fraction of a budget at which the "near limit" alert starts
pub const NEAR_LIMIT_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryShare {
    pub category: String,
    pub total: f64,
    /// Share of the breakdown total, 0 when the total is 0
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeriodSummary {
    /// `YYYY-MM`
    pub period: String,
    pub kind: EntryKind,
    pub total: f64,
    pub entry_count: usize,
    pub categories: Vec<CategoryShare>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthComparison {
    pub current_period: String,
    pub previous_period: String,
    pub current: f64,
    pub previous: f64,
    /// Only present when the previous month has spending
    pub trend_pct: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    NearLimit,
    Exceeded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetAlert {
    pub category: String,
    pub limit: f64,
    pub spent: f64,
    pub percentage: f64,
    pub level: AlertLevel,
}

/// `YYYY-MM` of a date
pub fn period_of(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// `YYYY-MM` of the month before `date`
pub fn previous_period(date: NaiveDate) -> String {
    let previous = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date);
    period_of(previous)
}

pub fn percentage(part: f64, total: f64) -> f64 {
    if total == 0.0 {
        0.0
    } else {
        part / total * 100.0
    }
}

/// Per-category totals, largest first (first-seen order on ties)
pub fn category_breakdown<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Vec<CategoryShare> {
    let mut totals: Vec<(String, f64)> = Vec::new();

    for entry in entries {
        match totals.iter_mut().find(|(category, _)| *category == entry.category) {
            Some(slot) => slot.1 += entry.amount,
            None => totals.push((entry.category.clone(), entry.amount)),
        }
    }

    let grand_total: f64 = totals.iter().map(|(_, total)| total).sum();
    totals.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    totals
        .into_iter()
        .map(|(category, total)| CategoryShare {
            percentage: percentage(total, grand_total),
            category,
            total,
        })
        .collect()
}

fn of_kind(entries: &[LedgerEntry], kind: EntryKind) -> impl Iterator<Item = &LedgerEntry> {
    entries.iter().filter(move |entry| entry.kind == kind)
}

pub fn total(entries: &[LedgerEntry], kind: EntryKind) -> f64 {
    of_kind(entries, kind).map(|entry| entry.amount).sum()
}

pub fn period_total(entries: &[LedgerEntry], kind: EntryKind, period: &str) -> f64 {
    of_kind(entries, kind)
        .filter(|entry| entry.period() == period)
        .map(|entry| entry.amount)
        .sum()
}

pub fn period_summary(entries: &[LedgerEntry], kind: EntryKind, period: &str) -> PeriodSummary {
    let in_period: Vec<&LedgerEntry> = of_kind(entries, kind)
        .filter(|entry| entry.period() == period)
        .collect();

    PeriodSummary {
        period: period.to_string(),
        kind,
        total: in_period.iter().map(|entry| entry.amount).sum(),
        entry_count: in_period.len(),
        categories: category_breakdown(in_period),
    }
}

/// Current vs. previous month expenses
pub fn month_over_month(entries: &[LedgerEntry], today: NaiveDate) -> MonthComparison {
    let current_period = period_of(today);
    let previous_period = previous_period(today);

    let current = period_total(entries, EntryKind::Expense, &current_period);
    let previous = period_total(entries, EntryKind::Expense, &previous_period);

    let trend_pct = (previous > 0.0).then(|| (current - previous) / previous * 100.0);

    MonthComparison {
        current_period,
        previous_period,
        current,
        previous,
        trend_pct,
    }
}

/// Alert level for one category, `None` below the near-limit band
pub fn alert_level(spent: f64, limit: f64) -> Option<AlertLevel> {
    if limit <= 0.0 {
        return None;
    }

    if spent > limit {
        Some(AlertLevel::Exceeded)
    } else if spent >= NEAR_LIMIT_RATIO * limit && spent > 0.0 {
        Some(AlertLevel::NearLimit)
    } else {
        None
    }
}

pub fn budget_alerts(
    entries: &[LedgerEntry],
    budgets: &BTreeMap<String, f64>,
    today: NaiveDate,
) -> Vec<BudgetAlert> {
    let current_period = period_of(today);

    budgets
        .iter()
        .filter_map(|(category, &limit)| {
            let spent: f64 = of_kind(entries, EntryKind::Expense)
                .filter(|entry| entry.category == *category && entry.period() == current_period)
                .map(|entry| entry.amount)
                .sum();

            alert_level(spent, limit).map(|level| BudgetAlert {
                category: category.clone(),
                limit,
                spent,
                percentage: spent / limit * 100.0,
                level,
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::{TimeZone, Utc};

    pub fn entry_on(
        id: u64,
        kind: EntryKind,
        amount: f64,
        category: &str,
        (year, month, day): (i32, u32, u32),
    ) -> LedgerEntry {
        LedgerEntry {
            id,
            owner_id: "owner".to_string(),
            kind,
            amount,
            description: format!("item {}", id),
            category: category.to_string(),
            timestamp: Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap(),
        }
    }

    pub fn expense_on(id: u64, amount: f64, category: &str, date: (i32, u32, u32)) -> LedgerEntry {
        entry_on(id, EntryKind::Expense, amount, category, date)
    }
}
