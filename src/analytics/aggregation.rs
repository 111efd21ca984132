//! Summary statistics over a filtered set of transactions.
//!
//! All functions take the already-filtered transaction set (see
//! [crate::transaction::TransactionFilter]) and group it by category,
//! calendar month or both. Grouping goes through one generic
//! group-and-reduce substrate ([group_totals]) so each statistic stays a
//! small transform over an ordered mapping.

use std::{collections::BTreeMap, ops::RangeInclusive};

use serde::{Deserialize, Serialize};
use time::Date;

use crate::transaction::Transaction;

/// The single reserved category value that marks a transaction as income.
const INCOME_CATEGORY: &str = "Income";

/// Whether a transaction with this category counts as income.
///
/// There is no explicit transaction-type field and amounts are stored as
/// absolute values, so this predicate is the only thing that decides the
/// income/expense split. Aggregates must never split on the sign of the
/// amount.
pub fn is_income_category(category: &str) -> bool {
    category == INCOME_CATEGORY
}

/// Key financial metrics over a filtered set of transactions.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// The sum of all income transactions.
    pub total_income: f64,
    /// The sum of all expense transactions.
    pub total_expenses: f64,
    /// Income minus expenses.
    pub net_balance: f64,
    /// Expenses divided by the number of days covered.
    pub daily_average: f64,
}

/// Income, expenses and net for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyStat {
    /// The month as a `YYYY-MM` key.
    pub month: String,
    /// The sum of the month's income transactions.
    pub income: f64,
    /// The sum of the month's expense transactions.
    pub expenses: f64,
    /// Income minus expenses for the month.
    pub net: f64,
}

/// The direction a category's spending is moving in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    /// The recent average is more than 5% above the older average.
    Increasing,
    /// The recent average is more than 5% below the older average.
    Decreasing,
    /// Anything in between.
    Stable,
}

/// A category's trend classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    /// The direction the monthly totals are moving in.
    pub direction: TrendDirection,
    /// The percentage change between the older and recent averages.
    pub percentage: f64,
}

/// Sum transaction amounts into an ordered mapping keyed by `key`.
///
/// This is the grouping substrate shared by every aggregate: grouping by
/// category, month or date are all instances of it.
pub(crate) fn group_totals<K, F>(transactions: &[Transaction], key: F) -> BTreeMap<K, f64>
where
    K: Ord,
    F: Fn(&Transaction) -> K,
{
    let mut totals = BTreeMap::new();

    for transaction in transactions {
        *totals.entry(key(transaction)).or_insert(0.0) += transaction.amount;
    }

    totals
}

/// Regroup a flat pair-keyed mapping into a nested one.
pub(crate) fn nest<A, B>(flat: BTreeMap<(A, B), f64>) -> BTreeMap<A, BTreeMap<B, f64>>
where
    A: Ord,
    B: Ord,
{
    let mut nested: BTreeMap<A, BTreeMap<B, f64>> = BTreeMap::new();

    for ((outer, inner), total) in flat {
        nested.entry(outer).or_default().insert(inner, total);
    }

    nested
}

/// The first day of the month `date` falls in, used as the grouping key for
/// monthly aggregates.
pub(crate) fn month_of(date: Date) -> Date {
    date.replace_day(1).unwrap()
}

/// Format a month grouping key as `YYYY-MM`.
pub(crate) fn month_key(month: Date) -> String {
    format!("{:04}-{:02}", month.year(), u8::from(month.month()))
}

/// The inclusive number of days between two dates.
pub(crate) fn day_span(start: Date, end: Date) -> i64 {
    (end - start).whole_days() + 1
}

/// The earliest and latest dates present in `transactions`.
pub(crate) fn observed_date_range(transactions: &[Transaction]) -> Option<(Date, Date)> {
    let min = transactions.iter().map(|t| t.date).min()?;
    let max = transactions.iter().map(|t| t.date).max()?;

    Some((min, max))
}

/// Per-month, per-category totals, ordered by month then category.
pub(crate) fn monthly_category_totals(
    transactions: &[Transaction],
) -> BTreeMap<Date, BTreeMap<String, f64>> {
    nest(group_totals(transactions, |t| {
        (month_of(t.date), t.category.clone())
    }))
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the key financial metrics for a filtered set of transactions.
///
/// The daily average is computed over `explicit_range` when the client
/// supplied both filter bounds, and over the observed date range of the
/// filtered set otherwise. An empty input produces all-zero metrics and a
/// non-positive day span produces a zero average; no input can make this
/// function divide by zero.
pub fn key_metrics(
    transactions: &[Transaction],
    explicit_range: Option<&RangeInclusive<Date>>,
) -> Metrics {
    if transactions.is_empty() {
        return Metrics::default();
    }

    let mut total_income = 0.0;
    let mut total_expenses = 0.0;

    for transaction in transactions {
        if is_income_category(&transaction.category) {
            total_income += transaction.amount;
        } else {
            total_expenses += transaction.amount;
        }
    }

    let span = match explicit_range {
        Some(range) => day_span(*range.start(), *range.end()),
        None => match observed_date_range(transactions) {
            Some((min, max)) => day_span(min, max),
            None => 0,
        },
    };

    let daily_average = if span > 0 {
        total_expenses / span as f64
    } else {
        0.0
    };

    Metrics {
        total_income,
        total_expenses,
        net_balance: total_income - total_expenses,
        daily_average,
    }
}

/// Calculate income, expenses and net per calendar month, ascending by
/// month key.
pub fn monthly_stats(transactions: &[Transaction]) -> Vec<MonthlyStat> {
    let mut totals: BTreeMap<Date, (f64, f64)> = BTreeMap::new();

    for transaction in transactions {
        let entry = totals.entry(month_of(transaction.date)).or_insert((0.0, 0.0));

        if is_income_category(&transaction.category) {
            entry.0 += transaction.amount;
        } else {
            entry.1 += transaction.amount;
        }
    }

    totals
        .into_iter()
        .map(|(month, (income, expenses))| MonthlyStat {
            month: month_key(month),
            income,
            expenses,
            net: income - expenses,
        })
        .collect()
}

/// Calculate the average amount per day for each category.
///
/// The day span always comes from the observed date range of the filtered
/// set, unlike [key_metrics] which prefers the explicit filter bounds.
/// Returns an empty mapping for empty input or a non-positive span.
pub fn daily_averages(transactions: &[Transaction]) -> BTreeMap<String, f64> {
    let Some((min, max)) = observed_date_range(transactions) else {
        return BTreeMap::new();
    };

    let span = day_span(min, max);
    if span <= 0 {
        return BTreeMap::new();
    }

    group_totals(transactions, |t| t.category.clone())
        .into_iter()
        .map(|(category, total)| (category, total / span as f64))
        .collect()
}

/// Calculate the month-over-month percentage change per category between
/// the two most recent distinct months.
///
/// Only categories present in the most recent month are reported. A
/// category absent from the previous month changes by 100% when its latest
/// total is positive and 0% otherwise. Fewer than two distinct months
/// produce an empty mapping.
pub fn percentage_changes(transactions: &[Transaction]) -> BTreeMap<String, f64> {
    let by_month = monthly_category_totals(transactions);

    let mut months = by_month.iter().rev();
    let (Some((_, latest)), Some((_, previous))) = (months.next(), months.next()) else {
        return BTreeMap::new();
    };

    latest
        .iter()
        .map(|(category, &latest_total)| {
            let previous_total = previous.get(category).copied().unwrap_or(0.0);

            let change = if previous_total != 0.0 {
                (latest_total - previous_total) / previous_total * 100.0
            } else if latest_total > 0.0 {
                100.0
            } else {
                0.0
            };

            (category.clone(), change)
        })
        .collect()
}

/// Classify the trend of each category's monthly totals.
///
/// Requires at least three distinct months; the categories are the union
/// over all months, with missing months counting as zero. The recent
/// average is the mean of the last two monthly totals and the older
/// average the mean of the first two.
pub fn trend_analysis(transactions: &[Transaction]) -> BTreeMap<String, Trend> {
    let by_month = monthly_category_totals(transactions);

    if by_month.len() < 3 {
        return BTreeMap::new();
    }

    let categories: std::collections::BTreeSet<&String> =
        by_month.values().flat_map(|totals| totals.keys()).collect();

    categories
        .into_iter()
        .map(|category| {
            let series: Vec<f64> = by_month
                .values()
                .map(|totals| totals.get(category).copied().unwrap_or(0.0))
                .collect();

            // NOTE: with exactly three months the middle month is counted in
            // both averages. This widened-window behaviour is intentional
            // and must not be "fixed" to a three-way split.
            let recent_avg = mean(&series[series.len() - 2..]);
            let older_avg = mean(&series[..2]);

            let (direction, percentage) = if older_avg != 0.0 {
                let percentage = (recent_avg - older_avg) / older_avg * 100.0;
                let direction = if percentage > 5.0 {
                    TrendDirection::Increasing
                } else if percentage < -5.0 {
                    TrendDirection::Decreasing
                } else {
                    TrendDirection::Stable
                };

                (direction, percentage)
            } else {
                (TrendDirection::Stable, 0.0)
            };

            (
                category.clone(),
                Trend {
                    direction,
                    percentage,
                },
            )
        })
        .collect()
}
