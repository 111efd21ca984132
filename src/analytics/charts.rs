//! Chart-ready series built from a filtered set of transactions.
//!
//! Each chart type is a small transform over the same grouping substrate as
//! the other aggregates. The output mirrors the `{labels, datasets}`
//! structure consumed by client-side charting libraries, so field names use
//! their camelCase spelling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::transaction::Transaction;

use super::aggregation::{group_totals, month_key, monthly_category_totals, nest};

/// The fixed color palette cycled over categories.
///
/// Assignment is cosmetic; all that matters is that a category's color is
/// stable and distinct-where-possible within one response.
const PALETTE: [&str; 12] = [
    "#667eea", "#764ba2", "#f093fb", "#f5576c", "#4facfe", "#00f2fe", "#43e97b", "#38f9d7",
    "#ffecd2", "#fcb69f", "#a8edea", "#fed6e3",
];

/// The number of data points the trend chart's moving average looks back
/// over, inclusive of the current point.
const TREND_WINDOW: usize = 7;

/// The supported chart shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartType {
    /// Per-category totals with no time axis.
    Pie,
    /// Per-date totals per category.
    Bar,
    /// An alias for [ChartType::Area].
    Line,
    /// Per-date totals per category with filled, smoothed styling.
    Area,
    /// Per-date totals per category plus a trailing moving average.
    Trend,
    /// Per-month totals per category.
    Comparison,
}

impl ChartType {
    /// Parse a chart type from its query-parameter spelling.
    ///
    /// Unknown values fall back to the area shape rather than erroring.
    pub fn parse(value: &str) -> Self {
        match value {
            "pie" => ChartType::Pie,
            "bar" => ChartType::Bar,
            "line" => ChartType::Line,
            "area" => ChartType::Area,
            "trend" => ChartType::Trend,
            "comparison" => ChartType::Comparison,
            _ => ChartType::Area,
        }
    }
}

/// A color specification for a dataset: either one color for the whole
/// series or one color per slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Paint {
    /// A single color shared by every point in the series.
    Solid(String),
    /// One color per data point, as used by pie charts.
    PerSlice(Vec<String>),
}

/// One series of a chart payload.
///
/// Only the fields relevant to the requested chart type are set; unset
/// fields are omitted from the JSON.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    /// The display name of the series.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// The data points, aligned with the payload's labels.
    pub data: Vec<f64>,
    /// The fill color(s) of the series.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Paint>,
    /// The line color of the series.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    /// Whether the area under the line is filled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    /// The line smoothing factor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tension: Option<f64>,
    /// The dash pattern of the line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_dash: Option<[u8; 2]>,
    /// An explicit series type for mixed charts.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// A chart payload: ordered labels and the datasets drawn against them.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    /// The x-axis labels (or slice labels for pie charts).
    pub labels: Vec<String>,
    /// The series to draw.
    pub datasets: Vec<Dataset>,
}

/// Build the chart payload of the given shape for a filtered set of
/// transactions.
///
/// Empty input produces an empty payload; no chart type can make this
/// function error.
pub fn chart_data(transactions: &[Transaction], chart_type: ChartType) -> ChartData {
    if transactions.is_empty() {
        return ChartData::default();
    }

    match chart_type {
        ChartType::Pie => pie_chart(transactions),
        ChartType::Bar => date_series_chart(transactions, SeriesStyle::Bar),
        ChartType::Line | ChartType::Area => date_series_chart(transactions, SeriesStyle::Area),
        ChartType::Trend => trend_chart(transactions),
        ChartType::Comparison => comparison_chart(transactions),
    }
}

/// The color assigned to the series at `index`.
fn series_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// Format a date as an x-axis label.
fn date_label(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Per-category totals per date: the distinct dates ascending, and each
/// category's totals aligned to them (zero where absent).
fn date_category_series(transactions: &[Transaction]) -> (Vec<Date>, Vec<(String, Vec<f64>)>) {
    let by_category: BTreeMap<String, BTreeMap<Date, f64>> =
        nest(group_totals(transactions, |t| {
            (t.category.clone(), t.date)
        }));

    let dates: Vec<Date> = {
        let mut dates: Vec<Date> = transactions.iter().map(|t| t.date).collect();
        dates.sort();
        dates.dedup();
        dates
    };

    let series = by_category
        .into_iter()
        .map(|(category, totals)| {
            let data = dates
                .iter()
                .map(|date| totals.get(date).copied().unwrap_or(0.0))
                .collect();

            (category, data)
        })
        .collect();

    (dates, series)
}

fn pie_chart(transactions: &[Transaction]) -> ChartData {
    let totals = group_totals(transactions, |t| t.category.clone());

    let (labels, data) = totals.into_iter().unzip();

    ChartData {
        labels,
        datasets: vec![Dataset {
            data,
            background_color: Some(Paint::PerSlice(
                PALETTE.iter().map(|color| color.to_string()).collect(),
            )),
            ..Default::default()
        }],
    }
}

enum SeriesStyle {
    Bar,
    Area,
}

fn date_series_chart(transactions: &[Transaction], style: SeriesStyle) -> ChartData {
    let (dates, series) = date_category_series(transactions);

    let datasets = series
        .into_iter()
        .enumerate()
        .map(|(index, (category, data))| {
            let color = series_color(index);

            match style {
                SeriesStyle::Bar => Dataset {
                    label: Some(category),
                    data,
                    background_color: Some(Paint::Solid(color.to_string())),
                    ..Default::default()
                },
                SeriesStyle::Area => Dataset {
                    label: Some(category),
                    data,
                    border_color: Some(color.to_string()),
                    background_color: Some(Paint::Solid(format!("{color}40"))),
                    fill: Some(true),
                    tension: Some(0.4),
                    ..Default::default()
                },
            }
        })
        .collect();

    ChartData {
        labels: dates.into_iter().map(date_label).collect(),
        datasets,
    }
}

/// The trailing simple moving average of `data` over up to `window` points,
/// inclusive of the current point.
fn trailing_average(data: &[f64], window: usize) -> Vec<f64> {
    (0..data.len())
        .map(|index| {
            let start = index.saturating_sub(window - 1);
            let slice = &data[start..=index];

            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

fn trend_chart(transactions: &[Transaction]) -> ChartData {
    let (dates, series) = date_category_series(transactions);

    let mut datasets = Vec::with_capacity(series.len() * 2);

    for (index, (category, data)) in series.into_iter().enumerate() {
        let color = series_color(index);
        let moving_average = trailing_average(&data, TREND_WINDOW);

        datasets.push(Dataset {
            label: Some(format!("{category} (Actual)")),
            data,
            border_color: Some(color.to_string()),
            background_color: Some(Paint::Solid(format!("{color}40"))),
            kind: Some("line".to_string()),
            ..Default::default()
        });

        datasets.push(Dataset {
            label: Some(format!("{category} (Trend)")),
            data: moving_average,
            border_color: Some(color.to_string()),
            background_color: Some(Paint::Solid(format!("{color}20"))),
            kind: Some("line".to_string()),
            border_dash: Some([5, 5]),
            ..Default::default()
        });
    }

    ChartData {
        labels: dates.into_iter().map(date_label).collect(),
        datasets,
    }
}

fn comparison_chart(transactions: &[Transaction]) -> ChartData {
    let by_month = monthly_category_totals(transactions);

    let months: Vec<Date> = by_month.keys().copied().collect();

    let categories: std::collections::BTreeSet<String> = by_month
        .values()
        .flat_map(|totals| totals.keys().cloned())
        .collect();

    let datasets = categories
        .into_iter()
        .enumerate()
        .map(|(index, category)| {
            let data = months
                .iter()
                .map(|month| {
                    by_month
                        .get(month)
                        .and_then(|totals| totals.get(&category))
                        .copied()
                        .unwrap_or(0.0)
                })
                .collect();

            Dataset {
                label: Some(category),
                data,
                background_color: Some(Paint::Solid(series_color(index).to_string())),
                ..Default::default()
            }
        })
        .collect();

    ChartData {
        labels: months.into_iter().map(month_key).collect(),
        datasets,
    }
}

#[cfg(test)]
mod tests {
    use time::{Date, macros::date};

    use crate::{transaction::Transaction, user::UserID};

    use super::{ChartData, ChartType, Paint, chart_data, trailing_average};

    fn create_test_transaction(date: Date, category: &str, amount: f64) -> Transaction {
        Transaction {
            id: 0,
            user_id: UserID::new(1),
            date,
            category: category.to_owned(),
            amount,
            description: None,
            import_id: None,
        }
    }

    fn two_month_scenario() -> Vec<Transaction> {
        vec![
            create_test_transaction(date!(2024 - 01 - 05), "Income", 1000.0),
            create_test_transaction(date!(2024 - 01 - 10), "Rent", 600.0),
            create_test_transaction(date!(2024 - 02 - 01), "Income", 1000.0),
            create_test_transaction(date!(2024 - 02 - 05), "Rent", 650.0),
        ]
    }

    #[test]
    fn parse_falls_back_to_area_for_unknown_types() {
        assert_eq!(ChartType::parse("pie"), ChartType::Pie);
        assert_eq!(ChartType::parse("comparison"), ChartType::Comparison);
        assert_eq!(ChartType::parse("scatter"), ChartType::Area);
        assert_eq!(ChartType::parse(""), ChartType::Area);
    }

    #[test]
    fn chart_data_handles_empty_input() {
        assert_eq!(chart_data(&[], ChartType::Pie), ChartData::default());
    }

    #[test]
    fn pie_chart_sums_each_category() {
        let got = chart_data(&two_month_scenario(), ChartType::Pie);

        assert_eq!(got.labels, vec!["Income", "Rent"]);
        assert_eq!(got.datasets.len(), 1);
        assert_eq!(got.datasets[0].data, vec![2000.0, 1250.0]);
        assert!(matches!(
            got.datasets[0].background_color,
            Some(Paint::PerSlice(_))
        ));
    }

    #[test]
    fn bar_chart_zero_fills_missing_dates() {
        let got = chart_data(&two_month_scenario(), ChartType::Bar);

        assert_eq!(
            got.labels,
            vec!["2024-01-05", "2024-01-10", "2024-02-01", "2024-02-05"]
        );

        let income = got
            .datasets
            .iter()
            .find(|dataset| dataset.label.as_deref() == Some("Income"))
            .unwrap();
        assert_eq!(income.data, vec![1000.0, 0.0, 1000.0, 0.0]);

        let rent = got
            .datasets
            .iter()
            .find(|dataset| dataset.label.as_deref() == Some("Rent"))
            .unwrap();
        assert_eq!(rent.data, vec![0.0, 600.0, 0.0, 650.0]);
    }

    #[test]
    fn area_chart_carries_fill_styling() {
        let got = chart_data(&two_month_scenario(), ChartType::Area);

        for dataset in &got.datasets {
            assert_eq!(dataset.fill, Some(true));
            assert_eq!(dataset.tension, Some(0.4));
            assert!(dataset.border_color.is_some());
        }
    }

    #[test]
    fn line_chart_is_an_alias_for_area() {
        let transactions = two_month_scenario();

        assert_eq!(
            chart_data(&transactions, ChartType::Line),
            chart_data(&transactions, ChartType::Area)
        );
    }

    #[test]
    fn trailing_average_uses_an_inclusive_window() {
        let got = trailing_average(&[10.0, 20.0, 30.0, 40.0], 7);

        assert_eq!(got, vec![10.0, 15.0, 20.0, 25.0]);
    }

    #[test]
    fn trailing_average_window_is_bounded() {
        let data: Vec<f64> = (1..=10).map(|i| i as f64).collect();

        let got = trailing_average(&data, 7);

        // Index 9 averages points 4..=10.
        assert!((got[9] - 7.0).abs() < 1e-9);
    }

    #[test]
    fn trend_chart_has_an_actual_and_a_trend_series_per_category() {
        let got = chart_data(&two_month_scenario(), ChartType::Trend);

        let labels: Vec<Option<&str>> = got
            .datasets
            .iter()
            .map(|dataset| dataset.label.as_deref())
            .collect();

        assert_eq!(
            labels,
            vec![
                Some("Income (Actual)"),
                Some("Income (Trend)"),
                Some("Rent (Actual)"),
                Some("Rent (Trend)")
            ]
        );

        let rent_trend = &got.datasets[3];
        assert_eq!(rent_trend.border_dash, Some([5, 5]));
        // Rent per date is [0, 600, 0, 650]; its trailing average ends at
        // (0 + 600 + 0 + 650) / 4.
        assert_eq!(rent_trend.data, vec![0.0, 300.0, 200.0, 312.5]);
    }

    #[test]
    fn comparison_chart_groups_by_month() {
        let got = chart_data(&two_month_scenario(), ChartType::Comparison);

        assert_eq!(got.labels, vec!["2024-01", "2024-02"]);

        let rent = got
            .datasets
            .iter()
            .find(|dataset| dataset.label.as_deref() == Some("Rent"))
            .unwrap();
        assert_eq!(rent.data, vec![600.0, 650.0]);
    }

    #[test]
    fn unknown_chart_type_matches_the_area_shape() {
        let transactions = two_month_scenario();

        assert_eq!(
            chart_data(&transactions, ChartType::parse("scatter")),
            chart_data(&transactions, ChartType::Area)
        );
    }

    #[test]
    fn colors_are_stable_within_a_response() {
        let transactions = two_month_scenario();

        let first = chart_data(&transactions, ChartType::Bar);
        let second = chart_data(&transactions, ChartType::Bar);

        assert_eq!(first, second);
    }
}
