//! The aggregation engine.
//!
//! Pure, stateless transformations over a filtered list of transactions
//! that produce summary statistics and time-bucketed series for
//! visualization. Every operation here is deterministic, never performs
//! I/O, and degrades to a zero or empty result on empty input instead of
//! erroring, so independent request handlers can call them concurrently
//! without coordination.

mod aggregation;
mod charts;
mod endpoints;

pub use aggregation::{
    Metrics, MonthlyStat, Trend, TrendDirection, daily_averages, is_income_category, key_metrics,
    monthly_stats, percentage_changes, trend_analysis,
};
pub use charts::{ChartData, ChartType, Dataset, Paint, chart_data};
pub use endpoints::{
    AnalyticsState, ChartParams, get_chart_data_endpoint, get_daily_averages_endpoint,
    get_metrics_endpoint, get_monthly_stats_endpoint, get_percentage_changes_endpoint,
    get_trends_endpoint,
};
