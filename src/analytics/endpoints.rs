//! Route handlers exposing the aggregation engine.
//!
//! Each handler parses the shared filter parameters, fetches the filtered
//! transaction set and hands it to the corresponding pure engine function.
//! Malformed filter input is rejected here, before the engine runs; the
//! engine itself never errors.

use std::{collections::BTreeMap, sync::{Arc, Mutex}};

use axum::{
    Json,
    extract::{FromRef, Query, State},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::Claims,
    transaction::{FilterParams, Transaction, TransactionFilter, get_transactions},
    user::UserID,
};

use super::{
    aggregation::{
        Metrics, MonthlyStat, Trend, daily_averages, key_metrics, monthly_stats,
        percentage_changes, trend_analysis,
    },
    charts::{ChartData, ChartType, chart_data},
};

/// The state needed to serve analytics.
#[derive(Clone)]
pub struct AnalyticsState {
    /// The database connection for fetching the filtered transaction set.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AnalyticsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

impl AnalyticsState {
    /// Parse the filter parameters and fetch the matching transactions.
    fn fetch_filtered(
        &self,
        user_id: UserID,
        params: FilterParams,
    ) -> Result<(Vec<Transaction>, TransactionFilter), Error> {
        let filter = params.into_filter(user_id)?;

        let connection = self.db_connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })?;

        let transactions = get_transactions(&filter, None, &connection)?;

        Ok((transactions, filter))
    }
}

/// Route handler for the key financial metrics.
///
/// # Errors
/// Returns an [Error::InvalidDate] (400) for malformed date strings.
pub async fn get_metrics_endpoint(
    State(state): State<AnalyticsState>,
    claims: Claims,
    Query(params): Query<FilterParams>,
) -> Result<Json<Metrics>, Error> {
    let (transactions, filter) = state.fetch_filtered(claims.user_id, params)?;

    Ok(Json(key_metrics(
        &transactions,
        filter.explicit_range().as_ref(),
    )))
}

/// Route handler for per-month income/expense statistics.
///
/// # Errors
/// Returns an [Error::InvalidDate] (400) for malformed date strings.
pub async fn get_monthly_stats_endpoint(
    State(state): State<AnalyticsState>,
    claims: Claims,
    Query(params): Query<FilterParams>,
) -> Result<Json<Vec<MonthlyStat>>, Error> {
    let (transactions, _) = state.fetch_filtered(claims.user_id, params)?;

    Ok(Json(monthly_stats(&transactions)))
}

/// Route handler for per-category daily averages.
///
/// # Errors
/// Returns an [Error::InvalidDate] (400) for malformed date strings.
pub async fn get_daily_averages_endpoint(
    State(state): State<AnalyticsState>,
    claims: Claims,
    Query(params): Query<FilterParams>,
) -> Result<Json<BTreeMap<String, f64>>, Error> {
    let (transactions, _) = state.fetch_filtered(claims.user_id, params)?;

    Ok(Json(daily_averages(&transactions)))
}

/// Route handler for month-over-month percentage changes per category.
///
/// # Errors
/// Returns an [Error::InvalidDate] (400) for malformed date strings.
pub async fn get_percentage_changes_endpoint(
    State(state): State<AnalyticsState>,
    claims: Claims,
    Query(params): Query<FilterParams>,
) -> Result<Json<BTreeMap<String, f64>>, Error> {
    let (transactions, _) = state.fetch_filtered(claims.user_id, params)?;

    Ok(Json(percentage_changes(&transactions)))
}

/// Route handler for per-category trend classifications.
///
/// # Errors
/// Returns an [Error::InvalidDate] (400) for malformed date strings.
pub async fn get_trends_endpoint(
    State(state): State<AnalyticsState>,
    claims: Claims,
    Query(params): Query<FilterParams>,
) -> Result<Json<BTreeMap<String, Trend>>, Error> {
    let (transactions, _) = state.fetch_filtered(claims.user_id, params)?;

    Ok(Json(trend_analysis(&transactions)))
}

/// The query parameters for the chart-data endpoint: the shared filter
/// parameters plus the chart type.
#[derive(Debug, Default, Deserialize)]
pub struct ChartParams {
    /// The shared filter parameters.
    #[serde(flatten)]
    pub filter: FilterParams,
    /// One of `pie`, `bar`, `line`, `area`, `trend` or `comparison`.
    /// Unknown or missing values fall back to the area shape.
    pub chart_type: Option<String>,
}

/// Route handler for chart-ready series.
///
/// # Errors
/// Returns an [Error::InvalidDate] (400) for malformed date strings. An
/// unknown chart type is not an error.
pub async fn get_chart_data_endpoint(
    State(state): State<AnalyticsState>,
    claims: Claims,
    Query(params): Query<ChartParams>,
) -> Result<Json<ChartData>, Error> {
    let chart_type = ChartType::parse(params.chart_type.as_deref().unwrap_or_default());

    let (transactions, _) = state.fetch_filtered(claims.user_id, params.filter)?;

    Ok(Json(chart_data(&transactions, chart_type)))
}
