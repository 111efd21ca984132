//! The filtering substrate shared by the transaction list endpoint and every
//! analytics endpoint.

use std::ops::RangeInclusive;

use rusqlite::{Connection, params_from_iter, types::Value};
use serde::Deserialize;
use time::Date;

use crate::{Error, user::UserID};

use super::{
    core::map_transaction_row,
    models::{Transaction, parse_date},
};

/// The order to sort transactions in a query.
pub enum SortOrder {
    /// Sort in order of increasing date.
    Ascending,
    /// Sort in order of decreasing date.
    Descending,
}

/// Defines which transactions to fetch from the database.
///
/// Each date bound is optional and inclusive; absence means unbounded on
/// that side. The category set is an inclusion filter. The user scope is
/// mandatory so one user can never read another user's transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionFilter {
    /// Only include transactions belonging to this user.
    pub user_id: UserID,
    /// Only include transactions on or after this date.
    pub start_date: Option<Date>,
    /// Only include transactions on or before this date.
    pub end_date: Option<Date>,
    /// Only include transactions whose category is in this set.
    pub categories: Option<Vec<String>>,
}

impl TransactionFilter {
    /// A filter that selects all of `user_id`'s transactions.
    pub fn for_user(user_id: UserID) -> Self {
        Self {
            user_id,
            start_date: None,
            end_date: None,
            categories: None,
        }
    }

    /// The explicitly requested date range, available only when the client
    /// supplied both bounds.
    ///
    /// [crate::analytics::key_metrics] computes its daily average over this
    /// range when present, and over the observed dates otherwise.
    pub fn explicit_range(&self) -> Option<RangeInclusive<Date>> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some(start..=end),
            _ => None,
        }
    }
}

/// The raw query-string parameters accepted by the transaction list and
/// analytics endpoints.
///
/// `categories` is a comma-separated list of category names.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FilterParams {
    /// The inclusive start of the date range as `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// The inclusive end of the date range as `YYYY-MM-DD`.
    pub end_date: Option<String>,
    /// Comma-separated category names to include.
    pub categories: Option<String>,
}

impl FilterParams {
    /// Parse the raw parameters into a [TransactionFilter] scoped to
    /// `user_id`.
    ///
    /// # Errors
    /// Returns an [Error::InvalidDate] that maps to a client input error if
    /// either date string is not a valid `YYYY-MM-DD` date.
    pub fn into_filter(self, user_id: UserID) -> Result<TransactionFilter, Error> {
        let start_date = self.start_date.as_deref().map(parse_date).transpose()?;
        let end_date = self.end_date.as_deref().map(parse_date).transpose()?;

        let categories = self.categories.map(|raw| {
            raw.split(',')
                .map(str::to_owned)
                .collect::<Vec<_>>()
        });

        Ok(TransactionFilter {
            user_id,
            start_date,
            end_date,
            categories,
        })
    }
}

/// Query for transactions matching `filter`.
///
/// `sort_date` of `None` returns transactions in the order they are stored.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_transactions(
    filter: &TransactionFilter,
    sort_date: Option<SortOrder>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let mut query_string_parts = vec![
        "SELECT id, user_id, date, category, amount, description, import_id FROM \"transaction\""
            .to_string(),
    ];
    let mut where_clause_parts = Vec::new();
    let mut query_parameters = Vec::new();

    query_parameters.push(Value::Integer(filter.user_id.as_i64()));
    where_clause_parts.push(format!("user_id = ?{}", query_parameters.len()));

    if let Some(start_date) = filter.start_date {
        query_parameters.push(Value::Text(start_date.to_string()));
        where_clause_parts.push(format!("date >= ?{}", query_parameters.len()));
    }

    if let Some(end_date) = filter.end_date {
        query_parameters.push(Value::Text(end_date.to_string()));
        where_clause_parts.push(format!("date <= ?{}", query_parameters.len()));
    }

    if let Some(ref categories) = filter.categories {
        let placeholders = categories
            .iter()
            .map(|category| {
                query_parameters.push(Value::Text(category.clone()));
                format!("?{}", query_parameters.len())
            })
            .collect::<Vec<_>>()
            .join(", ");

        where_clause_parts.push(format!("category IN ({placeholders})"));
    }

    query_string_parts.push(String::from("WHERE ") + &where_clause_parts.join(" AND "));

    match sort_date {
        Some(SortOrder::Ascending) => query_string_parts.push("ORDER BY date ASC".to_string()),
        Some(SortOrder::Descending) => query_string_parts.push("ORDER BY date DESC".to_string()),
        None => {}
    }

    let query_string = query_string_parts.join(" ");
    let params = params_from_iter(query_parameters.iter());

    connection
        .prepare(&query_string)?
        .query_map(params, map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
        .collect()
}
