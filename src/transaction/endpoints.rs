//! Route handlers for transaction CRUD.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{AppState, Error, auth::Claims, db::DatabaseID};

use super::{
    core::{
        create_transaction, delete_transaction, get_categories, get_transaction,
        update_transaction,
    },
    models::{NewTransaction, Transaction, TransactionUpdate},
    query::{FilterParams, SortOrder, get_transactions},
};

/// The state needed to manage transactions.
#[derive(Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

impl TransactionState {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, Error> {
        self.db_connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })
    }
}

/// Route handler for listing the caller's transactions, newest first.
///
/// Accepts the shared filter parameters: an inclusive date range and a
/// comma-separated category set.
///
/// # Errors
/// Returns an [Error::InvalidDate] (400) for malformed date strings.
pub async fn get_transactions_endpoint(
    State(state): State<TransactionState>,
    claims: Claims,
    Query(params): Query<FilterParams>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let filter = params.into_filter(claims.user_id)?;
    let connection = state.lock()?;

    let transactions = get_transactions(&filter, Some(SortOrder::Descending), &connection)?;

    Ok(Json(transactions))
}

/// Route handler for creating a new transaction owned by the caller.
///
/// # Errors
/// Returns an [Error::NegativeAmount] (400) when the amount is below zero.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    claims: Claims,
    Json(new_transaction): Json<NewTransaction>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    let builder = Transaction::build(
        claims.user_id,
        new_transaction.date,
        &new_transaction.category,
        new_transaction.amount,
    )
    .description(new_transaction.description);

    let connection = state.lock()?;
    let transaction = create_transaction(builder, &connection)?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

/// Route handler for fetching a single transaction by ID.
///
/// # Errors
/// Returns an [Error::NotFound] (404) when the transaction does not exist
/// or belongs to another user.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    claims: Claims,
    Path(transaction_id): Path<DatabaseID>,
) -> Result<Json<Transaction>, Error> {
    let connection = state.lock()?;
    let transaction = get_transaction(transaction_id, claims.user_id, &connection)?;

    Ok(Json(transaction))
}

/// Route handler for a partial, field-level update of a transaction.
///
/// # Errors
/// Returns an [Error::NotFound] (404) when the transaction does not exist
/// or belongs to another user, or an [Error::NegativeAmount] (400) when the
/// new amount is below zero.
pub async fn update_transaction_endpoint(
    State(state): State<TransactionState>,
    claims: Claims,
    Path(transaction_id): Path<DatabaseID>,
    Json(update): Json<TransactionUpdate>,
) -> Result<Json<Transaction>, Error> {
    let connection = state.lock()?;
    let transaction = update_transaction(transaction_id, claims.user_id, update, &connection)?;

    Ok(Json(transaction))
}

/// Route handler for deleting a transaction.
///
/// # Errors
/// Returns an [Error::NotFound] (404) when the transaction does not exist
/// or belongs to another user.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    claims: Claims,
    Path(transaction_id): Path<DatabaseID>,
) -> Result<StatusCode, Error> {
    let connection = state.lock()?;
    delete_transaction(transaction_id, claims.user_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}

/// The response body listing the caller's distinct categories.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoriesResponse {
    /// The distinct category names, sorted alphabetically.
    pub categories: Vec<String>,
}

/// Route handler for listing the distinct categories used by the caller.
pub async fn get_categories_endpoint(
    State(state): State<TransactionState>,
    claims: Claims,
) -> Result<Json<CategoriesResponse>, Error> {
    let connection = state.lock()?;
    let categories = get_categories(claims.user_id, &connection)?;

    Ok(Json(CategoriesResponse { categories }))
}
