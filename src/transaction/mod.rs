//! Transactions and their persistence and HTTP endpoints.
//!
//! A transaction records a single dated, categorised amount of money for a
//! user. Amounts are stored as absolute values; the category decides whether
//! a transaction counts as income or an expense (see
//! [crate::analytics::is_income_category]).

mod core;
mod endpoints;
mod models;
mod query;

pub use core::{
    create_transaction, delete_transaction, get_categories, get_transaction, import_transactions,
    update_transaction,
};
pub use endpoints::{
    CategoriesResponse, TransactionState, create_transaction_endpoint,
    delete_transaction_endpoint, get_categories_endpoint, get_transaction_endpoint,
    get_transactions_endpoint, update_transaction_endpoint,
};
pub use models::{
    NewTransaction, Transaction, TransactionBuilder, TransactionUpdate, parse_date,
};
pub use query::{FilterParams, SortOrder, TransactionFilter, get_transactions};
