//! Importing transactions from uploaded CSV statements.

mod csv;
mod endpoint;

pub use csv::parse_transactions_csv;
pub use endpoint::{ImportState, import_csv_endpoint};

use serde::{Deserialize, Serialize};

/// The response body reporting how many transactions an import inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// The number of transactions actually inserted.
    pub imported: usize,
}
