//! Route handler for importing transactions from uploaded CSV files.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Multipart, State, multipart::Field},
};
use rusqlite::Connection;

use crate::{AppState, Error, auth::Claims, transaction::import_transactions};

use super::{ImportSummary, csv::parse_transactions_csv};

/// The state needed for importing transactions.
#[derive(Clone)]
pub struct ImportState {
    /// The database connection for storing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ImportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Route handler for importing transactions from uploaded CSV files.
///
/// Accepts a multipart form where each field is one CSV file. All files are
/// parsed before anything is stored, so a bad file rejects the upload as a
/// whole.
///
/// # Errors
/// This function will return an error (400) when a field is not a CSV file
/// or a file is missing the required columns.
pub async fn import_csv_endpoint(
    State(state): State<ImportState>,
    claims: Claims,
    mut multipart: Multipart,
) -> Result<Json<ImportSummary>, Error> {
    let mut builders = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| Error::MultipartError(error.to_string()))?
    {
        let csv_data = parse_multipart_field(field).await?;
        builders.extend(parse_transactions_csv(&csv_data, claims.user_id)?);
    }

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let imported = import_transactions(builders, &connection)?;

    Ok(Json(ImportSummary {
        imported: imported.len(),
    }))
}

async fn parse_multipart_field(field: Field<'_>) -> Result<String, Error> {
    let is_csv = field
        .content_type()
        .map(|content_type| content_type == "text/csv")
        .unwrap_or(false)
        || field
            .file_name()
            .map(|file_name| file_name.to_lowercase().ends_with(".csv"))
            .unwrap_or(false);

    if !is_csv {
        return Err(Error::NotCSV);
    }

    field
        .text()
        .await
        .map_err(|error| Error::MultipartError(error.to_string()))
}
