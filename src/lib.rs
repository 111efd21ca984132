//! Fintrack is a web backend for tracking personal finances.
//!
//! It stores financial transactions per user, authenticates users with
//! bearer tokens, imports transactions from CSV statements and an external
//! account-aggregation provider, and serves aggregate analytics (totals,
//! monthly breakdowns, percentage changes, trends and chart-ready series)
//! over a JSON REST API.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

pub mod analytics;
mod app_state;
pub mod auth;
pub mod csv_import;
mod db;
mod endpoints;
mod password;
pub mod provider;
mod routing;
pub mod transaction;
mod user;

pub use app_state::AppState;
pub use db::{DatabaseID, initialize};
pub use password::{PasswordHash, ValidatedPassword};
pub use routing::build_router;
pub use user::{User, UserID};

/// An async task that waits for either the ctrl+c or terminate signal,
/// whichever comes first, and then signals the server to shut down
/// gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an email/password pair that does not match a
    /// registered user.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The bearer token was missing, malformed, expired or signed with the
    /// wrong key.
    #[error("invalid token")]
    InvalidToken,

    /// Signing a new bearer token failed.
    ///
    /// The underlying error should only be logged on the server.
    #[error("could not create token")]
    TokenCreation,

    /// The email used to register already belongs to a user.
    #[error("the email is already registered")]
    DuplicateEmail,

    /// The string used to register is not a valid email address.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A date string at the API boundary could not be parsed as `YYYY-MM-DD`.
    #[error("could not parse \"{0}\" as a date in the format YYYY-MM-DD")]
    InvalidDate(String),

    /// A transaction was given a negative amount.
    ///
    /// Amounts are stored as absolute values; whether a transaction is
    /// income or an expense is decided by its category.
    #[error("{0} is a negative amount, amounts must be zero or greater")]
    NegativeAmount(f64),

    /// The CSV had issues that prevented it from being parsed.
    #[error("could not parse the CSV file: {0}")]
    InvalidCSV(String),

    /// The multipart form did not contain a CSV file.
    #[error("file is not a CSV")]
    NotCSV,

    /// The multipart form could not be parsed as a list of CSV files.
    #[error("could not parse multipart form: {0}")]
    MultipartError(String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the
    /// parameters (e.g., ID) are correct and that the resource has been
    /// created. Internally, this error may occur when a query returns no
    /// rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The import ID already exists in the database.
    ///
    /// Import IDs uniquely identify transactions fetched from the
    /// aggregation provider so that replaying a sync page does not insert
    /// the same transaction twice.
    #[error("the import ID already exists in the database")]
    DuplicateImportId,

    /// A token exchange request was made without a public token.
    #[error("public_token required")]
    MissingPublicToken,

    /// A sync was requested before the user linked an account with the
    /// aggregation provider.
    #[error("no access token configured")]
    MissingAccessToken,

    /// A request to the account-aggregation provider failed.
    #[error("aggregation provider request failed: {0}")]
    Provider(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("transaction.import_id") =>
            {
                Error::DuplicateImportId
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Provider(value.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self {
            Error::InvalidCredentials | Error::InvalidToken => StatusCode::UNAUTHORIZED,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::DuplicateEmail
            | Error::InvalidEmail(_)
            | Error::TooWeak(_)
            | Error::InvalidDate(_)
            | Error::NegativeAmount(_)
            | Error::InvalidCSV(_)
            | Error::NotCSV
            | Error::MultipartError(_)
            | Error::MissingPublicToken
            | Error::MissingAccessToken => StatusCode::BAD_REQUEST,
            Error::Provider(_) => StatusCode::BAD_GATEWAY,
            // Any errors not handled above are not meant for the client.
            ref error => {
                tracing::error!("An unexpected error occurred: {}", error);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "an internal error occurred" })),
                )
                    .into_response();
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
