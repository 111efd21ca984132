//! Handler for registering new users.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use email_address::EmailAddress;
use jsonwebtoken::EncodingKey;
use rusqlite::Connection;

use crate::{AppState, Error, password::PasswordHash, user::insert_user};

use super::{
    log_in::Credentials,
    token::{TokenResponse, encode_jwt},
};

/// The state needed to register a user.
#[derive(Clone)]
pub struct RegisterState {
    /// The database connection for creating users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The key used to sign bearer tokens.
    pub encoding_key: EncodingKey,
}

impl FromRef<AppState> for RegisterState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            encoding_key: state.encoding_key.clone(),
        }
    }
}

/// Route handler for registering a new user.
///
/// Responds with a bearer token so the client does not need a separate
/// log-in round trip after registering.
///
/// # Errors
/// This function will return an error (400) when the email is invalid or
/// already registered, or when the password is too easy to guess.
pub async fn register(
    State(state): State<RegisterState>,
    Json(credentials): Json<Credentials>,
) -> Result<(StatusCode, Json<TokenResponse>), Error> {
    if credentials.email.parse::<EmailAddress>().is_err() {
        return Err(Error::InvalidEmail(credentials.email));
    }

    let password_hash =
        PasswordHash::from_raw_password(&credentials.password, PasswordHash::DEFAULT_COST)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let user = insert_user(&credentials.email, password_hash, &connection)?;

    drop(connection);

    let token = encode_jwt(user.id, &user.email, &state.encoding_key)?;

    Ok((StatusCode::CREATED, Json(TokenResponse::bearer(token))))
}
