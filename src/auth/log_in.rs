//! Handler for log-in requests.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use jsonwebtoken::EncodingKey;
use rusqlite::Connection;
use serde::Deserialize;

use crate::{AppState, Error, user::get_user_by_email};

use super::token::{TokenResponse, encode_jwt};

/// The state needed to log in a user.
#[derive(Clone)]
pub struct LogInState {
    /// The database connection for looking up users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The key used to sign bearer tokens.
    pub encoding_key: EncodingKey,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            encoding_key: state.encoding_key.clone(),
        }
    }
}

/// The email/password pair sent by a client to log in or register.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// The email entered by the user.
    pub email: String,
    /// The password entered by the user.
    pub password: String,
}

/// Route handler for log-in requests.
///
/// # Errors
/// This function will return an [Error::InvalidCredentials] (401) when the
/// email does not belong to a registered user or the password is wrong. The
/// two cases are indistinguishable to the client on purpose.
pub async fn log_in(
    State(state): State<LogInState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<TokenResponse>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_email(&credentials.email, &connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidCredentials,
        error => error,
    })?;

    drop(connection);

    let password_is_correct = user
        .password_hash
        .verify(&credentials.password)
        .map_err(|error| {
            tracing::error!("error verifying password: {error}");
            Error::HashingError(error.to_string())
        })?;

    if !password_is_correct {
        return Err(Error::InvalidCredentials);
    }

    let token = encode_jwt(user.id, &user.email, &state.encoding_key)?;

    Ok(Json(TokenResponse::bearer(token)))
}

#[cfg(test)]
mod tests {
    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{
        AppState,
        auth::{TokenResponse, log_in},
        db::initialize,
        password::PasswordHash,
        provider::{ProviderClient, ProviderConfig},
        user::insert_user,
    };

    fn get_test_app_state() -> AppState {
        let connection =
            Connection::open_in_memory().expect("Could not open database in memory.");
        initialize(&connection).expect("Could not initialize database.");

        AppState::new(
            connection,
            "foobar",
            ProviderClient::new(ProviderConfig::default()).unwrap(),
        )
    }

    fn get_test_server(state: AppState) -> TestServer {
        let app = Router::new()
            .route("/api/auth/login", post(log_in))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    fn insert_test_user(state: &AppState) {
        // Cost 4 keeps the test fast.
        let password_hash = PasswordHash::from_raw_password("averysafeandsecurepassword", 4)
            .expect("Could not hash password.");

        insert_user(
            "foo@bar.baz",
            password_hash,
            &state.db_connection.lock().unwrap(),
        )
        .expect("Could not insert test user.");
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let state = get_test_app_state();
        insert_test_user(&state);
        let server = get_test_server(state);

        let response = server
            .post("/api/auth/login")
            .content_type("application/json")
            .json(&json!({
                "email": "foo@bar.baz",
                "password": "averysafeandsecurepassword",
            }))
            .await;

        response.assert_status_ok();

        let body = response.json::<TokenResponse>();
        assert_eq!(body.token_type, "bearer");
        assert!(!body.access_token.is_empty());
    }

    #[tokio::test]
    async fn log_in_fails_with_wrong_password() {
        let state = get_test_app_state();
        insert_test_user(&state);
        let server = get_test_server(state);

        server
            .post("/api/auth/login")
            .content_type("application/json")
            .json(&json!({
                "email": "foo@bar.baz",
                "password": "definitelyNotTheCorrectPassword",
            }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_email() {
        let state = get_test_app_state();
        let server = get_test_server(state);

        server
            .post("/api/auth/login")
            .content_type("application/json")
            .json(&json!({
                "email": "nobody@example.com",
                "password": "averysafeandsecurepassword",
            }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
