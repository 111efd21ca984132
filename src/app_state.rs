//! Implements the struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use jsonwebtoken::{DecodingKey, EncodingKey};
use rusqlite::Connection;

use crate::provider::ProviderClient;

/// The state of the REST server.
///
/// Route handlers extract the slices of this state they need via sub-state
/// structs implementing `FromRef<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// The database connection shared by all handlers.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The key used to sign bearer tokens.
    pub encoding_key: EncodingKey,
    /// The key used to verify bearer tokens.
    pub decoding_key: DecodingKey,
    /// The client for the external account-aggregation provider.
    pub provider: ProviderClient,
}

impl AppState {
    /// Create a new [AppState].
    ///
    /// `jwt_secret` is the symmetric secret used to sign and verify bearer
    /// tokens.
    pub fn new(db_connection: Connection, jwt_secret: &str, provider: ProviderClient) -> Self {
        Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            encoding_key: EncodingKey::from_secret(jwt_secret.as_ref()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_ref()),
            provider,
        }
    }
}
