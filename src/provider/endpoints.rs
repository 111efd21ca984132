//! Route handlers for linking and syncing external accounts.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::Claims,
    csv_import::ImportSummary,
    user::{get_user_by_id, set_provider_access_token},
};

use super::{
    client::{LinkTokenResponse, ProviderClient},
    sync::sync_provider_transactions,
};

/// The state needed to talk to the aggregation provider.
#[derive(Clone)]
pub struct ProviderState {
    /// The database connection for updating users and storing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The client for the aggregation provider.
    pub provider: ProviderClient,
}

impl FromRef<AppState> for ProviderState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            provider: state.provider.clone(),
        }
    }
}

/// Route handler for creating a link token to start the account-linking
/// flow.
///
/// # Errors
/// Returns an [Error::Provider] (502) when the provider request fails.
pub async fn create_link_token_endpoint(
    State(state): State<ProviderState>,
    claims: Claims,
) -> Result<Json<LinkTokenResponse>, Error> {
    let response = state.provider.create_link_token(claims.user_id).await?;

    Ok(Json(response))
}

/// The request body for exchanging a public token.
#[derive(Debug, Deserialize)]
pub struct ExchangeRequest {
    /// The public token produced by the client-side linking flow.
    #[serde(default)]
    pub public_token: Option<String>,
}

/// The response body for a successful token exchange.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExchangeResult {
    /// The provider's ID for the linked item.
    pub item_id: String,
}

/// Route handler for exchanging a public token for an access token.
///
/// The access token is stored on the user so later syncs can use it.
///
/// # Errors
/// This function will return an [Error::MissingPublicToken] (400) when the
/// body has no public token, or an [Error::Provider] (502) when the
/// exchange fails.
pub async fn exchange_public_token_endpoint(
    State(state): State<ProviderState>,
    claims: Claims,
    Json(request): Json<ExchangeRequest>,
) -> Result<Json<ExchangeResult>, Error> {
    let Some(public_token) = request.public_token else {
        return Err(Error::MissingPublicToken);
    };

    let response = state.provider.exchange_public_token(&public_token).await?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    set_provider_access_token(claims.user_id, &response.access_token, &connection)?;

    drop(connection);

    Ok(Json(ExchangeResult {
        item_id: response.item_id,
    }))
}

/// Route handler for pulling new transactions from the provider.
///
/// # Errors
/// This function will return an [Error::MissingAccessToken] (400) when the
/// user has not linked an account yet, or an [Error::Provider] (502) when a
/// sync request fails.
pub async fn sync_endpoint(
    State(state): State<ProviderState>,
    claims: Claims,
) -> Result<Json<ImportSummary>, Error> {
    let user = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;
        get_user_by_id(claims.user_id, &connection)?
    };

    let Some(access_token) = user.provider_access_token else {
        return Err(Error::MissingAccessToken);
    };

    let imported = sync_provider_transactions(
        &state.provider,
        &access_token,
        claims.user_id,
        &state.db_connection,
    )
    .await?;

    Ok(Json(ImportSummary { imported }))
}
