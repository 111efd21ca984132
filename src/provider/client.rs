//! The HTTP client for the account-aggregation provider.

use std::{env, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{Error, user::UserID};

const USER_AGENT: &str = concat!("fintrack/", env!("CARGO_PKG_VERSION"));

/// Connection settings for the account-aggregation provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// The base URL of the provider's API, e.g. the sandbox or production
    /// host.
    pub base_url: String,
    /// The client ID issued by the provider.
    pub client_id: String,
    /// The secret issued by the provider.
    pub secret: String,
}

impl ProviderConfig {
    /// Read the provider settings from the environment variables
    /// `AGGREGATOR_URL`, `AGGREGATOR_CLIENT_ID` and `AGGREGATOR_SECRET`,
    /// falling back to the sandbox host and empty credentials.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            base_url: env::var("AGGREGATOR_URL").unwrap_or(defaults.base_url),
            client_id: env::var("AGGREGATOR_CLIENT_ID").unwrap_or_else(|_| {
                tracing::warn!("AGGREGATOR_CLIENT_ID is not set, account linking will fail");
                defaults.client_id
            }),
            secret: env::var("AGGREGATOR_SECRET").unwrap_or(defaults.secret),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sandbox.plaid.com".to_owned(),
            client_id: String::new(),
            secret: String::new(),
        }
    }
}

/// The response to a link-token request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkTokenResponse {
    /// The short-lived token the client uses to start the account-linking
    /// flow.
    pub link_token: String,
}

/// The response to a public-token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeResponse {
    /// The long-lived access token stored on the user.
    pub access_token: String,
    /// The provider's ID for the linked item.
    pub item_id: String,
}

/// One transaction as reported by the provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderTransaction {
    /// The provider's unique ID for this transaction, hashed into an import
    /// ID for idempotent upserts.
    pub transaction_id: String,
    /// The date of the transaction as `YYYY-MM-DD`.
    pub date: String,
    /// The signed amount reported by the provider. Stored as an absolute
    /// value; the category decides the income/expense split.
    pub amount: f64,
    /// The display name of the transaction.
    #[serde(default)]
    pub name: Option<String>,
    /// The provider's legacy category hierarchy, most general first.
    #[serde(default)]
    pub category: Option<Vec<String>>,
    /// The provider's newer category taxonomy, preferred when present.
    #[serde(default)]
    pub personal_finance_category: Option<PersonalFinanceCategory>,
}

/// The provider's newer category taxonomy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PersonalFinanceCategory {
    /// The most specific category label.
    pub detailed: String,
}

/// One page of the cursor-paged transaction sync.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SyncPage {
    /// Transactions added since the cursor.
    #[serde(default)]
    pub added: Vec<ProviderTransaction>,
    /// The cursor to pass to the next sync call.
    pub next_cursor: String,
    /// Whether another page is available.
    pub has_more: bool,
}

/// The HTTP client for the account-aggregation provider.
#[derive(Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl ProviderClient {
    /// Create a client for the provider described by `config`.
    ///
    /// # Errors
    /// Returns an [Error::Provider] if the underlying HTTP client could not
    /// be built.
    pub fn new(config: ProviderConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { http, config })
    }

    /// Request a short-lived link token for `user_id`.
    ///
    /// # Errors
    /// Returns an [Error::Provider] if the request fails or the provider
    /// responds with an error status.
    pub async fn create_link_token(&self, user_id: UserID) -> Result<LinkTokenResponse, Error> {
        let response = self
            .http
            .post(format!("{}/link/token/create", self.config.base_url))
            .json(&json!({
                "client_id": self.config.client_id,
                "secret": self.config.secret,
                "client_name": "Fintrack",
                "language": "en",
                "country_codes": ["US"],
                "products": ["transactions"],
                "user": { "client_user_id": user_id.to_string() },
            }))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// Exchange the public token produced by the linking flow for a
    /// long-lived access token.
    ///
    /// # Errors
    /// Returns an [Error::Provider] if the request fails or the provider
    /// responds with an error status.
    pub async fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> Result<ExchangeResponse, Error> {
        let response = self
            .http
            .post(format!(
                "{}/item/public_token/exchange",
                self.config.base_url
            ))
            .json(&json!({
                "client_id": self.config.client_id,
                "secret": self.config.secret,
                "public_token": public_token,
            }))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// Fetch one page of transactions added since `cursor`.
    ///
    /// An empty `cursor` starts the sync from the beginning.
    ///
    /// # Errors
    /// Returns an [Error::Provider] if the request fails or the provider
    /// responds with an error status.
    pub async fn sync_transactions(
        &self,
        access_token: &str,
        cursor: &str,
    ) -> Result<SyncPage, Error> {
        let response = self
            .http
            .post(format!("{}/transactions/sync", self.config.base_url))
            .json(&json!({
                "client_id": self.config.client_id,
                "secret": self.config.secret,
                "access_token": access_token,
                "cursor": cursor,
            }))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::SyncPage;

    #[test]
    fn deserialize_sync_page() {
        let body = r#"{
            "added": [
                {
                    "transaction_id": "txn-1",
                    "date": "2024-01-05",
                    "amount": -12.5,
                    "name": "Coffee",
                    "personal_finance_category": { "detailed": "FOOD_AND_DRINK_COFFEE" }
                },
                {
                    "transaction_id": "txn-2",
                    "date": "2024-01-06",
                    "amount": 1000.0,
                    "category": ["Transfer", "Deposit"]
                }
            ],
            "next_cursor": "cursor-2",
            "has_more": true
        }"#;

        let page: SyncPage = serde_json::from_str(body).unwrap();

        assert_eq!(page.added.len(), 2);
        assert_eq!(page.added[0].transaction_id, "txn-1");
        assert_eq!(
            page.added[0]
                .personal_finance_category
                .as_ref()
                .unwrap()
                .detailed,
            "FOOD_AND_DRINK_COFFEE"
        );
        assert_eq!(page.added[1].name, None);
        assert_eq!(page.next_cursor, "cursor-2");
        assert!(page.has_more);
    }

    #[test]
    fn deserialize_sync_page_with_no_added_transactions() {
        let body = r#"{"next_cursor": "", "has_more": false}"#;

        let page: SyncPage = serde_json::from_str(body).unwrap();

        assert!(page.added.is_empty());
        assert!(!page.has_more);
    }
}
