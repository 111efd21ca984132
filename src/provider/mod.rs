//! Integration with the external account-aggregation provider.
//!
//! The provider is a black box reachable over HTTP: users link an external
//! bank account via a short-lived link token, the resulting public token is
//! exchanged for a long-lived access token stored on the user, and
//! transactions are then pulled with a cursor-paged sync call. Each sync
//! page is upserted idempotently (see
//! [crate::transaction::import_transactions]), so a crashed or repeated sync
//! never double-counts.

mod client;
mod endpoints;
mod sync;

pub use client::{
    ExchangeResponse, LinkTokenResponse, PersonalFinanceCategory, ProviderClient, ProviderConfig,
    ProviderTransaction, SyncPage,
};
pub use endpoints::{
    ExchangeRequest, ExchangeResult, ProviderState, create_link_token_endpoint,
    exchange_public_token_endpoint, sync_endpoint,
};
pub use sync::sync_provider_transactions;
