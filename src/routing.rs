//! Application router configuration.
//!
//! Routes that need authentication take a [Claims](crate::auth::Claims)
//! argument, which rejects requests without a valid bearer token before the
//! handler body runs; there is no separate auth middleware layer.

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::{
    AppState,
    analytics::{
        get_chart_data_endpoint, get_daily_averages_endpoint, get_metrics_endpoint,
        get_monthly_stats_endpoint, get_percentage_changes_endpoint, get_trends_endpoint,
    },
    auth::{log_in, register},
    csv_import::import_csv_endpoint,
    endpoints,
    provider::{create_link_token_endpoint, exchange_public_token_endpoint, sync_endpoint},
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_categories_endpoint,
        get_transaction_endpoint, get_transactions_endpoint, update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::HEALTH, get(get_health))
        .route(endpoints::REGISTER, post(register))
        .route(endpoints::LOG_IN, post(log_in))
        .route(
            endpoints::TRANSACTIONS,
            get(get_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .put(update_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        )
        .route(endpoints::CATEGORIES, get(get_categories_endpoint))
        .route(endpoints::IMPORT_CSV, post(import_csv_endpoint))
        .route(
            endpoints::PROVIDER_LINK_TOKEN,
            post(create_link_token_endpoint),
        )
        .route(
            endpoints::PROVIDER_EXCHANGE,
            post(exchange_public_token_endpoint),
        )
        .route(endpoints::PROVIDER_SYNC, post(sync_endpoint))
        .route(endpoints::ANALYTICS_METRICS, get(get_metrics_endpoint))
        .route(
            endpoints::ANALYTICS_MONTHLY_STATS,
            get(get_monthly_stats_endpoint),
        )
        .route(
            endpoints::ANALYTICS_DAILY_AVERAGES,
            get(get_daily_averages_endpoint),
        )
        .route(
            endpoints::ANALYTICS_PERCENTAGE_CHANGES,
            get(get_percentage_changes_endpoint),
        )
        .route(endpoints::ANALYTICS_TRENDS, get(get_trends_endpoint))
        .route(endpoints::ANALYTICS_CHART_DATA, get(get_chart_data_endpoint))
        .with_state(state)
}

/// The unauthenticated health check.
async fn get_health() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use axum::http::StatusCode;
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{
        AppState,
        analytics::Metrics,
        auth::TokenResponse,
        build_router,
        db::initialize,
        provider::{ProviderClient, ProviderConfig},
    };

    fn get_test_server() -> TestServer {
        let connection =
            Connection::open_in_memory().expect("Could not open database in memory.");
        initialize(&connection).expect("Could not initialize database.");

        let state = AppState::new(
            connection,
            "foobar",
            ProviderClient::new(ProviderConfig::default()).unwrap(),
        );

        TestServer::try_new(build_router(state)).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn health_check_needs_no_token() {
        let server = get_test_server();

        let response = server.get("/health").await;

        response.assert_status_ok();
        response.assert_json(&json!({ "status": "OK" }));
    }

    #[tokio::test]
    async fn register_create_and_aggregate_flow() {
        let server = get_test_server();

        let token = server
            .post("/api/auth/register")
            .json(&json!({
                "email": "foo@bar.baz",
                "password": "averysafeandsecurepassword",
            }))
            .await
            .json::<TokenResponse>()
            .access_token;

        for (date, category, amount) in [
            ("2024-01-05", "Income", 1000.0),
            ("2024-01-10", "Rent", 600.0),
            ("2024-02-01", "Income", 1000.0),
            ("2024-02-05", "Rent", 650.0),
        ] {
            server
                .post("/api/transactions")
                .authorization_bearer(&token)
                .json(&json!({"date": date, "category": category, "amount": amount}))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let metrics = server
            .get("/api/analytics/metrics")
            .authorization_bearer(&token)
            .await
            .json::<Metrics>();

        assert_eq!(metrics.total_income, 2000.0);
        assert_eq!(metrics.total_expenses, 1250.0);
        assert_eq!(metrics.net_balance, 750.0);
    }

    #[tokio::test]
    async fn provider_sync_without_a_linked_account_is_a_client_error() {
        let server = get_test_server();

        let token = server
            .post("/api/auth/register")
            .json(&json!({
                "email": "foo@bar.baz",
                "password": "averysafeandsecurepassword",
            }))
            .await
            .json::<TokenResponse>()
            .access_token;

        server
            .post("/api/provider/sync")
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn provider_exchange_requires_a_public_token() {
        let server = get_test_server();

        let token = server
            .post("/api/auth/register")
            .json(&json!({
                "email": "foo@bar.baz",
                "password": "averysafeandsecurepassword",
            }))
            .await
            .json::<TokenResponse>()
            .access_token;

        server
            .post("/api/provider/exchange")
            .authorization_bearer(&token)
            .json(&json!({}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
