//! The API endpoint URIs.

/// The unauthenticated health check.
pub const HEALTH: &str = "/health";
/// The route for registering a new user.
pub const REGISTER: &str = "/api/auth/register";
/// The route for logging in a user.
pub const LOG_IN: &str = "/api/auth/login";
/// The route to list and create transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route to list the caller's distinct categories.
pub const CATEGORIES: &str = "/api/categories";
/// The route to upload CSV files for importing transactions.
pub const IMPORT_CSV: &str = "/api/import/csv";
/// The route to create an account-linking token.
pub const PROVIDER_LINK_TOKEN: &str = "/api/provider/link-token";
/// The route to exchange a public token for an access token.
pub const PROVIDER_EXCHANGE: &str = "/api/provider/exchange";
/// The route to pull new transactions from the aggregation provider.
pub const PROVIDER_SYNC: &str = "/api/provider/sync";
/// The route for the key financial metrics.
pub const ANALYTICS_METRICS: &str = "/api/analytics/metrics";
/// The route for per-month income/expense statistics.
pub const ANALYTICS_MONTHLY_STATS: &str = "/api/analytics/monthly-stats";
/// The route for per-category daily averages.
pub const ANALYTICS_DAILY_AVERAGES: &str = "/api/analytics/daily-averages";
/// The route for month-over-month percentage changes.
pub const ANALYTICS_PERCENTAGE_CHANGES: &str = "/api/analytics/percentage-changes";
/// The route for per-category trend classifications.
pub const ANALYTICS_TRENDS: &str = "/api/analytics/trends";
/// The route for chart-ready series.
pub const ANALYTICS_CHART_DATA: &str = "/api/analytics/chart-data";
