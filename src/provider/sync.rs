//! The cursor-paged sync loop against the aggregation provider.

use std::sync::Mutex;

use rusqlite::Connection;

use crate::{
    Error,
    transaction::{Transaction, TransactionBuilder, import_transactions, parse_date},
    user::UserID,
};

use super::client::{ProviderClient, ProviderTransaction};

/// The category used when the provider reports none.
const UNCATEGORIZED: &str = "Uncategorized";

/// Hash a provider transaction ID into a stable 64-bit import ID.
///
/// The database enforces a UNIQUE constraint on import IDs, which is what
/// makes replaying a sync page idempotent.
fn create_import_id(transaction_id: &str) -> i64 {
    let mut bytes = transaction_id.as_bytes().to_vec();

    while bytes.len() % 8 != 0 {
        bytes.push(0);
    }

    let mut hash: i64 = 0;

    for chunk in bytes.chunks_exact(8) {
        let mut chunk_bytes = [0u8; 8];
        chunk_bytes.copy_from_slice(chunk);

        hash ^= i64::from_le_bytes(chunk_bytes);
        hash = hash.wrapping_mul(0x5bd1e995);
        hash ^= hash >> 15;
        hash = hash.wrapping_mul(0x5bd1e995);
        hash ^= hash >> 13;
    }

    hash
}

/// Map a provider transaction onto a row for `user_id`, or `None` when the
/// provider data cannot be used.
///
/// The provider reports signed amounts; they are stored as absolute values
/// because the income/expense split is decided by the category. The newer
/// category taxonomy is preferred, then the first entry of the legacy
/// hierarchy, then [UNCATEGORIZED].
fn builder_from_provider(
    transaction: &ProviderTransaction,
    user_id: UserID,
) -> Option<TransactionBuilder> {
    let date = match parse_date(&transaction.date) {
        Ok(date) => date,
        Err(_) => {
            tracing::debug!(
                "skipping provider transaction {}: could not parse date {:?}",
                transaction.transaction_id,
                transaction.date
            );
            return None;
        }
    };

    let category = transaction
        .personal_finance_category
        .as_ref()
        .map(|category| category.detailed.clone())
        .or_else(|| {
            transaction
                .category
                .as_ref()
                .and_then(|hierarchy| hierarchy.first().cloned())
        })
        .unwrap_or_else(|| UNCATEGORIZED.to_owned());

    Some(
        Transaction::build(user_id, date, &category, transaction.amount.abs())
            .description(transaction.name.clone())
            .import_id(Some(create_import_id(&transaction.transaction_id))),
    )
}

/// Pull all new transactions for `user_id` from the provider and store
/// them.
///
/// Pages through the provider's sync cursor until it reports no more data,
/// upserting each page before fetching the next so a crash mid-sync loses
/// at most the unfetched pages. Returns the number of transactions actually
/// inserted; replayed pages contribute nothing because their import IDs
/// already exist.
///
/// # Errors
/// This function will return an [Error::Provider] if a sync request fails,
/// or an [Error::SqlError] if storing a page fails.
pub async fn sync_provider_transactions(
    client: &ProviderClient,
    access_token: &str,
    user_id: UserID,
    db_connection: &Mutex<Connection>,
) -> Result<usize, Error> {
    let mut cursor = String::new();
    let mut imported = 0;

    loop {
        let page = client.sync_transactions(access_token, &cursor).await?;

        let builders = page
            .added
            .iter()
            .filter_map(|transaction| builder_from_provider(transaction, user_id))
            .collect::<Vec<_>>();

        let connection = db_connection.lock().map_err(|_| Error::DatabaseLockError)?;
        imported += import_transactions(builders, &connection)?.len();
        drop(connection);

        cursor = page.next_cursor;

        if !page.has_more || cursor.is_empty() {
            break;
        }
    }

    Ok(imported)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        db::initialize,
        password::PasswordHash,
        provider::client::{PersonalFinanceCategory, ProviderTransaction},
        transaction::import_transactions,
        user::{UserID, insert_user},
    };

    use super::{builder_from_provider, create_import_id};

    fn provider_transaction(id: &str) -> ProviderTransaction {
        ProviderTransaction {
            transaction_id: id.to_owned(),
            date: "2024-01-05".to_owned(),
            amount: -12.5,
            name: Some("Coffee".to_owned()),
            category: Some(vec!["Food and Drink".to_owned(), "Coffee".to_owned()]),
            personal_finance_category: None,
        }
    }

    #[test]
    fn create_import_id_is_deterministic() {
        assert_eq!(create_import_id("txn-1"), create_import_id("txn-1"));
        assert_ne!(create_import_id("txn-1"), create_import_id("txn-2"));
    }

    #[test]
    fn builder_stores_absolute_amounts() {
        let builder =
            builder_from_provider(&provider_transaction("txn-1"), UserID::new(1)).unwrap();

        assert_eq!(builder.amount, 12.5);
        assert_eq!(builder.date, date!(2024 - 01 - 05));
        assert_eq!(builder.description, Some("Coffee".to_owned()));
    }

    #[test]
    fn builder_prefers_the_detailed_category() {
        let mut transaction = provider_transaction("txn-1");
        transaction.personal_finance_category = Some(PersonalFinanceCategory {
            detailed: "FOOD_AND_DRINK_COFFEE".to_owned(),
        });

        let builder = builder_from_provider(&transaction, UserID::new(1)).unwrap();

        assert_eq!(builder.category, "FOOD_AND_DRINK_COFFEE");
    }

    #[test]
    fn builder_falls_back_through_the_category_hierarchy() {
        let mut transaction = provider_transaction("txn-1");

        let builder = builder_from_provider(&transaction, UserID::new(1)).unwrap();
        assert_eq!(builder.category, "Food and Drink");

        transaction.category = None;
        let builder = builder_from_provider(&transaction, UserID::new(1)).unwrap();
        assert_eq!(builder.category, "Uncategorized");
    }

    #[test]
    fn builder_skips_unparseable_dates() {
        let mut transaction = provider_transaction("txn-1");
        transaction.date = "yesterday".to_owned();

        assert_eq!(builder_from_provider(&transaction, UserID::new(1)), None);
    }

    #[test]
    fn replaying_a_page_does_not_double_count() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = insert_user(
            "foo@bar.baz",
            PasswordHash::new_unchecked("hunter2hashed"),
            &conn,
        )
        .unwrap();

        let page: Vec<_> = ["txn-1", "txn-2"]
            .iter()
            .filter_map(|id| builder_from_provider(&provider_transaction(id), user.id))
            .collect();

        let first = import_transactions(page.clone(), &conn).unwrap();
        let second = import_transactions(page, &conn).unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 0);
    }
}
