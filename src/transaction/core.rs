//! Database queries for creating, reading, updating and deleting
//! transactions.

use rusqlite::{Connection, Row, params_from_iter, types::Value};

use crate::{Error, db::DatabaseID, user::UserID};

use super::models::{Transaction, TransactionBuilder, TransactionUpdate};

const TRANSACTION_COLUMNS: &str = "id, user_id, date, category, amount, description, import_id";

/// Create a new transaction in the database.
///
/// # Errors
/// This function will return a:
/// - [Error::NegativeAmount] if the amount is below zero,
/// - [Error::DuplicateImportId] if the builder's import ID already exists,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if builder.amount < 0.0 {
        return Err(Error::NegativeAmount(builder.amount));
    }

    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" (user_id, date, category, amount, description, import_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                builder.user_id.as_i64(),
                builder.date,
                builder.category,
                builder.amount,
                builder.description,
                builder.import_id,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Insert many transactions in a single database transaction.
///
/// Builders whose import ID already exists in the database are skipped, so
/// replaying an aggregation-sync page after a crash does not double-count.
/// Returns the transactions that were actually inserted.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn import_transactions(
    builders: Vec<TransactionBuilder>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let sql_transaction = connection.unchecked_transaction()?;
    let mut imported = Vec::new();

    {
        let mut statement = sql_transaction.prepare(&format!(
            "INSERT INTO \"transaction\" (user_id, date, category, amount, description, import_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(import_id) DO NOTHING
             RETURNING {TRANSACTION_COLUMNS}"
        ))?;

        for builder in builders {
            let maybe_transaction = statement.query_row(
                (
                    builder.user_id.as_i64(),
                    builder.date,
                    builder.category,
                    builder.amount,
                    builder.description,
                    builder.import_id,
                ),
                map_transaction_row,
            );

            // A conflict produces no row, which surfaces as QueryReturnedNoRows.
            match maybe_transaction {
                Ok(transaction) => imported.push(transaction),
                Err(rusqlite::Error::QueryReturnedNoRows) => {}
                Err(error) => return Err(error.into()),
            }
        }
    }

    sql_transaction.commit()?;

    Ok(imported)
}

/// Retrieve the transaction with `id` belonging to `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction owned by
///   `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(
    id: DatabaseID,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            &[(":id", &id), (":user_id", &user_id.as_i64())],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Apply a partial, field-level update to the transaction with `id`
/// belonging to `user_id` and return the updated row.
///
/// Fields that are `None` are left unchanged.
///
/// # Errors
/// This function will return a:
/// - [Error::NegativeAmount] if the new amount is below zero,
/// - [Error::NotFound] if `id` does not refer to a transaction owned by
///   `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    id: DatabaseID,
    user_id: UserID,
    update: TransactionUpdate,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if let Some(amount) = update.amount.filter(|amount| *amount < 0.0) {
        return Err(Error::NegativeAmount(amount));
    }

    let mut set_clauses = Vec::new();
    let mut parameters: Vec<Value> = Vec::new();

    if let Some(date) = update.date {
        parameters.push(Value::Text(date.to_string()));
        set_clauses.push(format!("date = ?{}", parameters.len()));
    }

    if let Some(category) = update.category {
        parameters.push(Value::Text(category));
        set_clauses.push(format!("category = ?{}", parameters.len()));
    }

    if let Some(amount) = update.amount {
        parameters.push(Value::Real(amount));
        set_clauses.push(format!("amount = ?{}", parameters.len()));
    }

    if let Some(description) = update.description {
        parameters.push(Value::Text(description));
        set_clauses.push(format!("description = ?{}", parameters.len()));
    }

    if set_clauses.is_empty() {
        // Nothing to change, but the caller still expects the current row.
        return get_transaction(id, user_id, connection);
    }

    parameters.push(Value::Integer(id));
    let id_parameter = parameters.len();
    parameters.push(Value::Integer(user_id.as_i64()));
    let user_id_parameter = parameters.len();

    let query = format!(
        "UPDATE \"transaction\" SET {} WHERE id = ?{id_parameter} AND user_id = ?{user_id_parameter} \
         RETURNING {TRANSACTION_COLUMNS}",
        set_clauses.join(", ")
    );

    let transaction = connection
        .prepare(&query)?
        .query_row(params_from_iter(parameters.iter()), map_transaction_row)?;

    Ok(transaction)
}

/// Delete the transaction with `id` belonging to `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction owned by
///   `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction(
    id: DatabaseID,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_deleted = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_deleted == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get the distinct category names used by `user_id`, sorted alphabetically.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_categories(user_id: UserID, connection: &Connection) -> Result<Vec<String>, Error> {
    connection
        .prepare(
            "SELECT DISTINCT category FROM \"transaction\" WHERE user_id = :user_id \
             ORDER BY category ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], |row| row.get(0))?
        .map(|maybe_category| maybe_category.map_err(Error::SqlError))
        .collect()
}

pub(crate) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        date: row.get(2)?,
        category: row.get(3)?,
        amount: row.get(4)?,
        description: row.get(5)?,
        import_id: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        db::initialize,
        password::PasswordHash,
        transaction::models::{Transaction, TransactionUpdate},
        user::{UserID, insert_user},
    };

    use super::{
        create_transaction, delete_transaction, get_categories, get_transaction,
        import_transactions, update_transaction,
    };

    fn get_test_connection() -> (Connection, UserID) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let user = insert_user(
            "foo@bar.baz",
            PasswordHash::new_unchecked("hunter2hashed"),
            &conn,
        )
        .unwrap();

        (conn, user.id)
    }

    #[test]
    fn create_and_get_round_trip() {
        let (conn, user_id) = get_test_connection();

        let created = create_transaction(
            Transaction::build(user_id, date!(2024 - 01 - 05), "Income", 1000.0)
                .description(Some("Salary".to_owned())),
            &conn,
        )
        .unwrap();

        let got = get_transaction(created.id, user_id, &conn).unwrap();

        assert_eq!(created, got);
        assert_eq!(got.category, "Income");
        assert_eq!(got.description, Some("Salary".to_owned()));
    }

    #[test]
    fn create_rejects_negative_amounts() {
        let (conn, user_id) = get_test_connection();

        let result = create_transaction(
            Transaction::build(user_id, date!(2024 - 01 - 05), "Rent", -600.0),
            &conn,
        );

        assert_eq!(result, Err(Error::NegativeAmount(-600.0)));
    }

    #[test]
    fn get_is_scoped_to_the_owning_user() {
        let (conn, user_id) = get_test_connection();
        let other_user = insert_user(
            "other@bar.baz",
            PasswordHash::new_unchecked("hunter2hashed"),
            &conn,
        )
        .unwrap();

        let created = create_transaction(
            Transaction::build(user_id, date!(2024 - 01 - 05), "Rent", 600.0),
            &conn,
        )
        .unwrap();

        let result = get_transaction(created.id, other_user.id, &conn);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn update_changes_only_the_given_fields() {
        let (conn, user_id) = get_test_connection();
        let created = create_transaction(
            Transaction::build(user_id, date!(2024 - 01 - 05), "Rent", 600.0)
                .description(Some("January rent".to_owned())),
            &conn,
        )
        .unwrap();

        let updated = update_transaction(
            created.id,
            user_id,
            TransactionUpdate {
                amount: Some(650.0),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();

        assert_eq!(updated.amount, 650.0);
        assert_eq!(updated.date, created.date);
        assert_eq!(updated.category, created.category);
        assert_eq!(updated.description, created.description);
    }

    #[test]
    fn update_with_no_fields_returns_current_row() {
        let (conn, user_id) = get_test_connection();
        let created = create_transaction(
            Transaction::build(user_id, date!(2024 - 01 - 05), "Rent", 600.0),
            &conn,
        )
        .unwrap();

        let updated =
            update_transaction(created.id, user_id, TransactionUpdate::default(), &conn).unwrap();

        assert_eq!(updated, created);
    }

    #[test]
    fn update_missing_transaction_fails() {
        let (conn, user_id) = get_test_connection();

        let result = update_transaction(
            999,
            user_id,
            TransactionUpdate {
                amount: Some(1.0),
                ..Default::default()
            },
            &conn,
        );

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn delete_removes_the_transaction() {
        let (conn, user_id) = get_test_connection();
        let created = create_transaction(
            Transaction::build(user_id, date!(2024 - 01 - 05), "Rent", 600.0),
            &conn,
        )
        .unwrap();

        delete_transaction(created.id, user_id, &conn).unwrap();

        assert_eq!(
            get_transaction(created.id, user_id, &conn),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn delete_missing_transaction_fails() {
        let (conn, user_id) = get_test_connection();

        assert_eq!(delete_transaction(999, user_id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn get_categories_returns_distinct_sorted_names() {
        let (conn, user_id) = get_test_connection();
        for (date, category) in [
            (date!(2024 - 01 - 05), "Rent"),
            (date!(2024 - 01 - 06), "Groceries"),
            (date!(2024 - 02 - 05), "Rent"),
            (date!(2024 - 02 - 06), "Income"),
        ] {
            create_transaction(Transaction::build(user_id, date, category, 10.0), &conn).unwrap();
        }

        let categories = get_categories(user_id, &conn).unwrap();

        assert_eq!(categories, vec!["Groceries", "Income", "Rent"]);
    }

    #[test]
    fn import_skips_duplicate_import_ids() {
        let (conn, user_id) = get_test_connection();
        let builders = vec![
            Transaction::build(user_id, date!(2024 - 01 - 05), "Groceries", 42.0)
                .import_id(Some(1001)),
            Transaction::build(user_id, date!(2024 - 01 - 06), "Transport", 3.5)
                .import_id(Some(1002)),
        ];

        let first = import_transactions(builders.clone(), &conn).unwrap();
        // Replaying the same page must not double-count.
        let second = import_transactions(builders, &conn).unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 0);
        assert_eq!(get_categories(user_id, &conn).unwrap().len(), 2);
    }

    #[test]
    fn import_allows_many_transactions_without_import_ids() {
        let (conn, user_id) = get_test_connection();
        let builders = vec![
            Transaction::build(user_id, date!(2024 - 01 - 05), "Groceries", 42.0),
            Transaction::build(user_id, date!(2024 - 01 - 05), "Groceries", 42.0),
        ];

        let imported = import_transactions(builders, &conn).unwrap();

        assert_eq!(imported.len(), 2, "NULL import IDs never conflict");
    }
}
