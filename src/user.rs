//! Defines a user of the application and its database queries.

use std::fmt::Display;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{Error, db::DatabaseID, password::PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to
/// better compile time errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserID(DatabaseID);

impl UserID {
    /// Create a user ID from a raw integer.
    pub fn new(id: DatabaseID) -> Self {
        Self(id)
    }

    /// The underlying integer ID.
    pub fn as_i64(&self) -> DatabaseID {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
///
/// Users own transactions; every query over transactions is scoped to a
/// single user.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The ID of the user.
    pub id: UserID,
    /// The email the user registered with.
    pub email: String,
    /// The user's salted and hashed password.
    pub password_hash: PasswordHash,
    /// The access token for the account-aggregation provider, set once the
    /// user has linked an external account.
    pub provider_access_token: Option<String>,
}

/// Create a new user in the database.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateEmail] if `email` is already registered,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn insert_user(
    email: &str,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (email, password) VALUES (?1, ?2)",
        (email, password_hash.to_string()),
    )?;

    Ok(User {
        id: UserID::new(connection.last_insert_rowid()),
        email: email.to_owned(),
        password_hash,
        provider_access_token: None,
    })
}

/// Retrieve the user with the given `email`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if no user has `email`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    let user = connection
        .prepare(
            "SELECT id, email, password, provider_access_token FROM user WHERE email = :email",
        )?
        .query_row(&[(":email", email)], map_user_row)?;

    Ok(user)
}

/// Retrieve the user with the given `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_user_by_id(id: UserID, connection: &Connection) -> Result<User, Error> {
    let user = connection
        .prepare("SELECT id, email, password, provider_access_token FROM user WHERE id = :id")?
        .query_row(&[(":id", &id.as_i64())], map_user_row)?;

    Ok(user)
}

/// Store the aggregation provider access token for the user with `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn set_provider_access_token(
    id: UserID,
    access_token: &str,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_updated = connection.execute(
        "UPDATE user SET provider_access_token = ?1 WHERE id = ?2",
        (access_token, id.as_i64()),
    )?;

    if rows_updated == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

fn map_user_row(row: &rusqlite::Row) -> Result<User, rusqlite::Error> {
    let raw_password_hash: String = row.get(2)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        email: row.get(1)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        provider_access_token: row.get(3)?,
    })
}
