//! The core transaction data models.

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, db::DatabaseID, user::UserID};

pub(crate) mod date_format {
    //! Specifies how to serialize a [time::Date] in the `YYYY-MM-DD` format
    //! used everywhere at the API boundary.

    use serde::{Deserialize, Deserializer, Serializer};
    use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

    /// The date format used at the API boundary, e.g. "2024-01-05".
    pub(crate) const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
        format_description!("[year]-[month]-[day]");

    pub(crate) fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = date.format(DATE_FORMAT).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Date::parse(&s, DATE_FORMAT).map_err(serde::de::Error::custom)
    }

    pub(crate) mod option {
        //! Same format, for optional dates.

        use serde::{Deserialize, Deserializer, Serializer};
        use time::Date;

        #[allow(dead_code)]
        pub(crate) fn serialize<S>(date: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match date {
                Some(date) => super::serialize(date, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|s| {
                    Date::parse(&s, super::DATE_FORMAT).map_err(serde::de::Error::custom)
                })
                .transpose()
        }
    }
}

/// Parse a `YYYY-MM-DD` date string from the API boundary.
///
/// # Errors
/// Returns an [Error::InvalidDate] that maps to a client input error if
/// `value` is not a calendar date in that format.
pub fn parse_date(value: &str) -> Result<Date, Error> {
    Date::parse(value, date_format::DATE_FORMAT).map_err(|_| Error::InvalidDate(value.to_owned()))
}

/// An expense or income, i.e. an event where money was either spent or
/// earned.
///
/// To create a new `Transaction`, use [Transaction::build] and
/// [create_transaction](crate::transaction::create_transaction).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: DatabaseID,
    /// The ID of the user that owns this transaction.
    pub user_id: UserID,
    /// When the transaction happened.
    #[serde(with = "date_format")]
    pub date: Date,
    /// A free-text label describing the type of the transaction. The
    /// reserved value "Income" marks the transaction as income.
    pub category: String,
    /// The absolute amount of money spent or earned in this transaction.
    pub amount: f64,
    /// A text description of what the transaction was for.
    pub description: Option<String>,
    /// A unique ID for transactions fetched from the aggregation provider,
    /// used to make repeated syncs idempotent. Not exposed over the API.
    #[serde(skip)]
    pub import_id: Option<i64>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(user_id: UserID, date: Date, category: &str, amount: f64) -> TransactionBuilder {
        TransactionBuilder {
            user_id,
            date,
            category: category.to_owned(),
            amount,
            description: None,
            import_id: None,
        }
    }
}

/// A builder for inserting new [Transaction] rows.
///
/// Finalize with [create_transaction](crate::transaction::create_transaction)
/// or, for batches, [import_transactions](crate::transaction::import_transactions).
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionBuilder {
    /// The ID of the user that owns the transaction.
    pub user_id: UserID,
    /// The date when the transaction occurred.
    pub date: Date,
    /// The category label of the transaction.
    pub category: String,
    /// The absolute amount of the transaction.
    pub amount: f64,
    /// A text description of what the transaction was for.
    pub description: Option<String>,
    /// See [Transaction::import_id].
    pub import_id: Option<i64>,
}

impl TransactionBuilder {
    /// Set the description of the transaction.
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Set the import ID of the transaction.
    pub fn import_id(mut self, import_id: Option<i64>) -> Self {
        self.import_id = import_id;
        self
    }
}

/// The request body for creating a transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    /// When the transaction happened.
    #[serde(with = "date_format")]
    pub date: Date,
    /// The category label of the transaction.
    pub category: String,
    /// The absolute amount of the transaction. Must not be negative.
    pub amount: f64,
    /// A text description of what the transaction was for.
    #[serde(default)]
    pub description: Option<String>,
}

/// The request body for a partial, field-level transaction update.
///
/// Fields that are absent are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionUpdate {
    /// A new date for the transaction.
    #[serde(default, with = "date_format::option")]
    pub date: Option<Date>,
    /// A new category for the transaction.
    pub category: Option<String>,
    /// A new amount for the transaction. Must not be negative.
    pub amount: Option<f64>,
    /// A new description for the transaction.
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{Error, user::UserID};

    use super::{NewTransaction, Transaction, TransactionUpdate, parse_date};

    #[test]
    fn serialize_transaction_formats_date() {
        let transaction = Transaction {
            id: 1,
            user_id: UserID::new(2),
            date: date!(2024 - 01 - 05),
            category: "Income".to_owned(),
            amount: 1000.0,
            description: Some("Salary".to_owned()),
            import_id: Some(42),
        };

        let json = serde_json::to_value(&transaction).unwrap();

        assert_eq!(json["date"], "2024-01-05");
        assert_eq!(json["category"], "Income");
        assert!(
            json.get("import_id").is_none(),
            "import_id should not be exposed over the API"
        );
    }

    #[test]
    fn deserialize_new_transaction() {
        let body = r#"{"date": "2024-02-29", "category": "Rent", "amount": 600.5}"#;

        let new_transaction: NewTransaction = serde_json::from_str(body).unwrap();

        assert_eq!(new_transaction.date, date!(2024 - 02 - 29));
        assert_eq!(new_transaction.category, "Rent");
        assert_eq!(new_transaction.amount, 600.5);
        assert_eq!(new_transaction.description, None);
    }

    #[test]
    fn deserialize_partial_update() {
        let body = r#"{"amount": 650.0}"#;

        let update: TransactionUpdate = serde_json::from_str(body).unwrap();

        assert_eq!(update.amount, Some(650.0));
        assert_eq!(update.date, None);
        assert_eq!(update.category, None);
        assert_eq!(update.description, None);
    }

    #[test]
    fn parse_date_accepts_iso_dates() {
        assert_eq!(parse_date("2024-01-05"), Ok(date!(2024 - 01 - 05)));
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert_eq!(
            parse_date("05/01/2024"),
            Err(Error::InvalidDate("05/01/2024".to_owned()))
        );
        assert_eq!(
            parse_date("2024-13-01"),
            Err(Error::InvalidDate("2024-13-01".to_owned()))
        );
    }
}
