//! Parsing transaction rows out of CSV statement files.

use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    Error,
    transaction::{Transaction, TransactionBuilder, parse_date},
    user::UserID,
};

/// The category used for rows with an empty category cell.
const UNCATEGORIZED: &str = "Uncategorized";

/// Some exports write dates with slashes instead of dashes.
const SLASH_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]/[month]/[day]");

/// Parse CSV data into transaction rows for `user_id`.
///
/// Expects a header row naming at least the `date`, `category` and `amount`
/// columns (any casing, any order); a `description` column is used when
/// present. Rows whose date or amount cannot be parsed are skipped rather
/// than failing the whole import. Amounts are stored as absolute values.
///
/// # Errors
/// Returns an [Error::InvalidCSV] that maps to a client input error when
/// the header row is missing one of the required columns or the data is
/// not valid CSV.
pub fn parse_transactions_csv(
    text: &str,
    user_id: UserID,
) -> Result<Vec<TransactionBuilder>, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|error| Error::InvalidCSV(error.to_string()))?
        .clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name))
    };

    let missing_columns =
        || Error::InvalidCSV("CSV must include the columns date, category and amount".to_owned());

    let date_column = column("date").ok_or_else(missing_columns)?;
    let category_column = column("category").ok_or_else(missing_columns)?;
    let amount_column = column("amount").ok_or_else(missing_columns)?;
    let description_column = column("description");

    let mut builders = Vec::new();
    let mut skipped = 0;

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(error) => {
                tracing::debug!("skipping malformed CSV record: {error}");
                skipped += 1;
                continue;
            }
        };

        let date = record.get(date_column).and_then(parse_row_date);
        let amount = record
            .get(amount_column)
            .and_then(|raw| raw.parse::<f64>().ok());

        let (Some(date), Some(amount)) = (date, amount) else {
            tracing::debug!("skipping CSV row with unparseable date or amount: {record:?}");
            skipped += 1;
            continue;
        };

        let category = match record.get(category_column) {
            Some(category) if !category.is_empty() => category.to_owned(),
            _ => UNCATEGORIZED.to_owned(),
        };

        let description = description_column
            .and_then(|index| record.get(index))
            .filter(|description| !description.is_empty())
            .map(str::to_owned);

        builders.push(
            Transaction::build(user_id, date, &category, amount.abs()).description(description),
        );
    }

    if skipped > 0 {
        tracing::debug!("skipped {skipped} unparseable CSV rows");
    }

    Ok(builders)
}

/// Parse a date cell, accepting `YYYY-MM-DD` (with or without a trailing
/// time component) and `YYYY/MM/DD`.
fn parse_row_date(raw: &str) -> Option<Date> {
    if raw.contains('/') {
        return Date::parse(raw, SLASH_DATE_FORMAT).ok();
    }

    parse_date(raw.get(..10).unwrap_or(raw)).ok()
}
