use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use salary_core::RepositoryError;
use sqlx::{Row, TypeInfo, ValueRef, sqlite::SqliteRow};

/// Get a yen amount from a row, handling INTEGER, REAL and TEXT SQLite storage.
pub fn get_decimal(
    row: &SqliteRow,
    column: &str,
) -> Result<Decimal, RepositoryError> {
    let value_ref = row
        .try_get_raw(column)
        .map_err(|e| RepositoryError::Database(format!("Column '{}' not found: {}", column, e)))?;

    let type_info = value_ref.type_info();
    let type_name = type_info.name();

    match type_name {
        "INTEGER" => {
            let val: i64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!(
                    "Failed to get INTEGER from '{}': {}",
                    column, e
                ))
            })?;
            Ok(Decimal::from(val))
        }
        "REAL" => {
            let val: f64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get REAL from '{}': {}", column, e))
            })?;
            Decimal::try_from(val).map_err(|e| {
                RepositoryError::Database(format!("Failed to convert {} to Decimal: {}", val, e))
            })
        }
        "TEXT" => {
            let val: String = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get TEXT from '{}': {}", column, e))
            })?;
            Decimal::from_str(val.trim()).map_err(|_| {
                RepositoryError::Database(format!(
                    "Column '{}' holds non-numeric text '{}'",
                    column, val
                ))
            })
        }
        "NULL" => Ok(Decimal::ZERO),
        _ => Err(RepositoryError::Database(format!(
            "Unexpected type '{}' for column '{}'",
            type_name, column
        ))),
    }
}

/// Plain decimal text for SQLite storage. Read back with [`get_decimal`]
/// it yields the same value and scale.
pub fn decimal_to_text(d: Decimal) -> String {
    d.to_string()
}

/// Fixed-width UTC timestamp, so `ORDER BY created_at` sorts chronologically.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp. Accepts RFC 3339 and SQLite's
/// `CURRENT_TIMESTAMP` layout (assumed UTC).
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for layout in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return Ok(naive.and_utc());
        }
    }

    Err(RepositoryError::Database(format!(
        "Failed to parse timestamp '{}'",
        s
    )))
}

pub fn get_timestamp(
    row: &SqliteRow,
    column: &str,
) -> Result<DateTime<Utc>, RepositoryError> {
    let raw: String = row.try_get(column).map_err(|e| {
        RepositoryError::Database(format!("Failed to get {}: {}", column, e))
    })?;
    parse_timestamp(&raw)
}
