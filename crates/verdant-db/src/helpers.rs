//! Row-to-entity parsing helpers.
//!
//! Findings are spread over typed columns plus JSON text columns for the
//! list/map fields. These helpers isolate the encoding so every repo reads and
//! writes the same representation.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use verdant_core::location::Location;

use crate::error::DatabaseError;

/// Render a timestamp for storage.
///
/// Fixed nanosecond precision keeps every value the same width, so ordering by
/// the TEXT column is chronological and values roundtrip exactly.
#[must_use]
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a required TEXT column as `DateTime<Utc>`.
///
/// Handles both RFC 3339 (`"2026-02-09T14:30:00Z"`) and `SQLite`'s default
/// format (`"2026-02-09 14:30:00"`).
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string cannot be parsed as either format.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::Query(format!("Failed to parse datetime '{s}': {e}")))
}

/// Parse an optional TEXT column as `Option<DateTime<Utc>>`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if a non-empty string cannot be parsed.
pub fn parse_optional_datetime(s: Option<&str>) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => Ok(Some(parse_datetime(s)?)),
        _ => Ok(None),
    }
}

/// Parse a TEXT column into a serde-deserializable enum.
///
/// Works with all verdant-core enums that use `#[serde(rename_all = "snake_case")]`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string does not match any enum variant.
pub fn parse_enum<T: DeserializeOwned>(s: &str) -> Result<T, DatabaseError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|e| DatabaseError::Query(format!("Failed to parse enum from '{s}': {e}")))
}

/// Read a nullable TEXT column. Returns `None` for both SQL NULL and empty string.
///
/// `row.get::<String>(idx)` on a NULL column returns an error, not `""`.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_opt_string(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    match row.get::<Option<String>>(idx)? {
        Some(s) if s.is_empty() => Ok(None),
        other => Ok(other),
    }
}

/// Encode a list/map field for a JSON TEXT column.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if serialization fails.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value)
        .map_err(|e| DatabaseError::Query(format!("Failed to encode JSON column: {e}")))
}

/// Decode a JSON TEXT column.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the text is not valid JSON for `T`.
pub fn from_json<T: DeserializeOwned>(s: &str) -> Result<T, DatabaseError> {
    serde_json::from_str(s)
        .map_err(|e| DatabaseError::Query(format!("Invalid JSON in column: {e}")))
}

/// Read the `(latitude, longitude, location_name)` column triple starting at `idx`.
///
/// # Errors
///
/// Returns `DatabaseError::ConstraintViolation` for a partially populated triple.
pub fn get_location(row: &libsql::Row, idx: i32) -> Result<Option<Location>, DatabaseError> {
    let latitude = row.get::<Option<f64>>(idx)?;
    let longitude = row.get::<Option<f64>>(idx + 1)?;
    let name = get_opt_string(row, idx + 2)?;
    Ok(Location::from_parts(latitude, longitude, name)?)
}

/// Column values for an optional location, in `(latitude, longitude, location_name)` order.
#[must_use]
pub fn location_values(location: Option<&Location>) -> [libsql::Value; 3] {
    location.map_or(
        [libsql::Value::Null, libsql::Value::Null, libsql::Value::Null],
        |loc| {
            [
                libsql::Value::Real(loc.latitude),
                libsql::Value::Real(loc.longitude),
                libsql::Value::Text(loc.resolved_name.clone()),
            ]
        },
    )
}

/// Text value or NULL.
#[must_use]
pub fn opt_text(value: Option<&str>) -> libsql::Value {
    value.map_or(libsql::Value::Null, |s| libsql::Value::Text(s.to_string()))
}
