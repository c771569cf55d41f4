//! Row-to-entity parsing helpers.
//!
//! Every repo converts `libsql::Row` (column-indexed) into typed entity
//! structs. These helpers isolate the parsing logic and handle the dual
//! datetime format (`SQLite`'s `datetime('now')` vs Rust's `to_rfc3339()`).

use chrono::{DateTime, NaiveDate, Utc};
use vest_core::period::Period;

use crate::error::DatabaseError;

/// Parse a required TEXT column as `DateTime<Utc>`.
///
/// Handles both RFC 3339 (`"2026-02-09T14:30:00+00:00"`) and `SQLite`'s default
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

/// Parse a `YYYY-MM-DD` TEXT column.
///
/// # Errors
///
/// Returns `DatabaseError::Query` on a malformed date.
pub fn parse_date(s: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DatabaseError::Query(format!("Failed to parse date '{s}': {e}")))
}

/// Parse a `YYYY-Www` TEXT column.
///
/// # Errors
///
/// Returns `DatabaseError::Query` on a malformed period.
pub fn parse_period(s: &str) -> Result<Period, DatabaseError> {
    s.parse()
        .map_err(|e| DatabaseError::Query(format!("Failed to parse period '{s}': {e}")))
}

/// Parse a TEXT column into a serde-deserializable enum.
///
/// Works with all vest-core enums that use `#[serde(rename_all = "snake_case")]`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string does not match any enum variant.
pub fn parse_enum<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, DatabaseError> {
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

/// Read an INTEGER count column as `u32`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the value is negative or too large.
pub fn get_u32(row: &libsql::Row, idx: i32) -> Result<u32, DatabaseError> {
    let value = row.get::<i64>(idx)?;
    u32::try_from(value)
        .map_err(|_| DatabaseError::Query(format!("column {idx} out of range for u32: {value}")))
}

/// Read an INTEGER count column as `u64`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the value is negative.
pub fn get_u64(row: &libsql::Row, idx: i32) -> Result<u64, DatabaseError> {
    let value = row.get::<i64>(idx)?;
    u64::try_from(value)
        .map_err(|_| DatabaseError::Query(format!("column {idx} out of range for u64: {value}")))
}

/// Extract an optional JSON value from a TEXT column.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if a non-empty string contains invalid JSON.
pub fn parse_optional_json(s: Option<&str>) -> Result<Option<serde_json::Value>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => {
            let val = serde_json::from_str(s)
                .map_err(|e| DatabaseError::Query(format!("Invalid JSON in column: {e}")))?;
            Ok(Some(val))
        }
        _ => Ok(None),
    }
}

/// Convert an optional string into a nullable SQL value.
#[must_use]
pub fn opt_text(value: Option<&str>) -> libsql::Value {
    value.map_or(libsql::Value::Null, |s| libsql::Value::Text(s.to_string()))
}

/// Trim a required text field, rejecting blank input.
///
/// # Errors
///
/// Returns `DatabaseError::Validation` naming `field` when the value is blank.
pub fn require_text(field: &str, value: &str) -> Result<String, DatabaseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DatabaseError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Offset-based page selector for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl PageRequest {
    /// Build a request, clamping `page` to at least 1 and `per_page` to `[1, max_per_page]`.
    #[must_use]
    pub fn clamped(page: Option<u32>, per_page: Option<u32>, default_per_page: u32, max_per_page: u32) -> Self {
        let max = max_per_page.max(1);
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(default_per_page).clamp(1, max),
        }
    }

    #[must_use]
    pub fn offset(self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}
