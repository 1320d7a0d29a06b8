//! Conversions between libSQL values and domain field types.
//!
//! Money is stored as TEXT decimals, timestamps as fixed-width RFC 3339 TEXT
//! (microseconds, `Z`) so that string comparison orders them chronologically.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use libsql::{Row, Value};
use rust_decimal::Decimal;

use crate::common::error::{Result, ShopError};
use crate::domain::Audit;

pub(crate) fn ts(at: DateTime<Utc>) -> Value {
    Value::Text(at.to_rfc3339_opts(SecondsFormat::Micros, true))
}

pub(crate) fn opt_ts(at: Option<DateTime<Utc>>) -> Value {
    at.map(ts).unwrap_or(Value::Null)
}

pub(crate) fn now() -> Value {
    ts(Utc::now())
}

pub(crate) fn dec(value: Decimal) -> Value {
    Value::Text(value.to_string())
}

pub(crate) fn text(value: impl Into<String>) -> Value {
    Value::Text(value.into())
}

pub(crate) fn opt_text(value: Option<impl Into<String>>) -> Value {
    value.map(|v| Value::Text(v.into())).unwrap_or(Value::Null)
}

pub(crate) fn int(value: i64) -> Value {
    Value::Integer(value)
}

pub(crate) fn opt_int(value: Option<i64>) -> Value {
    value.map(Value::Integer).unwrap_or(Value::Null)
}

pub(crate) fn date(value: NaiveDate) -> Value {
    Value::Text(value.format("%Y-%m-%d").to_string())
}

/// Owned copy of one result row.
///
/// A libSQL `Row` reads from the statement's current step, so it has to be
/// copied before the cursor advances.
#[derive(Debug, Clone)]
pub(crate) struct Record {
    values: Vec<Value>,
}

impl Record {
    pub(crate) fn from_row(row: &Row, columns: i32) -> Result<Self> {
        let values = (0..columns)
            .map(|idx| row.get_value(idx))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { values })
    }

    pub(crate) fn get_value(&self, idx: i32) -> Result<Value> {
        usize::try_from(idx)
            .ok()
            .and_then(|i| self.values.get(i))
            .cloned()
            .ok_or_else(|| ShopError::Database {
                message: format!("column {idx} out of range"),
            })
    }
}

fn column_error(idx: i32, expected: &str, got: &Value) -> ShopError {
    ShopError::Database {
        message: format!("column {idx}: expected {expected}, got {got:?}"),
    }
}

pub(crate) fn get_i64(row: &Record, idx: i32) -> Result<i64> {
    match row.get_value(idx)? {
        Value::Integer(v) => Ok(v),
        other => Err(column_error(idx, "integer", &other)),
    }
}

pub(crate) fn get_opt_i64(row: &Record, idx: i32) -> Result<Option<i64>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Integer(v) => Ok(Some(v)),
        other => Err(column_error(idx, "integer or null", &other)),
    }
}

pub(crate) fn get_bool(row: &Record, idx: i32) -> Result<bool> {
    get_i64(row, idx).map(|v| v != 0)
}

pub(crate) fn get_string(row: &Record, idx: i32) -> Result<String> {
    match row.get_value(idx)? {
        Value::Text(v) => Ok(v),
        other => Err(column_error(idx, "text", &other)),
    }
}

pub(crate) fn get_opt_string(row: &Record, idx: i32) -> Result<Option<String>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Text(v) => Ok(Some(v)),
        other => Err(column_error(idx, "text or null", &other)),
    }
}

pub(crate) fn get_decimal(row: &Record, idx: i32) -> Result<Decimal> {
    match row.get_value(idx)? {
        Value::Text(v) => v
            .parse()
            .map_err(|e| ShopError::database(&format!("column {idx}: invalid decimal '{v}'"), e)),
        Value::Integer(v) => Ok(Decimal::from(v)),
        Value::Null => Ok(Decimal::ZERO),
        other => Err(column_error(idx, "decimal text", &other)),
    }
}

fn parse_ts(idx: i32, v: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(v)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ShopError::database(&format!("column {idx}: invalid timestamp '{v}'"), e))
}

pub(crate) fn get_ts(row: &Record, idx: i32) -> Result<DateTime<Utc>> {
    let v = get_string(row, idx)?;
    parse_ts(idx, &v)
}

pub(crate) fn get_opt_ts(row: &Record, idx: i32) -> Result<Option<DateTime<Utc>>> {
    match get_opt_string(row, idx)? {
        Some(v) => parse_ts(idx, &v).map(Some),
        None => Ok(None),
    }
}

pub(crate) fn get_date(row: &Record, idx: i32) -> Result<NaiveDate> {
    let v = get_string(row, idx)?;
    NaiveDate::parse_from_str(&v, "%Y-%m-%d")
        .map_err(|e| ShopError::database(&format!("column {idx}: invalid date '{v}'"), e))
}

/// Reads `created_at, updated_at, deleted_at` starting at column `start`.
pub(crate) fn get_audit(row: &Record, start: i32) -> Result<Audit> {
    Ok(Audit {
        created_at: get_ts(row, start)?,
        updated_at: get_ts(row, start + 1)?,
        deleted_at: get_opt_ts(row, start + 2)?,
    })
}

/// Column list matching [`get_audit`].
pub(crate) const AUDIT_COLUMNS: &str = "created_at, updated_at, deleted_at";

/// Whether a libSQL error is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(e: &libsql::Error) -> bool {
    e.to_string().contains("UNIQUE constraint failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_fixed_width() {
        let a = Utc::now();
        let b = a + chrono::Duration::milliseconds(1);
        match (ts(a), ts(b)) {
            (Value::Text(x), Value::Text(y)) => {
                assert_eq!(x.len(), y.len());
                assert!(x < y);
                assert!(x.ends_with('Z'));
            }
            _ => panic!("expected text"),
        }
    }

    #[test]
    fn record_reports_missing_columns() {
        let record = Record {
            values: vec![Value::Integer(3), Value::Text("x".to_string())],
        };
        assert_eq!(get_i64(&record, 0).unwrap(), 3);
        assert_eq!(get_string(&record, 1).unwrap(), "x");
        assert!(get_i64(&record, 2).is_err());
        assert!(get_i64(&record, -1).is_err());
    }

    #[test]
    fn decimals_keep_their_scale() {
        match dec("10.50".parse().unwrap()) {
            Value::Text(s) => assert_eq!(s, "10.50"),
            _ => panic!("expected text"),
        }
    }
}
