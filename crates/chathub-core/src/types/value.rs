//! The closed SQL value model shared by the executor, the entity schemas,
//! and the cache layer.
//!
//! Field accessors and row decoding go through [`SqlValue`] instead of an
//! open "any" container, so the set of supported column types is fixed and
//! every conversion is explicit.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

use crate::error::AppError;
use crate::result::AppResult;

/// Declared semantic type of an entity field / table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Boolean column.
    Bool,
    /// 32-bit integer column.
    Int,
    /// 64-bit integer column (also the type of every entity id).
    BigInt,
    /// Double-precision float column.
    Double,
    /// Text column.
    Text,
    /// Timestamp-with-timezone column.
    Timestamp,
}

/// A single database value.
///
/// Conversions are lossless: values arriving in a neighboring native type
/// (an `INT4` for a `BigInt` field, RFC 3339 text or epoch milliseconds for
/// a `Timestamp` field) convert without truncation, and anything else is a
/// `Validation` error naming the requested type.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 32-bit integer value.
    Int(i32),
    /// 64-bit integer value.
    BigInt(i64),
    /// Double-precision float value.
    Double(f64),
    /// Text value.
    Text(String),
    /// Timestamp value (UTC).
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    /// Whether this value is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Convert to `i64`.
    pub fn as_i64(&self) -> AppResult<i64> {
        match self {
            Self::BigInt(v) => Ok(*v),
            Self::Int(v) => Ok(i64::from(*v)),
            Self::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| conversion_error(self, "i64")),
            _ => Err(conversion_error(self, "i64")),
        }
    }

    /// Convert to `i32`. Out-of-range 64-bit values are rejected.
    pub fn as_i32(&self) -> AppResult<i32> {
        match self {
            Self::Int(v) => Ok(*v),
            Self::BigInt(v) => {
                i32::try_from(*v).map_err(|_| conversion_error(self, "i32"))
            }
            Self::Text(s) => s
                .trim()
                .parse::<i32>()
                .map_err(|_| conversion_error(self, "i32")),
            _ => Err(conversion_error(self, "i32")),
        }
    }

    /// Convert to `f64`.
    pub fn as_f64(&self) -> AppResult<f64> {
        match self {
            Self::Double(v) => Ok(*v),
            Self::Int(v) => Ok(f64::from(*v)),
            Self::BigInt(v) => Ok(*v as f64),
            Self::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| conversion_error(self, "f64")),
            _ => Err(conversion_error(self, "f64")),
        }
    }

    /// Convert to `bool`. Integer 0/1 are accepted.
    pub fn as_bool(&self) -> AppResult<bool> {
        match self {
            Self::Bool(v) => Ok(*v),
            Self::Int(0) | Self::BigInt(0) => Ok(false),
            Self::Int(1) | Self::BigInt(1) => Ok(true),
            Self::Text(s) => match s.trim() {
                "true" | "t" | "1" => Ok(true),
                "false" | "f" | "0" => Ok(false),
                _ => Err(conversion_error(self, "bool")),
            },
            _ => Err(conversion_error(self, "bool")),
        }
    }

    /// Convert to an owned `String`. Numeric and timestamp values render
    /// in their canonical text form.
    pub fn as_text(&self) -> AppResult<String> {
        match self {
            Self::Null => Err(conversion_error(self, "text")),
            other => Ok(other.canonical_text()),
        }
    }

    /// Convert to a UTC timestamp. Accepts RFC 3339 text and epoch
    /// milliseconds in addition to native timestamps.
    pub fn as_timestamp(&self) -> AppResult<DateTime<Utc>> {
        match self {
            Self::Timestamp(v) => Ok(*v),
            Self::Text(s) => DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| conversion_error(self, "timestamp")),
            Self::BigInt(ms) => Utc
                .timestamp_millis_opt(*ms)
                .single()
                .ok_or_else(|| conversion_error(self, "timestamp")),
            Self::Int(ms) => Utc
                .timestamp_millis_opt(i64::from(*ms))
                .single()
                .ok_or_else(|| conversion_error(self, "timestamp")),
            _ => Err(conversion_error(self, "timestamp")),
        }
    }

    /// Deterministic textual form used for parameter hashing and for
    /// storing scalars in the cache. Pure: equal values always produce the
    /// same string.
    pub fn canonical_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::BigInt(v) => v.to_string(),
            Self::Double(v) => v.to_string(),
            Self::Text(s) => s.clone(),
            Self::Timestamp(t) => t.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Short tag naming the variant, used to disambiguate hashed parameter
    /// encodings (`Null` vs empty `Text`, `1` vs `true`).
    pub fn kind_tag(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::BigInt(_) => "bigint",
            Self::Double(_) => "double",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "ts",
        }
    }
}

fn conversion_error(value: &SqlValue, target: &str) -> AppError {
    AppError::validation(format!(
        "cannot convert {} value to {target}",
        value.kind_tag()
    ))
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::BigInt(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<SqlValue>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// One decoded database row: column names plus values in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlRow {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl SqlRow {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column/value pair.
    pub fn push(&mut self, column: impl Into<String>, value: SqlValue) {
        self.columns.push(column.into());
        self.values.push(value);
    }

    /// Look up a value by column name.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Look up a value by position.
    pub fn get_at(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Column names in select order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_widening_is_lossless() {
        assert_eq!(SqlValue::Int(42).as_i64().unwrap(), 42);
        assert_eq!(SqlValue::Text("42".into()).as_i64().unwrap(), 42);
        assert!(SqlValue::BigInt(i64::MAX).as_i32().is_err());
    }

    #[test]
    fn test_timestamp_coercions() {
        let dt = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let from_text = SqlValue::Text(dt.to_rfc3339()).as_timestamp().unwrap();
        let from_millis = SqlValue::BigInt(dt.timestamp_millis())
            .as_timestamp()
            .unwrap();
        assert_eq!(from_text, dt);
        assert_eq!(from_millis, dt);
    }

    #[test]
    fn test_canonical_text_is_stable() {
        let dt = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let v = SqlValue::Timestamp(dt);
        assert_eq!(v.canonical_text(), v.canonical_text());
        assert_eq!(SqlValue::BigInt(7).canonical_text(), "7");
        assert_eq!(SqlValue::Bool(true).canonical_text(), "true");
    }

    #[test]
    fn test_null_is_distinguishable_from_empty_text() {
        let null = SqlValue::Null;
        let empty = SqlValue::Text(String::new());
        assert_eq!(null.canonical_text(), empty.canonical_text());
        assert_ne!(null.kind_tag(), empty.kind_tag());
    }

    #[test]
    fn test_row_lookup() {
        let mut row = SqlRow::new();
        row.push("id", SqlValue::BigInt(5));
        row.push("username", SqlValue::Text("roma".into()));
        assert_eq!(row.get("id"), Some(&SqlValue::BigInt(5)));
        assert_eq!(row.get_at(1), Some(&SqlValue::Text("roma".into())));
        assert_eq!(row.get("missing"), None);
    }
}
