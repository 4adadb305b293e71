//! Scalar values and records

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Name of the primary key column every table carries.
pub const ID_COLUMN: &str = "id";

/// A single field value, one per SQLite storage class.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// Column name to value, in column order.
pub type Record = IndexMap<String, Value>;

impl Value {
    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    /// True for integers, reals and strings that read as a complete number.
    pub fn is_numeric(&self) -> bool {
        match self {
            Value::Integer(_) | Value::Real(_) => true,
            Value::Text(s) => numeric_text(s),
            Value::Null | Value::Blob(_) => false,
        }
    }

    /// Interpret this value as a row id. Anything that is not a number reads as 0.
    pub fn as_row_id(&self) -> i64 {
        match self {
            Value::Integer(i) => *i,
            Value::Real(f) if f.is_finite() => f.trunc() as i64,
            Value::Text(s) if numeric_text(s) => {
                let s = s.trim_start();
                s.parse::<i64>().unwrap_or_else(|_| s.parse::<f64>().map(|f| f.trunc() as i64).unwrap_or(0))
            }
            _ => 0,
        }
    }
}

/// Read the `id` field of a record, normalized to an integer (0 when absent or not a number).
pub fn record_id(record: &Record) -> i64 { record.get(ID_COLUMN).map(Value::as_row_id).unwrap_or(0) }

/// Decimal number grammar: optional leading whitespace and sign, digits with an
/// optional fraction, optional exponent. Special float spellings like `inf` are rejected.
fn numeric_text(s: &str) -> bool {
    let bytes = s.trim_start().as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }
    if digits == 0 {
        return false;
    }

    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == bytes.len()
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "{}", s),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::Text(s.to_owned()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Value::Text(s) }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self { Value::Integer(i) }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self { Value::Integer(i as i64) }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self { Value::Real(f) }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Integer(if b { 1 } else { 0 }) }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self { Value::Blob(bytes) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => b.into(),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Real(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            // Nested structures have no column type of their own; keep them as JSON text
            other => Value::Text(other.to_string()),
        }
    }
}

/// Build a [`Record`] from `column => value` pairs.
#[macro_export]
macro_rules! record {
    ($($column:expr => $value:expr),* $(,)?) => {{
        let mut record = $crate::Record::new();
        $( record.insert(::std::string::String::from($column), $crate::Value::from($value)); )*
        record
    }};
}
