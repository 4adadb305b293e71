//! Column types, schemas and identifier rules

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::error::SchemaError;
use crate::value::{Value, ID_COLUMN};

/// Declared storage class of a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    /// Only ever used for the `id` column
    IntegerPrimaryKey,
    Text,
    Numeric,
    Blob,
    /// A declared type the engine did not create itself (e.g. `VARCHAR(20)` from a raw statement)
    Other(String),
}

/// Column name to declared type, in table order.
pub type Schema = IndexMap<String, ColumnType>;

impl ColumnType {
    pub fn as_sql(&self) -> &str {
        match self {
            ColumnType::IntegerPrimaryKey => "INTEGER PRIMARY KEY",
            ColumnType::Text => "TEXT",
            ColumnType::Numeric => "NUMERIC",
            ColumnType::Blob => "BLOB",
            ColumnType::Other(declared) => declared,
        }
    }

    /// Whether a column of this type may be added to an existing table.
    pub fn addable(&self) -> bool { matches!(self, ColumnType::Text | ColumnType::Numeric | ColumnType::Blob) }

    /// Parse a declared type as reported by the catalog.
    ///
    /// The catalog reports `INTEGER` for an `INTEGER PRIMARY KEY` column, so callers reading
    /// a live schema map the `id` column themselves.
    pub fn parse(declared: &str) -> Result<Self, SchemaError> {
        let normalized = declared.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_ascii_uppercase().as_str() {
            "INTEGER PRIMARY KEY" => Ok(ColumnType::IntegerPrimaryKey),
            "TEXT" => Ok(ColumnType::Text),
            "NUMERIC" => Ok(ColumnType::Numeric),
            "BLOB" => Ok(ColumnType::Blob),
            _ if valid_declared_type(&normalized) => Ok(ColumnType::Other(normalized)),
            _ => Err(SchemaError::Validation { kind: "column type", name: declared.to_owned() }),
        }
    }
}

impl Default for ColumnType {
    fn default() -> Self { ColumnType::Text }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_sql()) }
}

impl TryFrom<String> for ColumnType {
    type Error = SchemaError;
    fn try_from(value: String) -> Result<Self, Self::Error> { ColumnType::parse(&value) }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self { value.as_sql().to_owned() }
}

/// Infer the storage class for a field seen for the first time.
///
/// Numbers and numeric-looking strings become `NUMERIC`, everything else `TEXT`.
pub fn infer_column_type(value: &Value) -> ColumnType { if value.is_numeric() { ColumnType::Numeric } else { ColumnType::Text } }

/// Infer a schema for a record's fields, with the `id` column forced to the front.
pub fn infer_schema<'a>(fields: impl IntoIterator<Item = (&'a String, &'a Value)>) -> Schema {
    let mut schema = Schema::new();
    schema.insert(ID_COLUMN.to_owned(), ColumnType::IntegerPrimaryKey);
    for (name, value) in fields {
        if name != ID_COLUMN {
            schema.insert(name.clone(), infer_column_type(value));
        }
    }
    schema
}

/// The stored spelling of `column` in `schema`. SQLite identifiers are case-insensitive.
pub fn find_column<'s>(schema: &'s Schema, column: &str) -> Option<&'s str> {
    schema.keys().find(|name| name.eq_ignore_ascii_case(column)).map(String::as_str)
}

/// Table and column names: an ASCII letter followed by letters, digits or underscores.
pub fn sane_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn check_table_name(name: &str) -> Result<(), SchemaError> {
    if sane_name(name) {
        Ok(())
    } else {
        Err(SchemaError::table_name(name))
    }
}

pub fn check_column_name(name: &str) -> Result<(), SchemaError> {
    if sane_name(name) {
        Ok(())
    } else {
        Err(SchemaError::column_name(name))
    }
}

/// Validate every column name of a schema.
pub fn check_schema(schema: &Schema) -> Result<(), SchemaError> {
    for name in schema.keys() {
        check_column_name(name)?;
    }
    Ok(())
}

fn valid_declared_type(declared: &str) -> bool {
    declared.starts_with(|c: char| c.is_ascii_alphabetic())
        && declared.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ' ' | '(' | ')' | ','))
}
