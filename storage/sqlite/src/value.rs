//! SQLite value type conversions

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use tabula_storage_common::{Record, Value};

/// Binds and reads a [`Value`] through rusqlite.
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteValue(pub Value);

impl SqliteValue {
    pub fn into_inner(self) -> Value { self.0 }
}

impl From<Value> for SqliteValue {
    fn from(value: Value) -> Self { SqliteValue(value) }
}

impl ToSql for SqliteValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match &self.0 {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Real(f) => ToSqlOutput::from(*f),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Blob(b) => ToSqlOutput::from(b.as_slice()),
        })
    }
}

impl FromSql for SqliteValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(SqliteValue(match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
        }))
    }
}

/// Read every column of the current row into a [`Record`], keyed by the statement's column names.
pub fn row_to_record(row: &rusqlite::Row<'_>, columns: &[String]) -> rusqlite::Result<Record> {
    let mut record = Record::with_capacity(columns.len());
    for (index, name) in columns.iter().enumerate() {
        let value: SqliteValue = row.get(index)?;
        record.insert(name.clone(), value.into_inner());
    }
    Ok(record)
}
