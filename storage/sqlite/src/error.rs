//! Error types for the SQLite engine

use tabula_storage_common::SchemaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqliteError {
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Task join error: {0}")]
    TaskJoin(String),
}

impl From<SqliteError> for SchemaError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::Schema(err) => err,
            other => SchemaError::Engine(Box::new(other)),
        }
    }
}

/// What a failed statement tells us about the shape of the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    MissingTable { table: String },
    MissingColumn { table: Option<String>, column: String },
    Unknown,
}

/// Classify a SQLite failure by its message.
///
/// SQLite reports both conditions with the generic `SQLITE_ERROR` code, so the message is all we have:
/// - `no such table: album`
/// - `table album has no column named year` (INSERT)
/// - `no such column: year` (SELECT / WHERE)
///
/// Prepare-time failures may carry a trailing ` in <sql> at offset <n>`, so names end at the first space.
pub fn error_kind(err: &rusqlite::Error) -> ErrorKind {
    let message = err.to_string();

    if let Some(rest) = after(&message, "no such table: ") {
        let table = first_word(rest);
        let table = table.rsplit('.').next().unwrap_or(table);
        return ErrorKind::MissingTable { table: table.to_owned() };
    }
    if let Some(rest) = after(&message, "no such column: ") {
        return ErrorKind::MissingColumn { table: None, column: first_word(rest).to_owned() };
    }
    if let Some(rest) = after(&message, "has no column named ") {
        let table = message.find("table ").map(|start| first_word(&message[start + "table ".len()..]).to_owned());
        return ErrorKind::MissingColumn { table, column: first_word(rest).to_owned() };
    }

    ErrorKind::Unknown
}

fn after<'a>(message: &'a str, marker: &str) -> Option<&'a str> { message.find(marker).map(|start| &message[start + marker.len()..]) }

fn first_word(s: &str) -> &str { s.split_whitespace().next().unwrap_or("") }
