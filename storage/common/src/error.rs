use thiserror::Error;

/// Failures surfaced by the dynamic schema engine.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("invalid {kind} name: {name:?}")]
    Validation { kind: &'static str, name: String },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("failed to read schema of {table}: {source}")]
    SchemaRead { table: String, source: Box<dyn std::error::Error + Send + Sync + 'static> },
    #[error("schema conflict on {table}: {reason}")]
    SchemaConflict { table: String, reason: String },
    #[error("column {column} does not exist in {table}")]
    UnknownColumn { table: String, column: String },
    #[error("failed to create table {table}: {source}")]
    TableCreate { table: String, source: Box<dyn std::error::Error + Send + Sync + 'static> },
    #[error("failed to add column {column} to {table}: {source}")]
    ColumnAdd { table: String, column: String, source: Box<dyn std::error::Error + Send + Sync + 'static> },
    #[error("write to {table} failed: {source}")]
    Write { table: String, source: Box<dyn std::error::Error + Send + Sync + 'static> },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage error: {0}")]
    Engine(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl SchemaError {
    pub fn table_name(name: &str) -> Self { SchemaError::Validation { kind: "table", name: name.to_owned() } }

    pub fn column_name(name: &str) -> Self { SchemaError::Validation { kind: "column", name: name.to_owned() } }
}
