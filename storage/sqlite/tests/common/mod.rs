use std::str::FromStr;

use tracing::Level;

#[allow(unused)]
pub use tabula_storage_common::{record, ColumnType, Record, Schema, SchemaError, TableDump, Value};
#[allow(unused)]
pub use tabula_storage_sqlite::SchemaEngine;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() {
    // if LOG_LEVEL env var is set, use it
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        tracing_subscriber::fmt().with_max_level(Level::from_str(&level).unwrap()).with_test_writer().init();
    } else {
        tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().init();
    }
}

/// An in-memory engine holding a `people` table with rows 1..=3
#[allow(unused)]
pub async fn people() -> anyhow::Result<SchemaEngine> {
    let engine = SchemaEngine::open_in_memory().await?;
    let records = vec![
        record! { "name" => "Ted", "email" => "ted@example.com", "age" => 22 },
        record! { "name" => "Jan", "email" => "jan@example.com", "age" => 41 },
        record! { "name" => "Bo", "email" => "bo@example.com", "age" => 30 },
    ];
    engine.upsert_batch("people", records, false).await?;
    Ok(engine)
}

/// Column names of a table, in table order
#[allow(unused)]
pub async fn columns(engine: &SchemaEngine, table: &str) -> anyhow::Result<Vec<String>> {
    Ok(engine.read_schema(table).await?.keys().cloned().collect())
}
