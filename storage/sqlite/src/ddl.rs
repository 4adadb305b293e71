//! Table-level schema changes

use rusqlite::Connection;
use tabula_storage_common::{check_column_name, check_schema, check_table_name, ColumnType, Schema, SchemaError, ID_COLUMN};
use tracing::{debug, info};

use crate::error::SqliteError;
use crate::sql_builder;

/// Create a table if it does not exist yet. The `id` column is always `INTEGER PRIMARY KEY`,
/// whatever the given schema says about it.
pub fn create_table(conn: &Connection, table: &str, schema: &Schema) -> Result<(), SqliteError> {
    check_table_name(table)?;
    check_schema(schema)?;
    if let Some((name, _)) = schema.iter().find(|(name, ty)| **ty == ColumnType::IntegerPrimaryKey && name.as_str() != ID_COLUMN) {
        return Err(SchemaError::InvalidRequest(format!("only {} may be INTEGER PRIMARY KEY, not {}", ID_COLUMN, name)).into());
    }

    let mut schema = schema.clone();
    schema.insert(ID_COLUMN.to_owned(), ColumnType::IntegerPrimaryKey);

    let query = sql_builder::create_table(table, &schema);
    debug!("Creating table: {}", query);
    conn.execute(&query, []).map_err(|e| SchemaError::TableCreate { table: table.to_owned(), source: Box::new(e) })?;
    Ok(())
}

pub fn drop_table(conn: &Connection, table: &str) -> Result<(), SqliteError> {
    check_table_name(table)?;
    let query = sql_builder::drop_table(table);
    info!("Dropping table: {}", query);
    conn.execute(&query, [])?;
    Ok(())
}

pub fn rename_table(conn: &Connection, table: &str, new_name: &str) -> Result<(), SqliteError> {
    check_table_name(table)?;
    check_table_name(new_name)?;
    let query = sql_builder::rename_table(table, new_name);
    info!("Renaming table: {}", query);
    conn.execute(&query, [])?;
    Ok(())
}

/// Append a column. Only `TEXT`, `NUMERIC` and `BLOB` columns can be added.
pub fn add_column(conn: &Connection, table: &str, column: &str, ty: &ColumnType) -> Result<(), SqliteError> {
    check_table_name(table)?;
    check_column_name(column)?;
    if !ty.addable() {
        return Err(SchemaError::Validation { kind: "column type", name: ty.to_string() }.into());
    }

    let query = sql_builder::add_column(table, column, ty);
    info!("Adding column: {}", query);
    conn.execute(&query, []).map_err(|e| SchemaError::ColumnAdd { table: table.to_owned(), column: column.to_owned(), source: Box::new(e) })?;
    Ok(())
}
