//! Column removal and renaming by rebuilding the table
//!
//! The table is copied row by row into `<table>_backup` with the new shape, then the original
//! is dropped and the copy takes its name. All of it happens inside one savepoint, so a failure
//! at any step leaves the original table exactly as it was.

use rusqlite::Connection;
use tabula_storage_common::{check_column_name, check_table_name, find_column, Schema, SchemaError, ID_COLUMN};
use tracing::{debug, info};

use crate::catalog::{find_table, read_schema, table_exists};
use crate::ddl::{create_table, drop_table, rename_table};
use crate::error::SqliteError;
use crate::rows::for_each_row;
use crate::upsert::upsert_stored;

/// Suffix of the shadow table a rebuild writes into
pub const BACKUP_SUFFIX: &str = "_backup";

/// The schema after removing `column` (`new_name == None`) or renaming it in place.
///
/// `column` is matched without regard to case. A rename may change only the case of a name.
pub fn target_schema(table: &str, schema: &Schema, column: &str, new_name: Option<&str>) -> Result<Schema, SchemaError> {
    let Some(column) = find_column(schema, column) else {
        return Err(SchemaError::UnknownColumn { table: table.to_owned(), column: column.to_owned() });
    };

    match new_name {
        None => {
            let mut target = schema.clone();
            target.shift_remove(column);
            Ok(target)
        }
        Some(new_name) => {
            if schema.keys().any(|name| name != column && name.eq_ignore_ascii_case(new_name)) {
                return Err(SchemaError::SchemaConflict { table: table.to_owned(), reason: format!("column {} already exists", new_name) });
            }
            Ok(schema.iter().map(|(name, ty)| (if name == column { new_name.to_owned() } else { name.clone() }, ty.clone())).collect())
        }
    }
}

/// Remove `column` from `table`, or rename it to `new_name`, returning the number of rows migrated.
pub fn alter_column(conn: &mut Connection, table: &str, column: &str, new_name: Option<&str>) -> Result<u64, SqliteError> {
    check_table_name(table)?;
    check_column_name(column)?;
    if let Some(new_name) = new_name {
        check_column_name(new_name)?;
    }
    if column.eq_ignore_ascii_case(ID_COLUMN) || new_name.is_some_and(|name| name.eq_ignore_ascii_case(ID_COLUMN)) {
        return Err(SchemaError::InvalidRequest(format!("the {} column cannot be removed or renamed", ID_COLUMN)).into());
    }

    let schema = read_schema(conn, table)?;
    let stored = find_table(conn, table)?.unwrap_or_else(|| table.to_owned());
    let table = stored.as_str();
    let target = target_schema(table, &schema, column, new_name)?;
    let column = find_column(&schema, column).unwrap_or(column);

    let shadow = format!("{}{}", table, BACKUP_SUFFIX);
    check_table_name(&shadow)?;
    if table_exists(conn, &shadow)? {
        return Err(SchemaError::SchemaConflict { table: table.to_owned(), reason: format!("shadow table {} already exists", shadow) }.into());
    }

    info!("Rebuilding {} ({} -> {:?})", table, column, new_name);
    let sp = conn.savepoint()?;

    create_table(&sp, &shadow, &target)?;
    let migrated = for_each_row(&sp, table, |mut row| {
        match row.shift_remove(column) {
            Some(value) => {
                if let Some(new_name) = new_name {
                    row.insert(new_name.to_owned(), value);
                }
            }
            None => debug!("Row without column {} in {}", column, table),
        }
        upsert_stored(&sp, &shadow, &row)?;
        Ok(())
    })?;

    drop_table(&sp, table)?;
    rename_table(&sp, &shadow, table)?;
    sp.commit()?;

    info!("Rebuilt {}: {} rows migrated", table, migrated);
    Ok(migrated)
}

/// Copy `table` with its schema and every row from `source` into `destination`.
///
/// Rows keep their ids, 0 included. Rows already present in the destination under the same id are merged.
pub fn copy_table(source: &Connection, table: &str, destination: &mut Connection) -> Result<u64, SqliteError> {
    let schema = read_schema(source, table)?;

    let sp = destination.savepoint()?;
    create_table(&sp, table, &schema)?;
    let copied = for_each_row(source, table, |row| {
        upsert_stored(&sp, table, &row)?;
        Ok(())
    })?;
    sp.commit()?;

    info!("Copied {} rows of {}", copied, table);
    Ok(copied)
}
