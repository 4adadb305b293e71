//! Export and import of tables and whole databases as [`TableDump`]s

use rusqlite::Connection;
use tabula_storage_common::{DatabaseDump, ExportOptions, TableDump};
use tracing::{info, warn};

use crate::catalog::{list_tables, read_schema, table_exists};
use crate::ddl::create_table;
use crate::error::SqliteError;
use crate::rebuild::copy_table;
use crate::rows::select_page;
use crate::upsert::upsert_stored;

/// Schema and rows of `table` within the given window. A table that does not exist exports
/// as an empty dump.
pub fn export_table(conn: &Connection, table: &str, options: &ExportOptions) -> Result<TableDump, SqliteError> {
    tabula_storage_common::check_table_name(table)?;
    if !table_exists(conn, table)? {
        warn!("export_table: {} does not exist", table);
        return Ok(TableDump::default());
    }

    let schema = read_schema(conn, table)?;
    let data = select_page(conn, table, options)?;
    Ok(TableDump { schema, data })
}

/// Create `table` from the dump's schema and upsert every row of it, returning the row count.
///
/// Rows keep their ids, 0 included. Either every row lands or none does.
pub fn import_table(conn: &mut Connection, table: &str, dump: &TableDump) -> Result<u64, SqliteError> {
    let sp = conn.savepoint()?;
    create_table(&sp, table, &dump.schema)?;
    for row in &dump.data {
        upsert_stored(&sp, table, row)?;
    }
    sp.commit()?;

    info!("Imported {} rows into {}", dump.data.len(), table);
    Ok(dump.data.len() as u64)
}

/// Export the given tables, or every user table when `tables` is `None`.
pub fn export_database(conn: &Connection, tables: Option<&[String]>) -> Result<DatabaseDump, SqliteError> {
    let tables = match tables {
        Some(tables) => tables.to_vec(),
        None => list_tables(conn)?,
    };

    let mut dump = DatabaseDump::with_capacity(tables.len());
    for table in tables {
        let table_dump = export_table(conn, &table, &ExportOptions::default())?;
        dump.insert(table, table_dump);
    }
    Ok(dump)
}

/// Import every table of `dump` in order, stopping at the first table that fails.
///
/// Tables imported before the failure stay imported. Returns the number of tables imported.
pub fn import_database(conn: &mut Connection, dump: &DatabaseDump) -> Result<usize, SqliteError> {
    for (imported, (table, table_dump)) in dump.iter().enumerate() {
        if let Err(e) = import_table(conn, table, table_dump) {
            warn!("import_database: stopping at {} after {} tables: {}", table, imported, e);
            return Err(e);
        }
    }
    Ok(dump.len())
}

/// Copy the given tables, or every user table when `tables` is `None`, from `source` into
/// `destination`, returning the number of tables copied. Stops at the first table that fails;
/// tables copied before it stay copied.
pub fn copy_database(source: &Connection, destination: &mut Connection, tables: Option<&[String]>) -> Result<usize, SqliteError> {
    let tables = match tables {
        Some(tables) => tables.to_vec(),
        None => list_tables(source)?,
    };

    for (copied, table) in tables.iter().enumerate() {
        if let Err(e) = copy_table(source, table, destination) {
            warn!("copy_database: stopping at {} after {} tables: {}", table, copied, e);
            return Err(e);
        }
    }
    info!("Copied {} tables", tables.len());
    Ok(tables.len())
}
