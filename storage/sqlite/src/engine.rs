//! The schema engine: every public operation, one awaited call each

use std::path::Path;

use tabula_storage_common::{ColumnType, DatabaseDump, ExportOptions, Record, Schema, SchemaError, TableDump};
use tracing::debug;

use crate::catalog::{self, table_exists};
use crate::connection::{SqliteConfig, Store};
use crate::error::SqliteError;
use crate::{ddl, rebuild, rows, transaction, transfer, upsert};

/// Schema-flexible CRUD over one SQLite store.
///
/// Tables and columns appear as records are written. Nothing about the schema is cached; every
/// operation reads what it needs from the database. Clones share the store.
#[derive(Clone, Debug)]
pub struct SchemaEngine {
    store: Store,
}

impl SchemaEngine {
    pub fn new(store: Store) -> Self { Self { store } }

    pub async fn connect(config: SqliteConfig) -> Result<Self, SchemaError> { Ok(Self::new(Store::connect(config).await?)) }

    /// Open a file-based database, creating it if needed
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SchemaError> { Ok(Self::new(Store::open(path).await?)) }

    /// Open an in-memory database (for testing)
    pub async fn open_in_memory() -> Result<Self, SchemaError> { Ok(Self::new(Store::open_in_memory().await?)) }

    pub fn store(&self) -> &Store { &self.store }

    async fn run<F, T>(&self, f: F) -> Result<T, SchemaError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T, SqliteError> + Send + 'static,
        T: Send + 'static,
    {
        Ok(self.store.with_connection(f).await?)
    }

    async fn run_mut<F, T>(&self, f: F) -> Result<T, SchemaError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<T, SqliteError> + Send + 'static,
        T: Send + 'static,
    {
        Ok(self.store.with_connection_mut(f).await?)
    }

    // Tables

    /// Create a table with the given columns plus `id`. Creating an existing table is a no-op.
    pub async fn create_table(&self, table: &str, schema: Schema) -> Result<(), SchemaError> {
        let table = table.to_owned();
        self.run(move |c| ddl::create_table(c, &table, &schema)).await
    }

    pub async fn delete_table(&self, table: &str) -> Result<(), SchemaError> {
        let table = table.to_owned();
        self.run(move |c| ddl::drop_table(c, &table)).await
    }

    pub async fn rename_table(&self, table: &str, new_name: &str) -> Result<(), SchemaError> {
        let (table, new_name) = (table.to_owned(), new_name.to_owned());
        self.run(move |c| ddl::rename_table(c, &table, &new_name)).await
    }

    pub async fn read_schema(&self, table: &str) -> Result<Schema, SchemaError> {
        let table = table.to_owned();
        self.run(move |c| catalog::read_schema(c, &table)).await
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool, SchemaError> {
        let table = table.to_owned();
        self.run(move |c| table_exists(c, &table)).await
    }

    pub async fn list_tables(&self) -> Result<Vec<String>, SchemaError> { self.run(catalog::list_tables).await }

    // Columns

    /// Add a `TEXT`, `NUMERIC` or `BLOB` column. `ColumnType::default()` is `TEXT`.
    pub async fn add_column(&self, table: &str, column: &str, ty: ColumnType) -> Result<(), SchemaError> {
        let (table, column) = (table.to_owned(), column.to_owned());
        self.run(move |c| ddl::add_column(c, &table, &column, &ty)).await
    }

    /// Remove a column by rebuilding the table. Returns the number of rows migrated.
    pub async fn delete_column(&self, table: &str, column: &str) -> Result<u64, SchemaError> {
        let (table, column) = (table.to_owned(), column.to_owned());
        self.run_mut(move |c| rebuild::alter_column(c, &table, &column, None)).await
    }

    /// Rename a column in place by rebuilding the table. Returns the number of rows migrated.
    pub async fn rename_column(&self, table: &str, column: &str, new_name: &str) -> Result<u64, SchemaError> {
        let (table, column, new_name) = (table.to_owned(), column.to_owned(), new_name.to_owned());
        self.run_mut(move |c| rebuild::alter_column(c, &table, &column, Some(&new_name))).await
    }

    // Rows

    /// Insert or merge one record, returning its id. See [`upsert::upsert`].
    pub async fn upsert(&self, table: &str, record: Record, strict: bool) -> Result<i64, SchemaError> {
        let table = table.to_owned();
        self.run(move |c| upsert::upsert(c, &table, &record, strict)).await
    }

    /// Upsert several records in one transaction, returning their ids in order.
    pub async fn upsert_batch(&self, table: &str, records: Vec<Record>, strict: bool) -> Result<Vec<i64>, SchemaError> {
        let table = table.to_owned();
        self.run(move |c| upsert::upsert_batch(c, &table, &records, strict)).await
    }

    /// The row with the given id. `None` when either the row or the table does not exist.
    pub async fn get(&self, table: &str, id: i64) -> Result<Option<Record>, SchemaError> {
        let table = table.to_owned();
        self.run(move |c| {
            tabula_storage_common::check_table_name(&table)?;
            if !table_exists(c, &table)? {
                debug!("get: no table {}", table);
                return Ok(None);
            }
            rows::fetch_row(c, &table, id)
        })
        .await
    }

    /// Run a raw statement and return the rows it produces.
    pub async fn query(&self, sql: &str) -> Result<Vec<Record>, SchemaError> {
        let sql = sql.to_owned();
        self.run(move |c| rows::query_records(c, &sql)).await
    }

    /// Run raw statements that return no rows, returning the rows changed by the last one.
    pub async fn execute(&self, sql: &str) -> Result<usize, SchemaError> {
        let sql = sql.to_owned();
        self.run(move |c| {
            debug!("execute: {}", sql);
            c.execute_batch(&sql)?;
            Ok(c.changes() as usize)
        })
        .await
    }

    /// Delete one row. Returns whether it existed.
    pub async fn delete(&self, table: &str, id: i64) -> Result<bool, SchemaError> {
        let table = table.to_owned();
        self.run(move |c| rows::delete_row(c, &table, id)).await
    }

    /// Delete the rows matching a raw SQL predicate, returning how many were removed.
    pub async fn delete_where(&self, table: &str, predicate: &str) -> Result<usize, SchemaError> {
        let (table, predicate) = (table.to_owned(), predicate.to_owned());
        self.run(move |c| rows::delete_where(c, &table, &predicate)).await
    }

    // Transfer

    /// Copy a table with all its rows into another store. Returns the number of rows copied.
    pub async fn copy_table(&self, table: &str, destination: &SchemaEngine) -> Result<u64, SchemaError> {
        let table = table.to_owned();
        Ok(Store::with_connection_pair(&self.store, &destination.store, move |src, dst| rebuild::copy_table(src, &table, dst)).await?)
    }

    /// Schema and all rows of a table, ordered by id
    pub async fn export_table(&self, table: &str) -> Result<TableDump, SchemaError> { self.export_table_page(table, ExportOptions::default()).await }

    pub async fn export_table_page(&self, table: &str, options: ExportOptions) -> Result<TableDump, SchemaError> {
        let table = table.to_owned();
        self.run(move |c| transfer::export_table(c, &table, &options)).await
    }

    pub async fn import_table(&self, table: &str, dump: TableDump) -> Result<u64, SchemaError> {
        let table = table.to_owned();
        self.run_mut(move |c| transfer::import_table(c, &table, &dump)).await
    }

    /// Export the named tables, or all of them with `None`
    pub async fn export_database(&self, tables: Option<Vec<String>>) -> Result<DatabaseDump, SchemaError> {
        self.run(move |c| transfer::export_database(c, tables.as_deref())).await
    }

    pub async fn import_database(&self, dump: DatabaseDump) -> Result<usize, SchemaError> {
        self.run_mut(move |c| transfer::import_database(c, &dump)).await
    }

    /// Copy the named tables, or all of them with `None`, into another store. Returns the
    /// number of tables copied.
    pub async fn copy_database(&self, destination: &SchemaEngine, tables: Option<Vec<String>>) -> Result<usize, SchemaError> {
        Ok(Store::with_connection_pair(&self.store, &destination.store, move |src, dst| transfer::copy_database(src, dst, tables.as_deref())).await?)
    }

    // Transactions

    /// Start a transaction unless one is active. Returns whether one was started.
    pub async fn begin_transaction(&self) -> Result<bool, SchemaError> { self.run(transaction::begin).await }

    /// Commit the active transaction. Returns `false` when none was active.
    pub async fn commit(&self) -> Result<bool, SchemaError> { self.run(transaction::commit).await }

    /// Roll back the active transaction. Returns `false` when none was active.
    pub async fn rollback(&self) -> Result<bool, SchemaError> { self.run(transaction::rollback).await }
}
