//! Writes that grow the schema as they go
//!
//! A record may name columns the table does not have yet. Unless the write is strict, the
//! missing columns are added (typed from the values being written) and the write is retried once.

use rusqlite::{params_from_iter, Connection};
use tabula_storage_common::{
    check_column_name, check_table_name, find_column, infer_column_type, infer_schema, record_id, ColumnType, Record, Schema, SchemaError, Value, ID_COLUMN,
};
use tracing::{debug, info, warn};

use crate::catalog::{read_schema, table_exists};
use crate::ddl::{add_column, create_table};
use crate::error::{error_kind, ErrorKind, SqliteError};
use crate::rows::fetch_row;
use crate::sql_builder::insert_or_replace;
use crate::transaction::TransactionScope;

/// How the `id` field of a record picks the row it writes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RowId {
    /// `id` missing or 0 inserts a new row with an id assigned by SQLite
    Assign,
    /// `id` is bound exactly as stored, 0 included. Only a missing or NULL `id` assigns one.
    Keep,
}

/// Insert or update one record, returning its id.
///
/// - `id` missing or 0 inserts a new row with an id assigned by SQLite.
/// - Any other `id` updates that row; fields absent from `record` keep their stored values.
///   If no such row exists it is inserted under that id.
/// - A table that does not exist yet is created from the record's fields.
/// - With `strict`, a record naming unknown columns fails instead of widening the table.
/// - Field names match columns regardless of case and are written under the stored spelling.
pub fn upsert(conn: &Connection, table: &str, record: &Record, strict: bool) -> Result<i64, SqliteError> {
    write_row(conn, table, record, strict, RowId::Assign)
}

/// Write a row that already exists somewhere else (a rebuild, copy or import) under its own id.
pub fn upsert_stored(conn: &Connection, table: &str, row: &Record) -> Result<i64, SqliteError> { write_row(conn, table, row, false, RowId::Keep) }

fn write_row(conn: &Connection, table: &str, record: &Record, strict: bool, row_id: RowId) -> Result<i64, SqliteError> {
    check_table_name(table)?;
    for column in record.keys() {
        check_column_name(column)?;
    }

    let exists = table_exists(conn, table)?;
    let known = if exists {
        read_schema(conn, table)?
    } else {
        Schema::from([(ID_COLUMN.to_owned(), ColumnType::IntegerPrimaryKey)])
    };
    let record = fold_columns(&known, record);
    if !exists {
        info!("upsert: creating table {} from record fields", table);
        create_table(conn, table, &infer_schema(&record))?;
    }

    let id = match row_id {
        RowId::Assign => Some(record_id(&record)).filter(|id| *id != 0),
        RowId::Keep => record.get(ID_COLUMN).filter(|value| !value.is_null()).map(Value::as_row_id),
    };

    let mut merged = match id {
        None => Record::with_capacity(record.len()),
        Some(id) => fetch_row(conn, table, id)?.unwrap_or_default(),
    };
    for (column, value) in record {
        merged.insert(column, value);
    }

    let (sql, params) = insert_or_replace(table, id, &merged);
    debug!("upsert: {}", sql);

    let write_error = |e: rusqlite::Error| SchemaError::Write { table: table.to_owned(), source: Box::new(e) };
    let execute = || conn.execute(&sql, params_from_iter(params.iter()));

    match execute() {
        Ok(_) => {}
        Err(err) if !strict && matches!(error_kind(&err), ErrorKind::MissingColumn { .. }) => {
            warn!("upsert into {} failed ({}); adding missing columns and retrying", table, err);
            add_missing_columns(conn, table, &merged)?;
            execute().map_err(write_error)?;
        }
        Err(err) => return Err(write_error(err).into()),
    }

    Ok(id.unwrap_or_else(|| conn.last_insert_rowid()))
}

/// Rename the fields of `record` to the spelling of the matching known column. Fields that
/// differ only in case collapse into one, the later value winning.
fn fold_columns(known: &Schema, record: &Record) -> Record {
    let mut folded = Record::with_capacity(record.len());
    for (column, value) in record {
        let name = find_column(known, column)
            .or_else(|| folded.keys().map(String::as_str).find(|name| name.eq_ignore_ascii_case(column)))
            .unwrap_or(column)
            .to_owned();
        folded.insert(name, value.clone());
    }
    folded
}

/// Add every field of `record` the table lacks, typed from the record's values.
fn add_missing_columns(conn: &Connection, table: &str, record: &Record) -> Result<(), SqliteError> {
    let schema = read_schema(conn, table)?;
    for (column, value) in record.iter().filter(|(column, _)| !column.eq_ignore_ascii_case(ID_COLUMN) && find_column(&schema, column).is_none()) {
        add_column(conn, table, column, &infer_column_type(value))?;
    }
    Ok(())
}

/// Upsert several records inside one transaction, stopping at the first failure.
///
/// When this call opened the transaction a failure rolls back every record of the batch.
pub fn upsert_batch(conn: &Connection, table: &str, records: &[Record], strict: bool) -> Result<Vec<i64>, SqliteError> {
    let scope = TransactionScope::begin(conn)?;
    let mut ids = Vec::with_capacity(records.len());
    for record in records {
        ids.push(upsert(&scope, table, record, strict)?);
    }
    scope.commit()?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_storage_common::{record, ColumnType, Schema, Value};

    #[test]
    fn test_strict_upsert_keeps_shape() {
        let conn = Connection::open_in_memory().unwrap();
        create_table(&conn, "table1", &Schema::new()).unwrap();

        let stu = record! { "id" => 0, "name" => "Stu", "age" => 3, "stuff" => "none" };
        let err = upsert(&conn, "table1", &stu, true).unwrap_err();
        assert!(matches!(err, SqliteError::Schema(SchemaError::Write { .. })), "{err:?}");
        assert_eq!(read_schema(&conn, "table1").unwrap().len(), 1);

        assert_eq!(upsert(&conn, "table1", &stu, false).unwrap(), 1);
        let schema = read_schema(&conn, "table1").unwrap();
        let columns: Vec<(&str, &ColumnType)> = schema.iter().map(|(k, v)| (k.as_str(), v)).collect();
        assert_eq!(
            columns,
            vec![
                ("id", &ColumnType::IntegerPrimaryKey),
                ("name", &ColumnType::Text),
                ("age", &ColumnType::Numeric),
                ("stuff", &ColumnType::Text),
            ]
        );
    }

    #[test]
    fn test_upsert_creates_table() {
        let conn = Connection::open_in_memory().unwrap();
        let id = upsert(&conn, "pets", &record! { "name" => "Rex", "legs" => 4 }, true).unwrap();
        assert_eq!(id, 1);
        let schema = read_schema(&conn, "pets").unwrap();
        assert_eq!(schema.get("legs"), Some(&ColumnType::Numeric));
    }

    #[test]
    fn test_partial_update_merges() {
        let conn = Connection::open_in_memory().unwrap();
        let id = upsert(&conn, "people", &record! { "name" => "Ted", "email" => "ted@example.com", "age" => 22 }, false).unwrap();
        let same = upsert(&conn, "people", &record! { "id" => id, "age" => 23, "city" => "Leeds" }, false).unwrap();
        assert_eq!(same, id);

        let row = fetch_row(&conn, "people", id).unwrap().unwrap();
        assert_eq!(row["name"], Value::from("Ted"));
        assert_eq!(row["email"], Value::from("ted@example.com"));
        assert_eq!(row["age"], Value::Integer(23));
        assert_eq!(row["city"], Value::from("Leeds"));
    }

    #[test]
    fn test_explicit_id_inserts_when_absent() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(upsert(&conn, "t", &record! { "id" => 40, "v" => "x" }, false).unwrap(), 40);
        assert_eq!(upsert(&conn, "t", &record! { "v" => "y" }, false).unwrap(), 41);
        assert_eq!(upsert(&conn, "t", &record! { "id" => "7", "v" => "z" }, false).unwrap(), 7);
    }

    #[test]
    fn test_invalid_identifiers_rejected_before_write() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            upsert(&conn, "bad table", &record! { "v" => 1 }, false),
            Err(SqliteError::Schema(SchemaError::Validation { kind: "table", .. }))
        ));
        assert!(matches!(
            upsert(&conn, "t", &record! { "v; DROP TABLE t" => 1 }, false),
            Err(SqliteError::Schema(SchemaError::Validation { kind: "column", .. }))
        ));
        assert!(!table_exists(&conn, "t").unwrap());
    }

    #[test]
    fn test_batch_rolls_back_on_failure() {
        let conn = Connection::open_in_memory().unwrap();
        create_table(&conn, "t", &Schema::new()).unwrap();
        add_column(&conn, "t", "v", &ColumnType::Text).unwrap();

        let records = vec![record! { "v" => "a" }, record! { "v" => "b" }, record! { "w" => "c" }];
        assert!(upsert_batch(&conn, "t", &records, true).is_err());
        assert_eq!(crate::catalog::count_rows(&conn, "t").unwrap(), 0);
        assert!(conn.is_autocommit());

        let ids = upsert_batch(&conn, "t", &records, false).unwrap();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_field_names_fold_onto_stored_columns() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(upsert(&conn, "t", &record! { "name" => "a" }, false).unwrap(), 1);

        assert_eq!(upsert(&conn, "t", &record! { "ID" => 1, "Name" => "c" }, false).unwrap(), 1);
        assert_eq!(fetch_row(&conn, "t", 1).unwrap().unwrap(), record! { "id" => 1, "name" => "c" });

        assert_eq!(upsert(&conn, "T", &record! { "NAME" => "b", "extra" => 1, "Extra" => 2 }, false).unwrap(), 2);
        let schema = read_schema(&conn, "t").unwrap();
        assert_eq!(schema.keys().collect::<Vec<_>>(), vec!["id", "name", "extra"]);
        assert_eq!(fetch_row(&conn, "t", 2).unwrap().unwrap(), record! { "id" => 2, "name" => "b", "extra" => 2 });
    }

    #[test]
    fn test_stored_row_zero_keeps_its_id() {
        let conn = Connection::open_in_memory().unwrap();
        create_table(&conn, "t", &Schema::new()).unwrap();

        assert_eq!(upsert_stored(&conn, "t", &record! { "id" => 0, "v" => "zero" }).unwrap(), 0);
        assert_eq!(upsert_stored(&conn, "t", &record! { "id" => 1, "v" => "one" }).unwrap(), 1);
        assert_eq!(upsert_stored(&conn, "t", &record! { "v" => "new" }).unwrap(), 2);
        assert_eq!(fetch_row(&conn, "t", 0).unwrap().unwrap()["v"], Value::from("zero"));
        assert_eq!(crate::catalog::count_rows(&conn, "t").unwrap(), 3);

        // Through a plain upsert the same record asks for a fresh id
        assert_eq!(upsert(&conn, "t", &record! { "id" => 0, "v" => "fresh" }, false).unwrap(), 3);
    }
}
