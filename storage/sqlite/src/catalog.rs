//! Reads of SQLite's own catalog. Nothing here is cached: every call asks the database.

use rusqlite::{Connection, OptionalExtension};
use tabula_storage_common::{check_table_name, ColumnType, Schema, SchemaError, ID_COLUMN};
use tracing::debug;

use crate::error::SqliteError;
use crate::sql_builder::{count_rows as count_rows_sql, quote_ident};

/// The stored spelling of a table name, if the table exists. SQLite matches names without
/// regard to case.
pub fn find_table(conn: &Connection, table: &str) -> Result<Option<String>, SqliteError> {
    let found = conn
        .query_row("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE", [table], |row| row.get(0))
        .optional()?;
    Ok(found)
}

/// Whether a table exists. A failing catalog query is an error, never "does not exist".
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, SqliteError> { Ok(find_table(conn, table)?.is_some()) }

/// Current columns and declared types of a table, in table order.
pub fn read_schema(conn: &Connection, table: &str) -> Result<Schema, SqliteError> {
    check_table_name(table)?;
    let schema_error = |e: rusqlite::Error| SchemaError::SchemaRead { table: table.to_owned(), source: Box::new(e) };

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table))).map_err(schema_error)?;
    let columns = stmt
        .query_map([], |row| {
            let name: String = row.get(1)?;
            let declared: String = row.get(2)?;
            let pk: i64 = row.get(5)?;
            Ok((name, declared, pk))
        })
        .map_err(schema_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(schema_error)?;

    if columns.is_empty() {
        return Err(SchemaError::SchemaRead { table: table.to_owned(), source: format!("no such table: {}", table).into() }.into());
    }

    let mut schema = Schema::with_capacity(columns.len());
    for (name, declared, pk) in columns {
        let ty = if name == ID_COLUMN && pk > 0 && declared.eq_ignore_ascii_case("INTEGER") {
            ColumnType::IntegerPrimaryKey
        } else if declared.trim().is_empty() {
            // No declared type means no affinity, which is what BLOB declares
            ColumnType::Blob
        } else {
            ColumnType::parse(&declared)?
        };
        schema.insert(name, ty);
    }

    debug!("read_schema({}): {:?}", table, schema);
    Ok(schema)
}

/// Names of the user tables in the database, in creation order.
pub fn list_tables(conn: &Connection) -> Result<Vec<String>, SqliteError> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY rowid")?;
    let tables = stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<String>, _>>()?;
    Ok(tables)
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<u64, SqliteError> {
    check_table_name(table)?;
    let count: i64 = conn.query_row(&count_rows_sql(table), [], |row| row.get(0))?;
    Ok(count as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"CREATE TABLE "people" ("id" INTEGER PRIMARY KEY, "name" TEXT, "age" NUMERIC, "photo" BLOB, "code" VARCHAR(8), "misc");
               INSERT INTO "people" ("name") VALUES ('Ted'), ('Jan');"#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_read_schema() {
        let schema = read_schema(&conn(), "people").unwrap();
        let columns: Vec<(&str, &ColumnType)> = schema.iter().map(|(k, v)| (k.as_str(), v)).collect();
        assert_eq!(
            columns,
            vec![
                ("id", &ColumnType::IntegerPrimaryKey),
                ("name", &ColumnType::Text),
                ("age", &ColumnType::Numeric),
                ("photo", &ColumnType::Blob),
                ("code", &ColumnType::Other("VARCHAR(8)".to_owned())),
                ("misc", &ColumnType::Blob),
            ]
        );
    }

    #[test]
    fn test_read_schema_missing_table() {
        let err = read_schema(&conn(), "nobody").unwrap_err();
        assert!(matches!(err, SqliteError::Schema(SchemaError::SchemaRead { .. })), "{err:?}");

        let err = read_schema(&conn(), "bad name").unwrap_err();
        assert!(matches!(err, SqliteError::Schema(SchemaError::Validation { .. })), "{err:?}");
    }

    #[test]
    fn test_table_exists_and_listing() {
        let conn = conn();
        assert!(table_exists(&conn, "people").unwrap());
        assert!(!table_exists(&conn, "nobody").unwrap());
        assert!(table_exists(&conn, "PEOPLE").unwrap());
        assert_eq!(find_table(&conn, "People").unwrap(), Some("people".to_owned()));
        assert_eq!(find_table(&conn, "nobody").unwrap(), None);

        conn.execute_batch(r#"CREATE TABLE "pets" ("id" INTEGER PRIMARY KEY)"#).unwrap();
        assert_eq!(list_tables(&conn).unwrap(), vec!["people".to_owned(), "pets".to_owned()]);
        assert_eq!(count_rows(&conn, "people").unwrap(), 2);
    }
}
