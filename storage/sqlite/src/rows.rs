//! Row reads and deletes

use rusqlite::{params_from_iter, Connection, OptionalExtension};
use tabula_storage_common::{check_column_name, check_table_name, ExportOptions, Record, ID_COLUMN};
use tracing::debug;

use crate::error::SqliteError;
use crate::sql_builder::{self, SqlBuilder};
use crate::value::row_to_record;

fn column_names(stmt: &rusqlite::Statement<'_>) -> Vec<String> { stmt.column_names().into_iter().map(String::from).collect() }

/// The row with the given id, if any.
pub fn fetch_row(conn: &Connection, table: &str, id: i64) -> Result<Option<Record>, SqliteError> {
    check_table_name(table)?;
    let mut builder = SqlBuilder::new(table);
    builder.where_id(id);
    let (sql, params) = builder.build();
    debug!("fetch_row: {}", sql);

    let mut stmt = conn.prepare(&sql)?;
    let columns = column_names(&stmt);
    let row = stmt.query_row(params_from_iter(params.iter()), |row| row_to_record(row, &columns)).optional()?;
    Ok(row)
}

/// Visit every row of a table in id order, returning how many rows were visited.
///
/// Rows are read through a cursor one at a time, so gaps in the id sequence are irrelevant and
/// the table never has to fit in memory.
pub fn for_each_row<F>(conn: &Connection, table: &str, mut f: F) -> Result<u64, SqliteError>
where F: FnMut(Record) -> Result<(), SqliteError> {
    check_table_name(table)?;
    let mut builder = SqlBuilder::new(table);
    builder.order_by(ID_COLUMN);
    let (sql, params) = builder.build();
    debug!("for_each_row: {}", sql);

    let mut stmt = conn.prepare(&sql)?;
    let columns = column_names(&stmt);
    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut visited = 0;
    while let Some(row) = rows.next()? {
        f(row_to_record(row, &columns)?)?;
        visited += 1;
    }
    Ok(visited)
}

/// A window of rows, as used by paginated export.
pub fn select_page(conn: &Connection, table: &str, options: &ExportOptions) -> Result<Vec<Record>, SqliteError> {
    check_table_name(table)?;
    check_column_name(&options.order_by)?;
    let mut builder = SqlBuilder::new(table);
    builder.order_by(options.order_by.as_str()).limit(options.limit).offset(options.offset);
    let (sql, params) = builder.build();
    debug!("select_page: {}", sql);

    let mut stmt = conn.prepare(&sql)?;
    let columns = column_names(&stmt);
    let records = stmt.query_map(params_from_iter(params.iter()), |row| row_to_record(row, &columns))?.collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Run an arbitrary statement and collect whatever rows it produces.
pub fn query_records(conn: &Connection, sql: &str) -> Result<Vec<Record>, SqliteError> {
    debug!("query: {}", sql);
    let mut stmt = conn.prepare(sql)?;
    let columns = column_names(&stmt);
    let records = stmt.query_map([], |row| row_to_record(row, &columns))?.collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Delete the row with the given id. Returns whether a row was removed.
pub fn delete_row(conn: &Connection, table: &str, id: i64) -> Result<bool, SqliteError> {
    check_table_name(table)?;
    let sql = sql_builder::delete_by_id(table);
    debug!("delete_row: {}", sql);
    Ok(conn.execute(&sql, [id])? > 0)
}

/// Delete every row matching a raw SQL predicate, returning how many were removed.
pub fn delete_where(conn: &Connection, table: &str, predicate: &str) -> Result<usize, SqliteError> {
    check_table_name(table)?;
    if predicate.trim().is_empty() {
        return Err(tabula_storage_common::SchemaError::InvalidRequest("empty delete predicate".to_owned()).into());
    }
    let sql = sql_builder::delete_where(table, predicate);
    debug!("delete_where: {}", sql);
    Ok(conn.execute(&sql, [])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_storage_common::Value;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"CREATE TABLE "t" ("id" INTEGER PRIMARY KEY, "name" TEXT);
               INSERT INTO "t" ("id", "name") VALUES (1, 'a'), (5, 'b'), (40, 'c'), (41, 'd');"#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_fetch_row() {
        let conn = conn();
        let row = fetch_row(&conn, "t", 5).unwrap().unwrap();
        assert_eq!(row.get("name"), Some(&Value::from("b")));
        assert!(fetch_row(&conn, "t", 2).unwrap().is_none());
    }

    #[test]
    fn test_for_each_row_ignores_id_gaps() {
        let conn = conn();
        let mut ids = Vec::new();
        let visited = for_each_row(&conn, "t", |row| {
            ids.push(row["id"].as_row_id());
            Ok(())
        })
        .unwrap();
        assert_eq!(visited, 4);
        assert_eq!(ids, vec![1, 5, 40, 41]);
    }

    #[test]
    fn test_select_page() {
        let conn = conn();
        let page = select_page(&conn, "t", &ExportOptions::page(1, 2)).unwrap();
        let names: Vec<&Value> = page.iter().map(|r| &r["name"]).collect();
        assert_eq!(names, vec![&Value::from("b"), &Value::from("c")]);

        let page = select_page(&conn, "t", &ExportOptions::default().order_by("name")).unwrap();
        assert_eq!(page.len(), 4);
        assert!(select_page(&conn, "t", &ExportOptions::default().order_by("name; --")).is_err());
    }

    #[test]
    fn test_query_records() {
        let rows = query_records(&conn(), "SELECT name, id * 2 AS twice FROM t WHERE id > 5 ORDER BY id").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["twice"], Value::Integer(80));
        assert!(query_records(&conn(), "SELECT * FROM nowhere").is_err());
    }

    #[test]
    fn test_deletes() {
        let conn = conn();
        assert!(delete_row(&conn, "t", 5).unwrap());
        assert!(!delete_row(&conn, "t", 5).unwrap());
        assert_eq!(delete_where(&conn, "t", "id >= 40").unwrap(), 2);
        assert!(delete_where(&conn, "t", "  ").is_err());
        assert!(fetch_row(&conn, "t", 1).unwrap().is_some());
    }
}
