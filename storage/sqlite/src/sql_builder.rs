//! SQL text for the statements the schema engine issues
//!
//! Every identifier reaching this module has already passed [`sane_name`](tabula_storage_common::sane_name);
//! quoting is still applied so names that collide with SQL keywords (`order`, `group`) work.

use tabula_storage_common::{ColumnType, Record, Schema, Value, ID_COLUMN};

use crate::value::SqliteValue;

pub fn quote_ident(name: &str) -> String { format!(r#""{}""#, name.replace('"', "\"\"")) }

pub fn create_table(table: &str, schema: &Schema) -> String {
    let columns = schema.iter().map(|(name, ty)| format!("{} {}", quote_ident(name), ty)).collect::<Vec<_>>().join(", ");
    format!("CREATE TABLE IF NOT EXISTS {} ({})", quote_ident(table), columns)
}

pub fn drop_table(table: &str) -> String { format!("DROP TABLE IF EXISTS {}", quote_ident(table)) }

pub fn rename_table(table: &str, new_name: &str) -> String {
    format!("ALTER TABLE {} RENAME TO {}", quote_ident(table), quote_ident(new_name))
}

pub fn add_column(table: &str, column: &str, ty: &ColumnType) -> String {
    format!("ALTER TABLE {} ADD COLUMN {} {}", quote_ident(table), quote_ident(column), ty)
}

pub fn count_rows(table: &str) -> String { format!("SELECT COUNT(*) FROM {}", quote_ident(table)) }

pub fn delete_by_id(table: &str) -> String { format!("DELETE FROM {} WHERE {} = ?", quote_ident(table), quote_ident(ID_COLUMN)) }

/// `predicate` is caller-supplied SQL and is inserted as is.
pub fn delete_where(table: &str, predicate: &str) -> String { format!("DELETE FROM {} WHERE {}", quote_ident(table), predicate) }

/// `INSERT OR REPLACE` for one row.
///
/// `None` binds NULL so SQLite assigns the next rowid. The `id` field of `fields` is ignored.
pub fn insert_or_replace(table: &str, id: Option<i64>, fields: &Record) -> (String, Vec<SqliteValue>) {
    let mut columns = Vec::with_capacity(fields.len() + 1);
    let mut params = Vec::with_capacity(fields.len() + 1);

    columns.push(quote_ident(ID_COLUMN));
    params.push(SqliteValue(id.map_or(Value::Null, Value::Integer)));

    for (name, value) in fields.iter().filter(|(name, _)| name.as_str() != ID_COLUMN) {
        columns.push(quote_ident(name));
        params.push(SqliteValue(value.clone()));
    }

    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!("INSERT OR REPLACE INTO {} ({}) VALUES ({})", quote_ident(table), columns.join(", "), placeholders);
    (sql, params)
}

/// SQL builder for row reads
pub struct SqlBuilder {
    sql: String,
    params: Vec<rusqlite::types::Value>,
    table_name: String,
    order_by: Option<String>,
    limit: Option<u64>,
    offset: u64,
}

impl SqlBuilder {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self { sql: String::new(), params: Vec::new(), table_name: table_name.into(), order_by: None, limit: None, offset: 0 }
    }

    /// Restrict to the row with this id.
    pub fn where_id(&mut self, id: i64) -> &mut Self {
        self.push_sql(&format!("{} = ", quote_ident(ID_COLUMN)));
        self.push_param(rusqlite::types::Value::Integer(id));
        self
    }

    pub fn order_by(&mut self, column: impl Into<String>) -> &mut Self {
        self.order_by = Some(column.into());
        self
    }

    pub fn limit(&mut self, limit: Option<u64>) -> &mut Self {
        self.limit = limit;
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = offset;
        self
    }

    fn push_sql(&mut self, s: &str) { self.sql.push_str(s); }

    fn push_param(&mut self, value: rusqlite::types::Value) {
        self.sql.push('?');
        self.params.push(value);
    }

    /// Produce `SELECT * FROM ...` and its parameters
    pub fn build(self) -> (String, Vec<rusqlite::types::Value>) {
        let mut sql = format!("SELECT * FROM {}", quote_ident(&self.table_name));
        if !self.sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.sql);
        }
        if let Some(order_by) = &self.order_by {
            sql.push_str(&format!(" ORDER BY {}", quote_ident(order_by)));
        }
        // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded
        match (self.limit, self.offset) {
            (Some(limit), 0) => sql.push_str(&format!(" LIMIT {}", limit)),
            (Some(limit), offset) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
            (None, 0) => {}
            (None, offset) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
        }

        (sql, self.params)
    }
}
