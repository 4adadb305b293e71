use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::schema::Schema;
use crate::value::{Record, ID_COLUMN};

/// Serialized form of one table: its schema and every row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDump {
    pub schema: Schema,
    pub data: Vec<Record>,
}

impl TableDump {
    /// A dump with no schema describes a table that did not exist when exported.
    pub fn is_empty(&self) -> bool { self.schema.is_empty() && self.data.is_empty() }
}

/// Table name to table dump, for whole-database export and import.
pub type DatabaseDump = IndexMap<String, TableDump>;

/// Row window for a paginated table export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub order_by: String,
    pub offset: u64,
    pub limit: Option<u64>,
}

impl Default for ExportOptions {
    fn default() -> Self { Self { order_by: ID_COLUMN.to_owned(), offset: 0, limit: None } }
}

impl ExportOptions {
    pub fn page(offset: u64, limit: u64) -> Self { Self { offset, limit: Some(limit), ..Default::default() } }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by = column.into();
        self
    }
}
