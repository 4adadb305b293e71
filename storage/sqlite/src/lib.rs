//! Schema-flexible record storage on SQLite
//!
//! Records are written without declaring columns first. Tables are created on first write,
//! columns are added as new fields show up, and columns can be renamed or removed later by
//! rebuilding the table. The schema always lives in SQLite's own catalog and is read fresh
//! whenever an operation needs it.
//!
//! - [`SchemaEngine`] is the async entry point; each call runs on the blocking pool.
//! - The modules underneath work on a plain `rusqlite::Connection` and can be used directly.
//!
//! # Example
//!
//! ```rust,ignore
//! use tabula_storage_common::record;
//! use tabula_storage_sqlite::SchemaEngine;
//!
//! let engine = SchemaEngine::open("myapp.db").await?;
//! let id = engine.upsert("people", record! { "name" => "Ted", "age" => 22 }, false).await?;
//! engine.upsert("people", record! { "id" => id, "email" => "ted@example.com" }, false).await?;
//! engine.rename_column("people", "email", "mail").await?;
//! ```

pub mod catalog;
mod connection;
pub mod ddl;
mod engine;
mod error;
mod files;
pub mod rebuild;
pub mod rows;
pub mod sql_builder;
pub mod transaction;
pub mod transfer;
pub mod upsert;
mod value;

pub use connection::{JournalMode, SqliteConfig, SqliteLocation, Store, SyncMode, DEFAULT_BUSY_TIMEOUT_MS};
pub use engine::SchemaEngine;
pub use error::{error_kind, ErrorKind, SqliteError};
pub use files::{delete_database, move_database};
pub use transaction::TransactionScope;
pub use value::{row_to_record, SqliteValue};
