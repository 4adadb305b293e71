//! Store handles: one SQLite connection each, shared behind a mutex

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rusqlite::Connection;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::SqliteError;
use crate::transaction;

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Where the database lives
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqliteLocation {
    /// File-based database
    File(PathBuf),
    /// In-memory database (for testing)
    Memory,
}

/// SQLite journal mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    /// Rollback journal, removed on commit. Keeps the database in a single file, which
    /// `move_database` and `delete_database` rely on.
    #[default]
    Delete,
    Wal,
}

impl JournalMode {
    pub const fn pragma_value(self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Wal => "WAL",
        }
    }
}

/// SQLite synchronous mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Full,
    #[default]
    Normal,
}

impl SyncMode {
    pub const fn pragma_value(self) -> &'static str {
        match self {
            SyncMode::Full => "FULL",
            SyncMode::Normal => "NORMAL",
        }
    }
}

/// Configuration for a store connection
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SqliteConfig {
    pub location: SqliteLocation,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default)]
    pub journal_mode: JournalMode,
    #[serde(default)]
    pub synchronous: SyncMode,
    /// Open a transaction as soon as the store is opened. It stays open until the caller
    /// commits or rolls back, or is committed when the store closes.
    #[serde(default)]
    pub auto_transaction: bool,
}

const fn default_busy_timeout_ms() -> u64 { DEFAULT_BUSY_TIMEOUT_MS }

impl SqliteConfig {
    pub fn new(location: SqliteLocation) -> Self {
        Self {
            location,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: JournalMode::default(),
            synchronous: SyncMode::default(),
            auto_transaction: false,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self { Self::new(SqliteLocation::File(path.into())) }

    pub fn memory() -> Self { Self::new(SqliteLocation::Memory) }

    fn create_connection(&self) -> Result<Connection, SqliteError> {
        let conn = match &self.location {
            SqliteLocation::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(tabula_storage_common::SchemaError::Io)?;
                }
                Connection::open(path)?
            }
            SqliteLocation::Memory => Connection::open_in_memory()?,
        };

        conn.busy_timeout(Duration::from_millis(self.busy_timeout_ms))?;
        conn.execute_batch(&format!(
            "PRAGMA journal_mode={};
             PRAGMA synchronous={};
             PRAGMA temp_store=MEMORY;",
            self.journal_mode.pragma_value(),
            self.synchronous.pragma_value()
        ))?;

        // journal_mode cannot change inside a transaction, so this comes last
        if self.auto_transaction {
            transaction::begin(&conn)?;
        }

        Ok(conn)
    }
}

struct StoreInner {
    conn: Mutex<Connection>,
    config: SqliteConfig,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        // A transaction left open by the caller is committed rather than discarded
        let conn = self.conn.get_mut();
        if !conn.is_autocommit() {
            debug!("Committing open transaction on store close");
            if let Err(e) = conn.execute_batch("COMMIT") {
                warn!("Failed to commit open transaction on store close: {}", e);
            }
        }
    }
}

/// Handle to one open database.
///
/// Clones share the same connection. The connection's transaction state is the only
/// mutable state behind the handle; schema and rows are always read from the database.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("Store").field("config", &self.inner.config).finish() }
}

impl Store {
    /// Open (creating if needed) a store with the given configuration
    pub async fn connect(config: SqliteConfig) -> Result<Self, SqliteError> {
        let conn = {
            let config = config.clone();
            tokio::task::spawn_blocking(move || config.create_connection()).await.map_err(|e| SqliteError::TaskJoin(e.to_string()))??
        };
        debug!("Opened store {:?}", config.location);
        Ok(Self { inner: Arc::new(StoreInner { conn: Mutex::new(conn), config }) })
    }

    /// Open a file-based database, creating the file if it does not exist
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SqliteError> { Self::connect(SqliteConfig::file(path.as_ref())).await }

    /// Open an in-memory database (for testing)
    pub async fn open_in_memory() -> Result<Self, SqliteError> { Self::connect(SqliteConfig::memory()).await }

    pub fn config(&self) -> &SqliteConfig { &self.inner.config }

    /// Path of the database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        match &self.inner.config.location {
            SqliteLocation::File(path) => Some(path),
            SqliteLocation::Memory => None,
        }
    }

    /// Whether both handles address the same connection
    pub fn same_store(&self, other: &Store) -> bool { Arc::ptr_eq(&self.inner, &other.inner) }

    /// Execute a function with the connection
    ///
    /// The closure runs on the blocking pool with the connection locked; the call completes
    /// only once the closure has.
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T, SqliteError>
    where
        F: FnOnce(&Connection) -> Result<T, SqliteError> + Send + 'static,
        T: Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = inner.conn.blocking_lock();
            f(&guard)
        })
        .await
        .map_err(|e| SqliteError::TaskJoin(e.to_string()))?
    }

    /// Execute a function with mutable access to the connection
    pub async fn with_connection_mut<F, T>(&self, f: F) -> Result<T, SqliteError>
    where
        F: FnOnce(&mut Connection) -> Result<T, SqliteError> + Send + 'static,
        T: Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = inner.conn.blocking_lock();
            f(&mut guard)
        })
        .await
        .map_err(|e| SqliteError::TaskJoin(e.to_string()))?
    }

    /// Execute a function with two distinct stores locked at once.
    ///
    /// Locks are always taken in a fixed (address) order, so two copies running in opposite
    /// directions cannot deadlock.
    pub async fn with_connection_pair<F, T>(source: &Store, destination: &Store, f: F) -> Result<T, SqliteError>
    where
        F: FnOnce(&Connection, &mut Connection) -> Result<T, SqliteError> + Send + 'static,
        T: Send + 'static,
    {
        if source.same_store(destination) {
            return Err(tabula_storage_common::SchemaError::InvalidRequest("source and destination are the same store".to_owned()).into());
        }

        let src = source.inner.clone();
        let dst = destination.inner.clone();
        tokio::task::spawn_blocking(move || {
            let (src_guard, mut dst_guard) = if Arc::as_ptr(&src) < Arc::as_ptr(&dst) {
                let s = src.conn.blocking_lock();
                (s, dst.conn.blocking_lock())
            } else {
                let d = dst.conn.blocking_lock();
                (src.conn.blocking_lock(), d)
            };
            f(&src_guard, &mut dst_guard)
        })
        .await
        .map_err(|e| SqliteError::TaskJoin(e.to_string()))?
    }
}
