//! Explicit transactions on a store connection
//!
//! At most one transaction is open per connection; SQLite's autocommit flag is the source of
//! truth for whether one is active, so the state cannot drift from what the database sees.

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::error::SqliteError;

/// Start a transaction unless one is already active. Returns whether this call started it.
pub fn begin(conn: &Connection) -> Result<bool, SqliteError> {
    if !conn.is_autocommit() {
        return Ok(false);
    }
    debug!("BEGIN");
    conn.execute_batch("BEGIN")?;
    Ok(true)
}

/// Commit the active transaction. Returns `false` when there was none.
pub fn commit(conn: &Connection) -> Result<bool, SqliteError> {
    if conn.is_autocommit() {
        return Ok(false);
    }
    debug!("COMMIT");
    conn.execute_batch("COMMIT")?;
    Ok(true)
}

/// Roll back the active transaction. Returns `false` when there was none.
pub fn rollback(conn: &Connection) -> Result<bool, SqliteError> {
    if conn.is_autocommit() {
        return Ok(false);
    }
    debug!("ROLLBACK");
    conn.execute_batch("ROLLBACK")?;
    Ok(true)
}

/// Scope around a batch of writes.
///
/// Joins a transaction the caller already opened, otherwise opens one. Only a scope that opened
/// the transaction commits it; dropping such a scope without [`commit`](Self::commit) rolls back.
pub struct TransactionScope<'c> {
    conn: &'c Connection,
    owned: bool,
    finished: bool,
}

impl<'c> TransactionScope<'c> {
    pub fn begin(conn: &'c Connection) -> Result<Self, SqliteError> {
        let owned = begin(conn)?;
        Ok(Self { conn, owned, finished: false })
    }

    pub fn commit(mut self) -> Result<(), SqliteError> {
        self.finished = true;
        if self.owned {
            commit(self.conn)?;
        }
        Ok(())
    }
}

impl std::ops::Deref for TransactionScope<'_> {
    type Target = Connection;
    fn deref(&self) -> &Connection { self.conn }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        if self.owned && !self.finished {
            if let Err(e) = rollback(self.conn) {
                warn!("Failed to roll back transaction scope: {}", e);
            }
        }
    }
}
