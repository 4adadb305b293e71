//! Moving and deleting database files
//!
//! Stores opened on the file should be dropped first; SQLite does not follow a renamed file.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tabula_storage_common::SchemaError;
use tracing::{debug, info};

use crate::connection::Store;

/// Files SQLite may keep next to a database
const SIDECAR_SUFFIXES: &[&str] = &["-journal", "-wal", "-shm"];

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Move a database file (and any journal files beside it) and open it at its new location.
///
/// Fails without touching anything when `new` already exists or `old` does not.
pub async fn move_database(old: impl AsRef<Path>, new: impl AsRef<Path>) -> Result<Store, SchemaError> {
    let (old, new) = (old.as_ref(), new.as_ref());
    if tokio::fs::try_exists(new).await? {
        return Err(io::Error::new(io::ErrorKind::AlreadyExists, format!("{} already exists", new.display())).into());
    }
    if !tokio::fs::try_exists(old).await? {
        return Err(io::Error::new(io::ErrorKind::NotFound, format!("{} does not exist", old.display())).into());
    }

    if let Some(parent) = new.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::rename(old, new).await?;
    for suffix in SIDECAR_SUFFIXES {
        let from = sidecar(old, suffix);
        if tokio::fs::try_exists(&from).await? {
            debug!("Moving {}", from.display());
            tokio::fs::rename(&from, sidecar(new, suffix)).await?;
        }
    }

    info!("Moved database {} to {}", old.display(), new.display());
    Ok(Store::open(new).await?)
}

/// Delete a database file and its journal files. Returns `false` when there was no database.
pub async fn delete_database(path: impl AsRef<Path>) -> Result<bool, SchemaError> {
    let path = path.as_ref();
    if !tokio::fs::try_exists(path).await? {
        return Ok(false);
    }

    tokio::fs::remove_file(path).await?;
    for suffix in SIDECAR_SUFFIXES {
        let file = sidecar(path, suffix);
        if tokio::fs::try_exists(&file).await? {
            tokio::fs::remove_file(&file).await?;
        }
    }

    info!("Deleted database {}", path.display());
    Ok(true)
}
