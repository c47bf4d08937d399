use rusqlite::{params, Connection, ErrorCode};
use std::path::{Path, PathBuf};

use super::{SnapshotStore, StoredSnapshot};
use crate::collection::Collection;
use crate::error::{Error, Result};

/// Default database path (~/.local/share/pcdrift/pcdrift.db or platform equivalent)
pub fn default_db_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "pcdrift").ok_or_else(|| {
        Error::Configuration("could not determine the platform data directory".to_string())
    })?;
    Ok(dirs.data_dir().join("pcdrift.db"))
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS snapshots (
            captured_at INTEGER PRIMARY KEY,
            collection TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

/// SQLite-backed snapshot log.
///
/// Holds only the database path. Each operation opens its own connection
/// and drops it before returning.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SqliteStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection> {
        Connection::open(&self.path).map_err(|e| self.unavailable(e))
    }

    /// Like [`SnapshotStore::load_since`], but a database that was never
    /// created reads as empty and is not created by the call.
    pub fn load_existing_since(&self, cutoff: i64) -> Result<Vec<StoredSnapshot>> {
        if !self.path.is_file() {
            return Ok(Vec::new());
        }
        self.initialize()?;
        self.load_since(cutoff)
    }

    fn unavailable(&self, reason: impl std::fmt::Display) -> Error {
        Error::StorageUnavailable {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl SnapshotStore for SqliteStore {
    fn initialize(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| self.unavailable(format!("{}: {e}", parent.display())))?;
        }

        let conn = self.open()?;
        init_schema(&conn).map_err(|e| self.unavailable(e))?;
        tracing::debug!(path = %self.path.display(), "snapshot store ready");
        Ok(())
    }

    fn append(&self, collection: &Collection, captured_at: i64) -> Result<()> {
        let body = collection.to_canonical_json()?;
        let conn = self.open()?;

        match conn.execute(
            "INSERT INTO snapshots (captured_at, collection) VALUES (?1, ?2)",
            params![captured_at, body],
        ) {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(Error::DuplicateTimestamp(captured_at))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn load_since(&self, cutoff: i64) -> Result<Vec<StoredSnapshot>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT captured_at, collection
             FROM snapshots
             WHERE captured_at >= ?1
             ORDER BY captured_at DESC",
        )?;

        let snapshots = stmt
            .query_map(params![cutoff], |row| {
                Ok(StoredSnapshot {
                    captured_at: row.get(0)?,
                    body: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(snapshots)
    }

    fn delete_before(&self, cutoff: i64) -> Result<usize> {
        let conn = self.open()?;
        let removed = conn.execute("DELETE FROM snapshots WHERE captured_at < ?1", params![cutoff])?;
        Ok(removed)
    }
}
