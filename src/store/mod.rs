//! Snapshot storage.
//!
//! Persists every fetched collection as one timestamped row:
//! - snapshots: captured_at (primary key), collection (canonical JSON)
//!
//! Supports:
//! - Appending a snapshot (rejecting a second write in the same second)
//! - Loading every snapshot newer than a cutoff, newest first
//! - Deleting snapshots older than a cutoff (retention)
//!
//! Rows are never updated in place.

pub mod diff;
pub mod memory;
pub mod retention;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::collection::Collection;
use crate::error::{Error, Result};

/// One persisted collection, still in its stored text form.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSnapshot {
    pub captured_at: i64,
    pub body: String,
}

impl StoredSnapshot {
    pub fn collection(&self) -> Result<Collection> {
        Collection::from_json(&self.body).map_err(|source| Error::Deserialization {
            captured_at: self.captured_at,
            source,
        })
    }
}

/// Append-only, timestamp-keyed snapshot log.
pub trait SnapshotStore {
    /// Create the backing structure if absent. Safe to call on every run.
    fn initialize(&self) -> Result<()>;

    /// Store `collection` under `captured_at`.
    ///
    /// Fails with [`Error::DuplicateTimestamp`] when a snapshot already
    /// exists at that second; the existing row is left untouched.
    fn append(&self, collection: &Collection, captured_at: i64) -> Result<()>;

    /// Snapshots with `captured_at >= cutoff`, newest first.
    fn load_since(&self, cutoff: i64) -> Result<Vec<StoredSnapshot>>;

    /// Remove snapshots with `captured_at < cutoff`, returning how many went.
    fn delete_before(&self, cutoff: i64) -> Result<usize>;
}
