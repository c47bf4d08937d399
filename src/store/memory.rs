//! In-memory snapshot log with the same contract as the SQLite store.

use std::cell::RefCell;
use std::collections::BTreeMap;

use super::{SnapshotStore, StoredSnapshot};
use crate::collection::Collection;
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RefCell<BTreeMap<i64, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.borrow().is_empty()
    }

    /// Insert raw text, bypassing serialization. Lets tests plant
    /// snapshots that no longer decode.
    pub fn insert_raw(&self, captured_at: i64, body: impl Into<String>) {
        self.rows.borrow_mut().insert(captured_at, body.into());
    }
}

impl SnapshotStore for MemoryStore {
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn append(&self, collection: &Collection, captured_at: i64) -> Result<()> {
        let body = collection.to_canonical_json()?;
        let mut rows = self.rows.borrow_mut();
        if rows.contains_key(&captured_at) {
            return Err(Error::DuplicateTimestamp(captured_at));
        }
        rows.insert(captured_at, body);
        Ok(())
    }

    fn load_since(&self, cutoff: i64) -> Result<Vec<StoredSnapshot>> {
        Ok(self
            .rows
            .borrow()
            .range(cutoff..)
            .rev()
            .map(|(ts, body)| StoredSnapshot {
                captured_at: *ts,
                body: body.clone(),
            })
            .collect())
    }

    fn delete_before(&self, cutoff: i64) -> Result<usize> {
        let mut rows = self.rows.borrow_mut();
        let kept = rows.split_off(&cutoff);
        let removed = rows.len();
        *rows = kept;
        Ok(removed)
    }
}
