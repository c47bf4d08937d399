//! Collection comparison engine.
//!
//! Compares a previous collection against the current one:
//! - Matches records by their natural key
//! - Reports keys that were added, removed, or whose record changed
//! - Records are compared by deep equality, never by identity

use serde::Serialize;

use crate::collection::Collection;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    pub fn total(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }
}

/// A diff labeled with the snapshot it was computed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub since: i64,
    pub current: i64,
    #[serde(flatten)]
    pub diff: DiffResult,
}

/// Compare two collections.
///
/// `added` and `modified` follow the iteration order of `current`,
/// `removed` follows the iteration order of `previous`.
pub fn diff(previous: &Collection, current: &Collection) -> DiffResult {
    let mut result = DiffResult::default();

    for (key, record) in current.iter() {
        match previous.get(key) {
            None => result.added.push(key.to_string()),
            Some(old) if old != record => result.modified.push(key.to_string()),
            Some(_) => {}
        }
    }

    result.removed = previous
        .keys()
        .filter(|key| !current.contains_key(key))
        .map(str::to_string)
        .collect();

    result
}
