use super::SnapshotStore;
use crate::error::Result;
use crate::util;

pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Delete snapshots older than `horizon_days` before `now`.
pub fn purge(store: &dyn SnapshotStore, horizon_days: u32, now: i64) -> Result<usize> {
    let cutoff = util::days_before(now, horizon_days);
    let removed = store.delete_before(cutoff)?;
    if removed > 0 {
        tracing::info!(removed, cutoff, "purged expired snapshots");
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use crate::store::MemoryStore;
    use crate::util::SECS_PER_DAY;

    #[test]
    fn purges_only_beyond_horizon() {
        let store = MemoryStore::new();
        let now = 100 * SECS_PER_DAY;
        let empty = Collection::new();

        store.append(&empty, now - 31 * SECS_PER_DAY).unwrap();
        store.append(&empty, now - 30 * SECS_PER_DAY).unwrap();
        store.append(&empty, now - SECS_PER_DAY).unwrap();

        assert_eq!(purge(&store, 30, now).unwrap(), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(purge(&store, 30, now).unwrap(), 0);
    }

    #[test]
    fn zero_horizon_clears_everything_older_than_now() {
        let store = MemoryStore::new();
        let empty = Collection::new();
        store.append(&empty, 10).unwrap();
        store.append(&empty, 20).unwrap();

        assert_eq!(purge(&store, 0, 20).unwrap(), 1);
        assert_eq!(store.len(), 1);
    }
}
