//! One fetch → persist → compare → retain pass.
//!
//! A cycle keeps no state of its own. Everything it knows about earlier
//! runs comes from the snapshot store, so a crash part way through only
//! costs the remaining comparisons of that run.

use serde::Serialize;

use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::store::diff::{self, Comparison};
use crate::store::{retention, SnapshotStore};
use crate::util;

pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;

/// Where the current collection comes from.
pub trait Source {
    fn name(&self) -> &'static str;

    /// Fetch the current state. [`Error::Fetch`] and an empty collection
    /// both end the cycle with "no data"; any other error aborts it.
    fn fetch(&mut self) -> Result<Collection>;
}

#[derive(Debug, Clone, Copy)]
pub struct CycleOptions {
    pub lookback_days: u32,
    pub retention_days: u32,
}

impl Default for CycleOptions {
    fn default() -> Self {
        CycleOptions {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            retention_days: retention::DEFAULT_RETENTION_DAYS,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CycleReport {
    pub source: &'static str,
    pub captured_at: i64,
    /// None when the source produced nothing.
    pub current: Option<Collection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_data_reason: Option<String>,
    pub stored: bool,
    pub comparisons: Vec<Comparison>,
    /// Snapshots in the window that could not be decoded.
    pub unreadable: Vec<i64>,
    /// None when retention failed.
    pub purged: Option<usize>,
}

impl CycleReport {
    pub fn has_data(&self) -> bool {
        self.current.is_some()
    }
}

/// Run a cycle stamped with the current wall clock.
pub fn run(store: &dyn SnapshotStore, source: &mut dyn Source, options: CycleOptions) -> Result<CycleReport> {
    run_at(store, source, options, util::unix_now())
}

pub fn run_at(
    store: &dyn SnapshotStore,
    source: &mut dyn Source,
    options: CycleOptions,
    now: i64,
) -> Result<CycleReport> {
    store.initialize()?;

    let mut report = CycleReport {
        source: source.name(),
        captured_at: now,
        current: None,
        no_data_reason: None,
        stored: false,
        comparisons: Vec::new(),
        unreadable: Vec::new(),
        purged: None,
    };

    match source.fetch() {
        Ok(current) if current.is_empty() => {
            tracing::warn!(source = report.source, "source returned no records");
            report.no_data_reason = Some("no records returned".to_string());
        }
        Ok(current) => {
            compare_against_history(store, &current, options.lookback_days, &mut report)?;
            report.current = Some(current);
        }
        Err(Error::Fetch(reason)) => {
            tracing::warn!(source = report.source, %reason, "fetch failed");
            report.no_data_reason = Some(reason);
        }
        Err(e) => return Err(e),
    }

    report.purged = match retention::purge(store, options.retention_days, now) {
        Ok(removed) => Some(removed),
        Err(e) => {
            tracing::warn!(error = %e, "retention purge failed");
            None
        }
    };

    Ok(report)
}

fn compare_against_history(
    store: &dyn SnapshotStore,
    current: &Collection,
    lookback_days: u32,
    report: &mut CycleReport,
) -> Result<()> {
    let now = report.captured_at;

    match store.append(current, now) {
        Ok(()) => {
            report.stored = true;
            tracing::debug!(captured_at = now, records = current.len(), "snapshot stored");
        }
        Err(e) if e.is_recoverable() => {
            tracing::warn!(error = %e, "snapshot not stored, keeping the earlier one");
        }
        Err(e) => return Err(e),
    }

    let history = store.load_since(util::days_before(now, lookback_days))?;

    for snapshot in history {
        // the row this cycle just wrote is the current state itself
        if report.stored && snapshot.captured_at == now {
            continue;
        }

        let previous = match snapshot.collection() {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable snapshot");
                report.unreadable.push(snapshot.captured_at);
                continue;
            }
        };

        report.comparisons.push(Comparison {
            since: snapshot.captured_at,
            current: now,
            diff: diff::diff(&previous, current),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::util::SECS_PER_DAY;
    use serde_json::json;

    struct Fixed(Result<Collection>);

    impl Source for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn fetch(&mut self) -> Result<Collection> {
            std::mem::replace(&mut self.0, Err(Error::Fetch("already fetched".into())))
        }
    }

    fn tools(pairs: &[(&str, &str)]) -> Collection {
        pairs
            .iter()
            .map(|(app, tool)| {
                let record = json!({"appName": app, "tool": tool});
                (app.to_string(), record.as_object().cloned().unwrap())
            })
            .collect()
    }

    const NOW: i64 = 1_000 * SECS_PER_DAY;

    #[test]
    fn first_run_stores_and_has_nothing_to_compare() {
        let store = MemoryStore::new();
        let mut source = Fixed(Ok(tools(&[("svc-a", "jenkins")])));

        let report = run_at(&store, &mut source, CycleOptions::default(), NOW).unwrap();
        assert!(report.has_data());
        assert!(report.stored);
        assert!(report.comparisons.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn compares_against_every_snapshot_in_window() {
        let store = MemoryStore::new();
        store.append(&tools(&[("svc-a", "jenkins"), ("svc-b", "circleci")]), NOW - 6 * SECS_PER_DAY).unwrap();
        store.append(&tools(&[("svc-a", "github-actions")]), NOW - SECS_PER_DAY).unwrap();
        store.append(&tools(&[("old", "jenkins")]), NOW - 8 * SECS_PER_DAY).unwrap();

        let mut source = Fixed(Ok(tools(&[("svc-a", "github-actions"), ("svc-c", "circleci")])));
        let report = run_at(&store, &mut source, CycleOptions::default(), NOW).unwrap();

        let anchors: Vec<i64> = report.comparisons.iter().map(|c| c.since).collect();
        assert_eq!(anchors, vec![NOW - SECS_PER_DAY, NOW - 6 * SECS_PER_DAY]);

        let recent = &report.comparisons[0].diff;
        assert_eq!(recent.added, vec!["svc-c"]);
        assert!(recent.removed.is_empty());
        assert!(recent.modified.is_empty());

        let week_old = &report.comparisons[1].diff;
        assert_eq!(week_old.added, vec!["svc-c"]);
        assert_eq!(week_old.removed, vec!["svc-b"]);
        assert_eq!(week_old.modified, vec!["svc-a"]);
    }

    #[test]
    fn no_data_writes_nothing_but_still_purges() {
        let store = MemoryStore::new();
        store.append(&tools(&[("old", "jenkins")]), NOW - 40 * SECS_PER_DAY).unwrap();

        let mut source = Fixed(Ok(Collection::new()));
        let report = run_at(&store, &mut source, CycleOptions::default(), NOW).unwrap();

        assert!(!report.has_data());
        assert!(!report.stored);
        assert!(report.comparisons.is_empty());
        assert_eq!(report.purged, Some(1));
        assert!(store.is_empty());
    }

    #[test]
    fn fetch_failure_is_reported_as_no_data() {
        let store = MemoryStore::new();
        let mut source = Fixed(Err(Error::Fetch("HTTP 500".into())));

        let report = run_at(&store, &mut source, CycleOptions::default(), NOW).unwrap();
        assert!(!report.has_data());
        assert_eq!(report.no_data_reason.as_deref(), Some("HTTP 500"));
        assert!(store.is_empty());
    }

    #[test]
    fn malformed_records_abort_the_cycle() {
        let store = MemoryStore::new();
        let mut source = Fixed(Err(Error::MalformedRecord {
            index: 0,
            reason: "missing 'appName'".into(),
        }));

        let err = run_at(&store, &mut source, CycleOptions::default(), NOW).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn same_second_collision_keeps_earlier_row_and_compares_with_it() {
        let store = MemoryStore::new();
        store.append(&tools(&[("svc-a", "jenkins")]), NOW).unwrap();

        let mut source = Fixed(Ok(tools(&[("svc-a", "circleci")])));
        let report = run_at(&store, &mut source, CycleOptions::default(), NOW).unwrap();

        assert!(!report.stored);
        assert_eq!(report.comparisons.len(), 1);
        assert_eq!(report.comparisons[0].diff.modified, vec!["svc-a"]);

        let kept = store.load_since(NOW).unwrap();
        assert_eq!(kept[0].collection().unwrap(), tools(&[("svc-a", "jenkins")]));
    }

    #[test]
    fn unreadable_snapshot_is_skipped() {
        let store = MemoryStore::new();
        store.insert_raw(NOW - 2 * SECS_PER_DAY, "not json");
        store.append(&tools(&[("svc-a", "jenkins")]), NOW - SECS_PER_DAY).unwrap();

        let mut source = Fixed(Ok(tools(&[("svc-a", "jenkins")])));
        let report = run_at(&store, &mut source, CycleOptions::default(), NOW).unwrap();

        assert_eq!(report.unreadable, vec![NOW - 2 * SECS_PER_DAY]);
        assert_eq!(report.comparisons.len(), 1);
        assert!(report.comparisons[0].diff.is_empty());
    }

    #[test]
    fn custom_window_and_horizon() {
        let store = MemoryStore::new();
        store.append(&tools(&[("a", "x")]), NOW - 3 * SECS_PER_DAY).unwrap();
        store.append(&tools(&[("a", "x")]), NOW - 12 * SECS_PER_DAY).unwrap();

        let options = CycleOptions {
            lookback_days: 2,
            retention_days: 10,
        };
        let mut source = Fixed(Ok(tools(&[("a", "y")])));
        let report = run_at(&store, &mut source, options, NOW).unwrap();

        assert!(report.comparisons.is_empty());
        assert_eq!(report.purged, Some(1));
        assert_eq!(store.len(), 2);
    }
}
