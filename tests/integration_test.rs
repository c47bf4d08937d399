use pcdrift::cycle::{self, CycleOptions, Source};
use pcdrift::store::{SnapshotStore, SqliteStore};
use pcdrift::util::SECS_PER_DAY;
use pcdrift::{Collection, Error, Result};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Replays a fixed sequence of API responses, one per cycle.
struct Replay {
    responses: Vec<Result<Value>>,
}

impl Source for Replay {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn fetch(&mut self) -> Result<Collection> {
        let body = self.responses.remove(0)?;
        let Value::Array(records) = body else {
            return Err(Error::Fetch("expected a JSON array".into()));
        };
        Collection::from_records(records, "appName")
    }
}

const DAY0: i64 = 19_000 * SECS_PER_DAY;

#[test]
fn tracks_pipeline_changes_across_runs() {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::new(dir.path().join("states.db"));
    let mut source = Replay {
        responses: vec![
            Ok(json!([
                {"appName": "svc-a", "tool": "jenkins"},
                {"appName": "svc-b", "tool": "circleci"},
            ])),
            Ok(json!([
                {"appName": "svc-a", "tool": "github-actions"},
                {"appName": "svc-c", "tool": "circleci"},
            ])),
        ],
    };

    let first = cycle::run_at(&store, &mut source, CycleOptions::default(), DAY0).unwrap();
    assert!(first.stored);
    assert!(first.comparisons.is_empty());

    let second = cycle::run_at(&store, &mut source, CycleOptions::default(), DAY0 + SECS_PER_DAY).unwrap();
    assert_eq!(second.comparisons.len(), 1);

    let diff = &second.comparisons[0].diff;
    assert_eq!(second.comparisons[0].since, DAY0);
    assert_eq!(diff.added, vec!["svc-c"]);
    assert_eq!(diff.removed, vec!["svc-b"]);
    assert_eq!(diff.modified, vec!["svc-a"]);

    assert_eq!(store.load_since(i64::MIN).unwrap().len(), 2);
}

#[test]
fn failed_fetch_leaves_history_untouched() {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::new(dir.path().join("states.db"));
    let mut source = Replay {
        responses: vec![
            Ok(json!([{"appName": "svc-a", "tool": "jenkins"}])),
            Err(Error::Fetch("HTTP 403 Forbidden".into())),
            Ok(json!([])),
        ],
    };

    cycle::run_at(&store, &mut source, CycleOptions::default(), DAY0).unwrap();
    let failed = cycle::run_at(&store, &mut source, CycleOptions::default(), DAY0 + 60).unwrap();
    let empty = cycle::run_at(&store, &mut source, CycleOptions::default(), DAY0 + 120).unwrap();

    assert!(!failed.has_data());
    assert!(!empty.has_data());
    assert!(failed.comparisons.is_empty() && empty.comparisons.is_empty());

    let stamps: Vec<i64> = store.load_since(i64::MIN).unwrap().iter().map(|s| s.captured_at).collect();
    assert_eq!(stamps, vec![DAY0]);
}

#[test]
fn retention_expires_old_snapshots_between_runs() {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::new(dir.path().join("states.db"));
    let record = || Ok(json!([{"appName": "svc-a", "tool": "jenkins"}]));
    let mut source = Replay {
        responses: vec![record(), record(), record()],
    };
    let options = CycleOptions {
        lookback_days: 7,
        retention_days: 30,
    };

    cycle::run_at(&store, &mut source, options, DAY0).unwrap();
    cycle::run_at(&store, &mut source, options, DAY0 + 20 * SECS_PER_DAY).unwrap();
    let last = cycle::run_at(&store, &mut source, options, DAY0 + 31 * SECS_PER_DAY).unwrap();

    assert_eq!(last.purged, Some(1));
    // the day-20 snapshot is outside the 7 day window
    assert!(last.comparisons.is_empty());
    assert_eq!(store.load_since(i64::MIN).unwrap().len(), 2);
}

#[test]
fn malformed_inventory_is_fatal_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::new(dir.path().join("states.db"));
    let mut source = Replay {
        responses: vec![Ok(json!([{"tool": "jenkins"}]))],
    };

    let err = cycle::run_at(&store, &mut source, CycleOptions::default(), DAY0).unwrap_err();
    assert!(matches!(err, Error::MalformedRecord { index: 0, .. }));
    assert!(store.load_since(i64::MIN).unwrap().is_empty());
}
