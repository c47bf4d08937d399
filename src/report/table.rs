//! Text rendering for tracking cycles and the snapshot list.
//!
//! Formats output as plain terminal sections:
//! - One "Changes since" block per historical snapshot, newest first
//! - Added, removed and modified keys listed under each block
//! - A closing line with storage and retention results

use crate::collection::Collection;
use crate::cycle::CycleReport;
use crate::store::diff::Comparison;
use crate::util::{format_timestamp, truncate};

pub fn render_cycle(report: &CycleReport, show_records: bool) -> String {
    let Some(current) = &report.current else {
        let reason = report.no_data_reason.as_deref().unwrap_or("no records returned");
        return format!("No pipeline CI files were found ({reason}).\n{}", render_footer(report));
    };

    let mut output = String::new();

    if show_records {
        output.push_str(&render_records(current));
    }

    output.push_str(&format!(
        "{} pipelines captured at {}\n",
        current.len(),
        format_timestamp(report.captured_at)
    ));

    if report.comparisons.is_empty() {
        output.push_str("\nNo earlier snapshots in the lookback window.\n");
    }

    for comparison in &report.comparisons {
        output.push_str(&render_comparison(comparison));
    }

    if !report.unreadable.is_empty() {
        output.push('\n');
        for ts in &report.unreadable {
            output.push_str(&format!("[skipped] snapshot from {} could not be read\n", format_timestamp(*ts)));
        }
    }

    output.push_str(&render_footer(report));
    output
}

pub fn render_comparison(comparison: &Comparison) -> String {
    let diff = &comparison.diff;
    let mut output = format!("\nChanges since {}:\n", format_timestamp(comparison.since));

    if diff.is_empty() {
        output.push_str("  No changes detected.\n");
        return output;
    }

    for (label, keys) in [
        ("Added pipelines", &diff.added),
        ("Removed pipelines", &diff.removed),
        ("Modified pipelines", &diff.modified),
    ] {
        output.push_str(&format!("{label}:\n"));
        for key in keys {
            output.push_str(&format!("  - {key}\n"));
        }
    }

    output
}

fn render_records(current: &Collection) -> String {
    let mut output = String::new();
    for (key, record) in current.iter() {
        let body = serde_json::to_string(record).unwrap_or_default();
        output.push_str(&format!("{:30} {}\n", truncate(key, 30), body));
    }
    output.push('\n');
    output
}

fn render_footer(report: &CycleReport) -> String {
    let mut footer = String::from("\n");
    if report.has_data() && !report.stored {
        footer.push_str("snapshot not stored: one already exists for this second\n");
    }
    match report.purged {
        Some(0) => {}
        Some(n) => footer.push_str(&format!("purged {n} expired snapshot(s)\n")),
        None => footer.push_str("retention purge failed, see log\n"),
    }
    footer
}

/// Snapshot list: one row per stored snapshot, newest first.
pub fn render_snapshot_list(rows: &[(i64, Option<usize>)]) -> String {
    if rows.is_empty() {
        return String::from("No snapshots found. Run 'pcdrift pipelines' to create one.\n");
    }

    let mut output = format!("{:<22} {:>8}\n", "Captured", "Records");
    output.push_str(&"-".repeat(31));
    output.push('\n');

    for (ts, count) in rows {
        let count = count.map_or_else(|| "corrupt".to_string(), |c| c.to_string());
        output.push_str(&format!("{:<22} {:>8}\n", format_timestamp(*ts), count));
    }

    output
}
