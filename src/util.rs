pub const SECS_PER_DAY: i64 = 86_400;

/// Current wall clock time in epoch seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// `now` minus a whole number of days, saturating at the epoch range.
pub fn days_before(now: i64, days: u32) -> i64 {
    now.saturating_sub(i64::from(days).saturating_mul(SECS_PER_DAY))
}

/// Render an epoch timestamp in local time, "unknown" when out of range.
pub fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| {
            dt.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
