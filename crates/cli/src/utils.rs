use chrono::{DateTime, Utc};

/// Human-readable distance between `at` and `now`, e.g. "3 minutes ago".
#[must_use]
pub fn format_relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let total_seconds = (now - at).num_seconds();

    if total_seconds < 0 {
        "in the future".to_string()
    } else if total_seconds < 60 {
        "just now".to_string()
    } else if total_seconds < 3600 {
        let minutes = total_seconds / 60;
        format!("{} minute{} ago", minutes, if minutes == 1 { "" } else { "s" })
    } else if total_seconds < 86400 {
        let hours = total_seconds / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else {
        let days = total_seconds / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    }
}

/// Formats milliseconds as seconds with one decimal, dropping a trailing `.0`.
#[must_use]
pub fn format_millis(ms: i64) -> String {
    if ms % 1000 == 0 {
        format!("{}s", ms / 1000)
    } else {
        #[allow(clippy::cast_precision_loss)]
        let secs = ms as f64 / 1000.0;
        format!("{secs:.1}s")
    }
}
