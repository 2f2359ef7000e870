/// Timestamp formatting utilities — human-readable times and relative ages.
///
/// All internal times are `chrono` values. String formatting only happens
/// at the display boundary.
use chrono::{DateTime, Local};

/// Format a timestamp the way it appears in the inventory table and logs.
pub fn format_timestamp(ts: DateTime<Local>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format how long ago `ts` was relative to `now`, e.g. `"(3 days ago)"`.
///
/// Sub-day ages report hours; sub-hour ages report minutes.
pub fn format_age(ts: DateTime<Local>, now: DateTime<Local>) -> String {
    let delta = now.signed_duration_since(ts);
    if delta.num_seconds() < 0 {
        return "(in the future)".to_string();
    }
    let days = delta.num_days();
    if days >= 1 {
        format!("({} day{} ago)", days, if days == 1 { "" } else { "s" })
    } else if delta.num_hours() >= 1 {
        let h = delta.num_hours();
        format!("({} hour{} ago)", h, if h == 1 { "" } else { "s" })
    } else {
        let m = delta.num_minutes();
        format!("({} min ago)", m)
    }
}
