use chrono::{DateTime, SubsecRound, Utc};

/// Current time at millisecond precision, matching what the persisted layout keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Renders a countdown as `m:ss`.
pub fn format_countdown(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
