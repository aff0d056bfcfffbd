//! Display strings for run statistics.

use chrono::{DateTime, Utc};

/// Kilometres with two decimals, e.g. `"5.27"`.
pub fn format_distance(km: f64) -> String {
    format!("{km:.2}")
}

/// Minutes per kilometre with two decimals, e.g. `"5.43"`.
pub fn format_pace(pace: f64) -> String {
    format!("{pace:.2}")
}

/// Whole hours and the remaining minutes, rounded.
pub fn split_duration(minutes: f64) -> (i64, i64) {
    let hours = (minutes / 60.0).floor() as i64;
    let mins = (minutes.rem_euclid(60.0)).round() as i64;
    (hours, mins)
}

/// `h:mm:ss` elapsed-time string for the share image.
pub fn format_clock(minutes: f64) -> String {
    let total = (minutes * 60.0).round().max(0.0) as i64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    format!("{h}:{m:02}:{s:02}")
}

/// `YYYY.MM.DD HH:mm:ss` in UTC, or `-` when unknown.
pub fn format_datetime(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(t) => t.format("%Y.%m.%d %H:%M:%S").to_string(),
        None => "-".to_string(),
    }
}
