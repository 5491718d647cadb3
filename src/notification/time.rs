use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// Hours added to every server timestamp before it is displayed.
///
/// The API emits naive wall-clock strings in UTC; users read times in UTC+9.
/// The shift is unconditional, so a change in the server's convention breaks
/// every rendered time. It belongs to the server contract, not to this client.
pub const SERVER_CLOCK_OFFSET_HOURS: i64 = 9;

/// Wall clock a naive server timestamp shows in the display zone.
pub fn display_wall_clock(created_at: NaiveDateTime) -> NaiveDateTime {
    created_at + Duration::hours(SERVER_CLOCK_OFFSET_HOURS)
}

/// Human relative time ("3 hours ago") for a notification timestamp.
///
/// Both sides are compared as display-zone wall clocks.
pub fn relative_time(created_at: NaiveDateTime, now: DateTime<Utc>) -> String {
    let now_local = display_wall_clock(now.naive_utc());
    let elapsed = now_local.signed_duration_since(display_wall_clock(created_at));
    let phrase = humanize(elapsed.num_seconds().unsigned_abs());

    if elapsed.num_seconds() < 0 {
        format!("in {}", phrase)
    } else {
        format!("{} ago", phrase)
    }
}

fn rounded(value: u64, unit: f64) -> u64 {
    (value as f64 / unit).round() as u64
}

// Thresholds follow the common relative-time convention used by the web client.
fn humanize(seconds: u64) -> String {
    let minutes = rounded(seconds, 60.0);
    let hours = rounded(seconds, 3_600.0);
    let days = rounded(seconds, 86_400.0);
    let months = rounded(seconds, 86_400.0 * 30.4);
    let years = rounded(seconds, 86_400.0 * 365.0);

    if seconds <= 44 {
        "a few seconds".to_string()
    } else if seconds <= 89 {
        "a minute".to_string()
    } else if minutes <= 44 {
        format!("{} minutes", minutes)
    } else if minutes <= 89 {
        "an hour".to_string()
    } else if hours <= 21 {
        format!("{} hours", hours)
    } else if hours <= 35 {
        "a day".to_string()
    } else if days <= 25 {
        format!("{} days", days)
    } else if days <= 45 {
        "a month".to_string()
    } else if months <= 10 {
        format!("{} months", months)
    } else if months <= 17 {
        "a year".to_string()
    } else {
        format!("{} years", years.max(2))
    }
}
