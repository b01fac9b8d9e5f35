use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// `dd-MM-yyyy HH:mm:ss` wall-clock time in `timezone`.
pub fn format_local_timestamp(at: DateTime<Utc>, timezone: Tz) -> String {
    at.with_timezone(&timezone)
        .format("%d-%m-%Y %H:%M:%S")
        .to_string()
}
