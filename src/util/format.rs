use time::OffsetDateTime;

/// Format a commit time as YYYY-MM-DD HH:MM string
pub fn format_datetime(datetime: Option<OffsetDateTime>) -> String {
    use time::macros::format_description;

    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    datetime
        .and_then(|dt| dt.format(&format).ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Convert a git timestamp (seconds since epoch) to a datetime
pub fn datetime_from_unix(seconds: i64) -> Option<OffsetDateTime> {
    if seconds == 0 {
        return None;
    }
    OffsetDateTime::from_unix_timestamp(seconds).ok()
}
