use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

/// Parse a timestamp cell to Unix epoch seconds.
///
/// Digit-only values longer than 12 characters are taken as milliseconds,
/// shorter ones as seconds. Anything else is tried as RFC 3339 and then as a
/// handful of common datetime and date formats, read as UTC. Returns `None`
/// when nothing matches, in which case callers pass the value through
/// untouched.
pub fn parse_epoch_secs(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        let n: i64 = trimmed.parse().ok()?;
        if trimmed.len() > 12 {
            return Some(n / 1000);
        }
        return Some(n);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.timestamp());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.and_utc().timestamp());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp());
    }

    None
}
