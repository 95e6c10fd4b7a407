//! Date/time utilities for Feedloom.
//!
//! All timestamps are stored as fixed-width RFC 3339 UTC strings with
//! millisecond precision (`2024-01-15T10:30:00.000Z`), so comparing the
//! stored text lexically is the same as comparing the instants.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Format a UTC datetime in the storage format.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in the storage format.
pub fn now_timestamp() -> String {
    format_timestamp(&Utc::now())
}

/// Parse a stored datetime string.
///
/// Accepts RFC 3339 (any offset) and the SQLite `YYYY-MM-DD HH:MM:SS`
/// form, which is treated as UTC.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp_fixed_width() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(format_timestamp(&dt), "2024-01-15T10:30:00.000Z");
    }

    #[test]
    fn test_lexical_order_matches_time_order() {
        let a = Utc.with_ymd_and_hms(2024, 1, 15, 9, 59, 59).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        assert!(format_timestamp(&a) < format_timestamp(&b));
    }

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_datetime("2024-01-15T19:30:00+09:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_sqlite_format() {
        let dt = parse_datetime("2024-01-15 10:30:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_round_trip() {
        let dt = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(parse_datetime(&format_timestamp(&dt)), Some(dt));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_datetime("not a date").is_none());
        assert!(parse_datetime("").is_none());
    }
}
