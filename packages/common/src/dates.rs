//! Lenient datetime parsing for legacy timestamps.

use chrono::{DateTime, NaiveDate, Utc};

/// Parse an RFC 3339 / ISO 8601 timestamp, accepting bare dates.
///
/// Legacy documents carry a mix of full timestamps with offsets and plain
/// `YYYY-MM-DD` dates; both are normalized to UTC.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// Parse a timestamp into a date, dropping any time component.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    parse_datetime(value).map(|dt| dt.date_naive())
}

/// Reduce a timestamp string to its date for day-granularity comparison.
///
/// Unparseable strings are returned unchanged.
pub fn truncate_to_day(value: &str) -> String {
    parse_date(value)
        .map(|d| d.to_string())
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime_accepts_offsets_and_dates() {
        assert!(parse_datetime("2019-09-25T16:34:00+03:00").is_some());
        assert!(parse_datetime("2019-09-25").is_some());
        assert!(parse_datetime("not a date").is_none());
    }

    #[test]
    fn test_truncate_to_day() {
        assert_eq!(truncate_to_day("2019-09-25T16:34:00+03:00"), "2019-09-25");
        assert_eq!(truncate_to_day("2019-09-25"), "2019-09-25");
        assert_eq!(truncate_to_day("garbage"), "garbage");
    }

    #[test]
    fn test_truncate_respects_timezone_conversion() {
        // 01:00+03:00 is the previous day in UTC
        assert_eq!(truncate_to_day("2019-09-25T01:00:00+03:00"), "2019-09-24");
    }
}
