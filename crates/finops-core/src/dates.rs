//! Lenient date parsing for billing export date columns.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

/// Datetime layouts tried after RFC 3339 / RFC 2822.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Date-only layouts; month-first wins for ambiguous slash dates.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y", "%Y%m%d"];

/// Parse a billing date string into a naive UTC datetime.
///
/// Handles:
/// * RFC 3339 / ISO 8601 with `Z` or a fixed offset (converted to UTC).
/// * RFC 2822.
/// * The datetime and date-only layouts commonly found in AWS, Azure and GCP
///   exports.
/// * Billing-period months such as `"2024-03"` (first day of the month).
///
/// Returns `None` for blank or unrecognised input.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let normalised = match s.strip_suffix('Z') {
        Some(stripped) => format!("{}+00:00", stripped),
        None => s.to_string(),
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    // "YYYY-MM" billing periods.
    if s.len() == 7 {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d") {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    debug!("could not parse date value \"{}\"", s);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn ymd(dt: NaiveDateTime) -> (i32, u32, u32) {
        (dt.year(), dt.month(), dt.day())
    }

    #[test]
    fn test_parse_rfc3339_with_z() {
        let dt = parse_datetime("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(ymd(dt), (2024, 1, 15));
        assert_eq!(dt.hour(), 10);
    }

    #[test]
    fn test_parse_rfc3339_offset_converts_to_utc() {
        let dt = parse_datetime("2024-02-01T01:00:00+02:00").unwrap();
        assert_eq!(ymd(dt), (2024, 1, 31));
        assert_eq!(dt.hour(), 23);
    }

    #[test]
    fn test_parse_plain_date() {
        assert_eq!(ymd(parse_datetime("2023-12-31").unwrap()), (2023, 12, 31));
    }

    #[test]
    fn test_parse_space_separated_datetime() {
        let dt = parse_datetime("2024-03-05 08:15:00").unwrap();
        assert_eq!(ymd(dt), (2024, 3, 5));
        assert_eq!(dt.minute(), 15);
    }

    #[test]
    fn test_parse_us_slash_date_is_month_first() {
        assert_eq!(ymd(parse_datetime("02/03/2024").unwrap()), (2024, 2, 3));
    }

    #[test]
    fn test_parse_compact_date() {
        assert_eq!(ymd(parse_datetime("20240704").unwrap()), (2024, 7, 4));
    }

    #[test]
    fn test_parse_billing_period_month() {
        assert_eq!(ymd(parse_datetime("2024-06").unwrap()), (2024, 6, 1));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert!(parse_datetime("  2024-01-01  ").is_some());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_datetime("not a date"), None);
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("2024-13-01"), None);
    }
}
