//! Date parsing for index sorting.

use chrono::{NaiveDate, NaiveDateTime};

/// Date-only formats, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",   // 2024-09-23
    "%Y/%m/%d",   // 2024/09/23
    "%m/%d/%Y",   // 09/23/2024
    "%d/%m/%Y",   // 23/09/2024
    "%b %d %Y",   // Sep 23 2024
    "%B %d %Y",   // September 23 2024
    "%b %d, %Y",  // Sep 23, 2024
    "%B %d, %Y",  // September 23, 2024
    "%d %b %Y",   // 23 Sep 2024
    "%d %B %Y",   // 23 September 2024
];

/// Date-time formats, tried after the date-only ones.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S", // 2024-09-23 14:30:00
    "%Y-%m-%d %H:%M",    // 2024-09-23 14:30
];

/// Parse a date string into a UTC unix timestamp.
///
/// Returns `None` when no known format matches.
pub fn parse_timestamp(s: &str) -> Option<i64> {
    let s = s.trim();

    let date = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0));

    date.or_else(|| {
        DATETIME_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
    })
    .map(|datetime| datetime.and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEP_23: i64 = 1_727_049_600;

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(parse_timestamp("2024-09-23"), Some(SEP_23));
        assert_eq!(parse_timestamp("1970-01-01"), Some(0));
    }

    #[test]
    fn test_parse_slash_dates() {
        assert_eq!(parse_timestamp("2024/09/23"), Some(SEP_23));
        assert_eq!(parse_timestamp("09/23/2024"), Some(SEP_23));
        // Not a valid month/day order, falls through to day/month
        assert_eq!(parse_timestamp("23/09/2024"), Some(SEP_23));
    }

    #[test]
    fn test_month_first_wins_when_ambiguous() {
        // 01/02/2024 reads as January 2nd
        assert_eq!(parse_timestamp("01/02/2024"), parse_timestamp("2024-01-02"));
    }

    #[test]
    fn test_parse_month_names() {
        for s in [
            "Sep 23 2024",
            "September 23 2024",
            "Sep 23, 2024",
            "September 23, 2024",
            "23 Sep 2024",
            "23 September 2024",
        ] {
            assert_eq!(parse_timestamp(s), Some(SEP_23), "{s}");
        }
    }

    #[test]
    fn test_parse_datetimes() {
        assert_eq!(parse_timestamp("2024-09-23 14:30:00"), Some(SEP_23 + 14 * 3600 + 30 * 60));
        assert_eq!(parse_timestamp("2024-09-23 14:30"), Some(SEP_23 + 14 * 3600 + 30 * 60));
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(parse_timestamp("not-a-date"), None);
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("2024-13-40"), None);
    }
}
