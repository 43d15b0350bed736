//! Timestamp utilities

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%dT%H:%M:%S%.f",
];

/// Parse a timing-system timestamp into its recorded wall-clock time
///
/// Accepts RFC 3339 (offset kept as recorded, not converted), offset-less
/// ISO-like forms, and the `/Date(millis)/` form some exports use (read as
/// UTC). Returns `None` for blank or unrecognised input.
pub fn parse_timing_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(inner) = raw
        .strip_prefix("/Date(")
        .and_then(|rest| rest.strip_suffix(")/"))
    {
        let digits_end = inner
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '+' || *c == '-')
            .map(|(i, _)| i)
            .unwrap_or(inner.len());
        let millis: i64 = inner[..digits_end].parse().ok()?;
        return DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.naive_utc());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Spreadsheet serial day number (days since 1899-12-30), whole seconds
pub fn to_serial_days(at: NaiveDateTime) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    let truncated = at.with_nanosecond(0).unwrap_or(at);
    (truncated - epoch).num_seconds() as f64 / 86_400.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
    }

    #[test]
    fn test_millis_to_duration() {
        assert_eq!(millis_to_duration(5000), Duration::from_secs(5));
        assert_eq!(millis_to_duration(0), Duration::ZERO);
    }

    #[test]
    fn test_parse_rfc3339_keeps_wall_clock() {
        let at = parse_timing_timestamp("2024-05-01T10:15:30.1234567+09:00").unwrap();
        assert_eq!(at.to_string(), "2024-05-01 10:15:30.123456700");
    }

    #[test]
    fn test_parse_offsetless_forms() {
        assert!(parse_timing_timestamp("2024-05-01T10:15:30.5").is_some());
        assert!(parse_timing_timestamp("2024/05/01 10:15:30").is_some());
        assert!(parse_timing_timestamp("2024-05-01 10:15:30").is_some());
    }

    #[test]
    fn test_parse_dotnet_date_form() {
        let at = parse_timing_timestamp("/Date(0)/").unwrap();
        assert_eq!(at.to_string(), "1970-01-01 00:00:00");
        let with_offset = parse_timing_timestamp("/Date(86400000+0900)/").unwrap();
        assert_eq!(with_offset.to_string(), "1970-01-02 00:00:00");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_timing_timestamp("").is_none());
        assert!(parse_timing_timestamp("   ").is_none());
        assert!(parse_timing_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_serial_days_known_values() {
        let day = NaiveDate::from_ymd_opt(1900, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(to_serial_days(day), 2.0);

        let noon = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_milli_opt(12, 0, 0, 999)
            .unwrap();
        assert_eq!(to_serial_days(noon), 45292.5);
    }
}
