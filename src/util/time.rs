use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Timelike};

/// Formats accepted when reading a stored or user-typed timestamp,
/// tried in order.
const INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Current local time as a stored timestamp
pub fn now_iso() -> String {
    format_iso(Local::now().naive_local())
}

/// Canonical stored form: `YYYY-MM-DDTHH:MM:SS`, with six fractional
/// digits only when there is a sub-second part.
pub fn format_iso(dt: NaiveDateTime) -> String {
    if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

/// Parse a timestamp in any accepted form. Offsets are converted to local time.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in INPUT_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Human-friendly form of a stored timestamp. Seconds are dropped when zero,
/// empty input reads `N/A`, and anything unparseable is echoed back.
pub fn format_datetime(iso: &str) -> String {
    if iso.is_empty() {
        return "N/A".to_string();
    }
    match parse_timestamp(iso) {
        Some(dt) if dt.second() == 0 => dt.format("%Y-%m-%d %H:%M").to_string(),
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => iso.to_string(),
    }
}

/// `1d 2h 3m 4s`, omitting zero units; `0s` for nothing.
pub fn format_span(total_seconds: u64) -> String {
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if seconds > 0 {
        parts.push(format!("{}s", seconds));
    }
    if parts.is_empty() {
        "0s".to_string()
    } else {
        parts.join(" ")
    }
}

/// Whole seconds from `start` to `target`; 0 when either is missing or
/// unparseable, or when the target is not after the start.
pub fn calculate_span_seconds(start: &str, target: &str) -> u64 {
    match (parse_timestamp(start), parse_timestamp(target)) {
        (Some(s), Some(t)) if t > s => (t - s).num_seconds().max(0) as u64,
        _ => 0,
    }
}

/// Signed seconds from `from` to `to`, or None if either fails to parse
pub fn seconds_between(from: &str, to: NaiveDateTime) -> Option<i64> {
    parse_timestamp(from).map(|f| (to - f).num_seconds())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn parse_accepts_python_isoformat() {
        let dt = parse_timestamp("2025-03-01T09:30:15.123456").unwrap();
        assert_eq!(dt.year(), 2025);
        assert_eq!(dt.second(), 15);
        assert!(parse_timestamp("2025-03-01T09:30:15").is_some());
        assert!(parse_timestamp("2025-03-01T09:30").is_some());
        assert!(parse_timestamp("2025-03-01 09:30").is_some());
        assert!(parse_timestamp("2025-03-01").is_some());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("tomorrow").is_none());
        assert!(parse_timestamp("2025-13-01T00:00").is_none());
    }

    #[test]
    fn format_iso_omits_zero_fraction() {
        let dt = parse_timestamp("2025-03-01T09:30").unwrap();
        assert_eq!(format_iso(dt), "2025-03-01T09:30:00");
        let dt = parse_timestamp("2025-03-01T09:30:00.5").unwrap();
        assert_eq!(format_iso(dt), "2025-03-01T09:30:00.500000");
    }

    #[test]
    fn now_iso_round_trips() {
        let now = now_iso();
        assert!(parse_timestamp(&now).is_some(), "{now}");
    }

    #[test]
    fn format_datetime_cases() {
        assert_eq!(format_datetime(""), "N/A");
        assert_eq!(format_datetime("2025-03-01T09:30:00"), "2025-03-01 09:30");
        assert_eq!(format_datetime("2025-03-01T09:30:42.1"), "2025-03-01 09:30:42");
        assert_eq!(format_datetime("someday"), "someday");
    }

    #[test]
    fn format_span_units() {
        assert_eq!(format_span(0), "0s");
        assert_eq!(format_span(59), "59s");
        assert_eq!(format_span(3_600), "1h");
        assert_eq!(format_span(86_400 + 2 * 3_600 + 3 * 60 + 4), "1d 2h 3m 4s");
    }

    #[test]
    fn span_requires_ordered_endpoints() {
        assert_eq!(
            calculate_span_seconds("2025-03-01T09:00:00", "2025-03-01T10:30:00"),
            5_400
        );
        assert_eq!(
            calculate_span_seconds("2025-03-01T10:00:00", "2025-03-01T09:00:00"),
            0
        );
        assert_eq!(calculate_span_seconds("", "2025-03-01T09:00:00"), 0);
        assert_eq!(calculate_span_seconds("x", "y"), 0);
    }
}
