use chrono::{DateTime, NaiveDate, NaiveDateTime};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Datetime layouts the backend emits, tried in order after RFC 3339.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y.%m.%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y.%m.%d"];

/// Parse any of the backend's timestamp shapes into a naive datetime.
///
/// Bare dates resolve to midnight. Offsets from RFC 3339 inputs are folded
/// into UTC.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    parse_date(raw).and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse a calendar date (`2025-03-14` or `2025.03.14`), also accepting a
/// full timestamp and keeping its date part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }
    if raw.len() > 10 {
        return parse_datetime(raw).map(|dt| dt.date());
    }
    None
}

/// Format a datetime according to the configured date format.
///
/// `"relative"` (or an empty string) yields `"2h"`, `"3d"`, `"1w"` style
/// output; anything else is used as a `strftime` pattern.
pub fn format_datetime(dt: &NaiveDateTime, date_format: &str, now: NaiveDateTime) -> String {
    if date_format.is_empty() || date_format == "relative" {
        format_relative_time(dt, now)
    } else {
        dt.format(date_format).to_string()
    }
}

/// Format a raw backend timestamp, falling back to the raw text (or `-`)
/// when it cannot be parsed.
pub fn format_raw_datetime(raw: Option<&str>, date_format: &str, now: NaiveDateTime) -> String {
    match raw {
        None => "-".to_owned(),
        Some(s) => match parse_datetime(s) {
            Some(dt) => format_datetime(&dt, date_format, now),
            None => s.to_owned(),
        },
    }
}

pub fn format_relative_time(dt: &NaiveDateTime, now: NaiveDateTime) -> String {
    let duration = now.signed_duration_since(*dt);

    let minutes = duration.num_minutes();
    if minutes < 1 {
        return "now".to_owned();
    }
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let hours = duration.num_hours();
    if hours < 24 {
        return format!("{hours}h");
    }
    let days = duration.num_days();
    if days < 7 {
        return format!("{days}d");
    }
    if days < 30 {
        return format!("{}w", days / 7);
    }
    if days < 365 {
        return format!("{}mo", days / 30);
    }
    format!("{}y", days / 365)
}

/// Format an execution time in milliseconds: `"850ms"`, `"12.4s"`,
/// `"2m 05s"`.
pub fn format_duration_ms(ms: i64) -> String {
    let ms = ms.max(0);
    if ms < 1_000 {
        return format!("{ms}ms");
    }
    let secs = ms / 1_000;
    if secs < 60 {
        #[allow(clippy::cast_precision_loss)]
        return format!("{:.1}s", ms as f64 / 1_000.0);
    }
    format!("{}m {:02}s", secs / 60, secs % 60)
}

/// Render a number without a trailing `.0` for whole values.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        let s = format!("{value:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_owned()
    }
}

/// `"1 day"`, `"3 days"`.
pub fn format_days(count: i64) -> String {
    if count == 1 {
        "1 day".to_owned()
    } else {
        format!("{count} days")
    }
}

/// Truncate `text` to `width` terminal columns, ending with `…` when cut.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_owned();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(raw: &str) -> NaiveDateTime {
        parse_datetime(raw).expect("valid datetime")
    }

    #[test]
    fn parses_every_backend_shape() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 14)
            .and_then(|d| d.and_hms_opt(10, 30, 0))
            .expect("valid");
        assert_eq!(parse_datetime("2025-03-14 10:30:00"), Some(expected));
        assert_eq!(parse_datetime("2025.03.14 10:30:00"), Some(expected));
        assert_eq!(parse_datetime("2025-03-14T10:30:00"), Some(expected));
        assert_eq!(parse_datetime("2025-03-14T10:30:00.000"), Some(expected));
        assert_eq!(parse_datetime("2025-03-14T10:30:00Z"), Some(expected));
        assert_eq!(parse_datetime("2025-03-14T12:30:00+02:00"), Some(expected));
    }

    #[test]
    fn bare_date_is_midnight() {
        assert_eq!(at("2025.03.14"), at("2025-03-14 00:00:00"));
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("yesterday"), None);
        assert_eq!(parse_date("14/03/2025"), None);
    }

    #[test]
    fn parse_date_keeps_date_of_timestamp() {
        assert_eq!(
            parse_date("2025-03-14 23:59:59"),
            NaiveDate::from_ymd_opt(2025, 3, 14)
        );
    }

    #[test]
    fn relative_time_buckets() {
        let now = at("2025-03-14 12:00:00");
        assert_eq!(format_relative_time(&at("2025-03-14 11:59:30"), now), "now");
        assert_eq!(format_relative_time(&at("2025-03-14 11:15:00"), now), "45m");
        assert_eq!(format_relative_time(&at("2025-03-14 02:00:00"), now), "10h");
        assert_eq!(format_relative_time(&at("2025-03-11 12:00:00"), now), "3d");
        assert_eq!(format_relative_time(&at("2025-02-28 12:00:00"), now), "2w");
        assert_eq!(format_relative_time(&at("2024-12-01 12:00:00"), now), "3mo");
        assert_eq!(format_relative_time(&at("2022-03-01 12:00:00"), now), "3y");
    }

    #[test]
    fn strftime_format_is_honoured() {
        let now = at("2025-03-14 12:00:00");
        assert_eq!(
            format_datetime(&at("2025-03-01 08:05:00"), "%d.%m.%Y %H:%M", now),
            "01.03.2025 08:05"
        );
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration_ms(850), "850ms");
        assert_eq!(format_duration_ms(12_400), "12.4s");
        assert_eq!(format_duration_ms(125_000), "2m 05s");
        assert_eq!(format_duration_ms(-5), "0ms");
    }

    #[test]
    fn number_formatting_drops_trailing_zeroes() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_number(3.333_33), "3.33");
    }

    #[test]
    fn truncation_respects_display_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdefgh", 5), "abcd…");
        assert_eq!(truncate_to_width("日本語テキスト", 5), "日本…");
        assert_eq!(truncate_to_width("abc", 0), "");
    }
}
