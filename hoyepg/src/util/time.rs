use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

/// Raised when a source timestamp matches none of the accepted layouts.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed timestamp '{0}'")]
pub struct MalformedTimestamp(pub String);

/// Layouts carrying their own UTC offset, tried after RFC 3339.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
];

/// Layouts without an offset. The caller's fallback offset is applied.
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Normalize a source timestamp into an absolute time.
///
/// Supports:
/// - RFC 3339 / ISO 8601 with an explicit offset (kept as-is)
/// - ISO 8601 without an offset (interpreted in `fallback`)
/// - Millisecond epoch as string (13+ digits)
/// - Second epoch as string (10-12 digits)
///
/// Epoch values are expressed in `fallback` so all entries from one source
/// share the same offset in the output.
pub fn normalize(raw: &str, fallback: FixedOffset) -> Result<DateTime<FixedOffset>, MalformedTimestamp> {
    let trimmed = raw.trim();
    let malformed = || MalformedTimestamp(raw.to_string());

    if trimmed.is_empty() {
        return Err(malformed());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt);
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
            return Ok(dt);
        }
    }

    for format in LOCAL_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return fallback
                .from_local_datetime(&naive)
                .single()
                .ok_or_else(malformed);
        }
    }

    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let utc = match trimmed.len() {
            13.. => trimmed
                .parse::<i64>()
                .ok()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            10..=12 => trimmed
                .parse::<i64>()
                .ok()
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
            _ => None,
        };
        if let Some(utc) = utc {
            return Ok(utc.with_timezone(&fallback));
        }
    }

    Err(malformed())
}

/// Format a timestamp the way XMLTV expects it (`YYYYMMDDHHMMSS +HHMM`),
/// keeping whatever offset the timestamp carries.
pub fn format_xmltv(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%Y%m%d%H%M%S %z").to_string()
}

/// Parse a configured UTC offset such as `+08:00`, `+0800`, `-05` or `Z`.
pub fn parse_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !(digits.len() == 2 || digits.len() == 4) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = if digits.len() == 4 {
        digits[2..].parse().ok()?
    } else {
        0
    };
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Current date in the given offset. Anchors schedules that only carry a
/// time of day.
pub fn today(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hkt() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    #[test]
    fn test_explicit_offset_is_kept() {
        let dt = normalize("2025-01-01T08:00:00+08:00", hkt()).unwrap();
        assert_eq!(format_xmltv(&dt), "20250101080000 +0800");

        let dt = normalize("2025-01-01T08:00:00Z", hkt()).unwrap();
        assert_eq!(format_xmltv(&dt), "20250101080000 +0000");
    }

    #[test]
    fn test_missing_offset_uses_fallback() {
        let dt = normalize("2025-01-01T23:30:00", hkt()).unwrap();
        assert_eq!(format_xmltv(&dt), "20250101233000 +0800");

        let dt = normalize("2025-01-01 06:15", hkt()).unwrap();
        assert_eq!(format_xmltv(&dt), "20250101061500 +0800");
    }

    #[test]
    fn test_fractional_seconds() {
        let dt = normalize("2026-02-08T05:00:00.000Z", hkt()).unwrap();
        assert_eq!(dt.timestamp(), 1770526800);
    }

    #[test]
    fn test_epoch_strings_use_fallback_offset() {
        let dt = normalize("1770526800000", hkt()).unwrap();
        assert_eq!(dt.timestamp(), 1770526800);
        assert_eq!(format_xmltv(&dt), "20260208130000 +0800");

        let dt = normalize("1770526800", hkt()).unwrap();
        assert_eq!(dt.timestamp(), 1770526800);
    }

    #[test]
    fn test_malformed() {
        assert_eq!(
            normalize("not-a-timestamp", hkt()),
            Err(MalformedTimestamp("not-a-timestamp".to_string()))
        );
        assert!(normalize("", hkt()).is_err());
        assert!(normalize("123", hkt()).is_err());
        assert!(normalize("2025-13-45T99:00:00", hkt()).is_err());
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("+08:00"), Some(hkt()));
        assert_eq!(parse_offset("+0800"), Some(hkt()));
        assert_eq!(parse_offset("+08"), Some(hkt()));
        assert_eq!(
            parse_offset("-05:30"),
            FixedOffset::west_opt(5 * 3600 + 30 * 60)
        );
        assert_eq!(parse_offset("Z"), FixedOffset::east_opt(0));
        assert_eq!(parse_offset("8"), None);
        assert_eq!(parse_offset("+25:00"), None);
    }
}
