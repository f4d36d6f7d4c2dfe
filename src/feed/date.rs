use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Naive datetime layouts accepted after RFC 3339 and RFC 2822, taken as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse an upstream date string into a UTC instant.
///
/// Feeds publish a normalized ISO field and a raw `pubDate` that is usually
/// RFC 2822 but not always. Anything unparseable (including the empty string)
/// yields `None`, which the sort treats as "no date".
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Pick the effective date string: the normalized field when non-empty,
/// otherwise the raw one, otherwise empty.
pub(crate) fn resolve_published(iso_date: Option<&str>, pub_date: Option<&str>) -> String {
    first_non_empty(iso_date, pub_date)
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn first_non_empty<'a>(primary: Option<&'a str>, fallback: Option<&'a str>) -> Option<&'a str> {
    primary
        .filter(|s| !s.is_empty())
        .or_else(|| fallback.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rfc3339() {
        let dt = parse_timestamp("2024-05-03T10:15:00.000Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 5, 3, 10, 15, 0).unwrap());
    }

    #[test]
    fn test_rfc3339_with_offset_normalizes_to_utc() {
        let dt = parse_timestamp("2024-05-03T12:00:00+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 5, 3, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_rfc2822() {
        let dt = parse_timestamp("Fri, 03 May 2024 10:15:00 GMT").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 5, 3, 10, 15, 0).unwrap());
    }

    #[test]
    fn test_date_only_is_utc_midnight() {
        let dt = parse_timestamp("2024-05-01").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_naive_datetime() {
        let dt = parse_timestamp("2024-05-01 08:30:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap());
    }

    #[test]
    fn test_unparseable_is_none() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("   ").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_resolve_published_prefers_iso() {
        assert_eq!(
            resolve_published(Some("2024-01-01T00:00:00Z"), Some("Mon, 01 Jan 2024 00:00:00 GMT")),
            "2024-01-01T00:00:00Z"
        );
        assert_eq!(
            resolve_published(Some(""), Some("Mon, 01 Jan 2024 00:00:00 GMT")),
            "Mon, 01 Jan 2024 00:00:00 GMT"
        );
        assert_eq!(resolve_published(None, None), "");
    }
}
