//! Detection of date-like string columns.

use crate::error::Result;
use crate::utils::datetime_series;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

// Date pattern regexes - compiled once at startup
static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}$").expect("Invalid regex: YYYY-MM-DD"),
        Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").expect("Invalid regex: MM/DD/YYYY"),
        Regex::new(r"^\d{4}-\d{2}-\d{2}\s\d{2}:\d{2}(:\d{2})?").expect("Invalid regex: datetime"),
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").expect("Invalid regex: ISO"),
    ]
});

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Check whether a string looks like a date or datetime.
pub(crate) fn looks_like_date(value: &str) -> bool {
    let trimmed = value.trim();
    DATE_PATTERNS.iter().any(|pattern| pattern.is_match(trimmed))
}

/// Parse a date-like string. Timezone-qualified values are converted to UTC.
pub(crate) fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Convert a string series to a datetime series when every non-null value is
/// a parseable date. Returns `None` when the column is not date-like.
pub(crate) fn try_parse_datetime_column(series: &Series) -> Result<Option<Series>> {
    if series.dtype() != &DataType::String {
        return Ok(None);
    }

    let strings = series.str()?;
    let mut parsed = Vec::with_capacity(strings.len());
    let mut seen = 0usize;

    for value in strings.into_iter() {
        match value {
            Some(text) if text.trim().is_empty() => parsed.push(None),
            Some(text) => {
                if !looks_like_date(text) {
                    return Ok(None);
                }
                match parse_datetime(text) {
                    Some(dt) => {
                        seen += 1;
                        parsed.push(Some(dt));
                    }
                    None => return Ok(None),
                }
            }
            None => parsed.push(None),
        }
    }

    if seen == 0 {
        return Ok(None);
    }

    Ok(Some(datetime_series(series.name().as_str(), &parsed)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::series_to_datetimes;

    #[test]
    fn test_looks_like_date() {
        assert!(looks_like_date("2023-01-15"));
        assert!(looks_like_date("2023/1/5"));
        assert!(looks_like_date("01/15/2023"));
        assert!(looks_like_date("2023-01-15 10:30:00"));
        assert!(looks_like_date("2023-01-15T10:30:00Z"));
        assert!(!looks_like_date("12345"));
        assert!(!looks_like_date("Alice"));
    }

    #[test]
    fn test_parse_datetime_variants() {
        let expected = NaiveDate::from_ymd_opt(2023, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(parse_datetime("2023-01-15 10:30:00"), Some(expected));
        assert_eq!(parse_datetime("2023-01-15T10:30:00"), Some(expected));
        assert_eq!(parse_datetime("2023-01-15T10:30:00Z"), Some(expected));
        assert_eq!(
            parse_datetime("01/15/2023"),
            NaiveDate::from_ymd_opt(2023, 1, 15).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_datetime("not a date"), None);
    }

    #[test]
    fn test_try_parse_datetime_column() {
        let series = Series::new("when".into(), &[Some("2023-01-01"), None, Some("2023-02-01")]);
        let parsed = try_parse_datetime_column(&series).unwrap().unwrap();
        assert!(matches!(parsed.dtype(), DataType::Datetime(_, _)));
        let values = series_to_datetimes(&parsed).unwrap();
        assert_eq!(values[1], None);
        assert_eq!(
            values[2],
            NaiveDate::from_ymd_opt(2023, 2, 1).unwrap().and_hms_opt(0, 0, 0)
        );
    }

    #[test]
    fn test_mixed_column_is_not_converted() {
        let series = Series::new("mixed".into(), &["2023-01-01", "soon"]);
        assert!(try_parse_datetime_column(&series).unwrap().is_none());
    }

    #[test]
    fn test_numeric_column_is_not_converted() {
        let series = Series::new("n".into(), &[1i64, 2]);
        assert!(try_parse_datetime_column(&series).unwrap().is_none());
    }
}
