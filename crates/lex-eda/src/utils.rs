//! Shared utilities for the EDA toolkit.
//!
//! This module contains helpers used across the loader, the summary engine,
//! the figure layer and the report generator: dtype classification, value
//! extraction from polars series, number formatting and output paths.

use crate::error::{EdaError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::path::{Path, PathBuf};

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Category of a data type for analysis purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer or floating point numbers
    Numeric,
    /// Date or datetime types
    Datetime,
    /// Boolean type
    Boolean,
    /// String/text type
    String,
    /// Other/unknown types
    Other,
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is an integer type.
#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    is_numeric_dtype(dtype) && !matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType carries a calendar date.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if is_datetime_dtype(dtype) {
        DtypeCategory::Datetime
    } else if matches!(dtype, DataType::Boolean) {
        DtypeCategory::Boolean
    } else if matches!(dtype, DataType::String | DataType::Categorical(_, _)) {
        DtypeCategory::String
    } else {
        DtypeCategory::Other
    }
}

/// Short dtype label used in the data information text.
pub fn dtype_label(dtype: &DataType) -> String {
    match dtype {
        DataType::Int8 => "int8".to_string(),
        DataType::Int16 => "int16".to_string(),
        DataType::Int32 => "int32".to_string(),
        DataType::Int64 => "int64".to_string(),
        DataType::UInt8 => "uint8".to_string(),
        DataType::UInt16 => "uint16".to_string(),
        DataType::UInt32 => "uint32".to_string(),
        DataType::UInt64 => "uint64".to_string(),
        DataType::Float32 => "float32".to_string(),
        DataType::Float64 => "float64".to_string(),
        DataType::Boolean => "bool".to_string(),
        DataType::String => "str".to_string(),
        DataType::Date => "date".to_string(),
        DataType::Datetime(_, _) => "datetime".to_string(),
        other => format!("{other}").to_lowercase(),
    }
}

// =============================================================================
// Series Extraction Utilities
// =============================================================================

/// Extract a series as optional floats. Non-numeric series yield an error.
pub fn series_to_f64(series: &Series) -> Result<Vec<Option<f64>>> {
    if !is_numeric_dtype(series.dtype()) && !matches!(series.dtype(), DataType::Boolean) {
        return Err(EdaError::UnsupportedInput(format!(
            "column '{}' has dtype {}, expected a numeric column",
            series.name(),
            series.dtype()
        )));
    }
    let floats = series.cast(&DataType::Float64)?;
    Ok(floats.f64()?.into_iter().collect())
}

/// Numeric series as `Float64` with NaN treated as missing. Infinite values
/// are kept.
pub fn float_values(series: &Series) -> Result<Float64Chunked> {
    if !is_numeric_dtype(series.dtype()) && !matches!(series.dtype(), DataType::Boolean) {
        return Err(EdaError::UnsupportedInput(format!(
            "column '{}' has dtype {}, expected a numeric column",
            series.name(),
            series.dtype()
        )));
    }
    let floats = series.cast(&DataType::Float64)?;
    let masked: Float64Chunked = floats
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(masked.with_name(series.name().clone()))
}

/// Convert a timestamp in the given unit to a naive UTC datetime.
fn timestamp_to_datetime(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let datetime = match unit {
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(value),
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
    };
    datetime.map(|dt| dt.naive_utc())
}

/// Extract a datetime or date series as optional naive datetimes.
pub fn series_to_datetimes(series: &Series) -> Result<Vec<Option<NaiveDateTime>>> {
    match series.dtype() {
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            let physical = series.cast(&DataType::Int64)?;
            Ok(physical
                .i64()?
                .into_iter()
                .map(|v| v.and_then(|v| timestamp_to_datetime(v, unit)))
                .collect())
        }
        DataType::Date => {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .ok_or_else(|| EdaError::InvalidConfig("invalid epoch".to_string()))?;
            let physical = series.cast(&DataType::Int32)?;
            Ok(physical
                .i32()?
                .into_iter()
                .map(|v| v.map(|days| epoch + chrono::Duration::days(days as i64)))
                .collect())
        }
        other => Err(EdaError::UnsupportedInput(format!(
            "column '{}' has dtype {other}, expected a datetime column",
            series.name()
        ))),
    }
}

/// Build a millisecond datetime series from naive datetimes.
pub fn datetime_series(name: &str, values: &[Option<NaiveDateTime>]) -> Result<Series> {
    let millis: Vec<Option<i64>> = values
        .iter()
        .map(|v| v.map(|dt| dt.and_utc().timestamp_millis()))
        .collect();
    Ok(Series::new(name.into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?)
}

/// Render every value of a series as display text (`None` for nulls).
pub fn series_to_strings(series: &Series) -> Result<Vec<Option<String>>> {
    let dtype = series.dtype();
    match get_dtype_category(dtype) {
        DtypeCategory::Numeric if is_integer_dtype(dtype) => {
            let ints = series.cast(&DataType::Int64)?;
            Ok(ints
                .i64()?
                .into_iter()
                .map(|v| v.map(|v| v.to_string()))
                .collect())
        }
        DtypeCategory::Numeric => Ok(series_to_f64(series)?
            .into_iter()
            .map(|v| v.map(format_float))
            .collect()),
        DtypeCategory::Datetime => {
            let date_only = matches!(dtype, DataType::Date);
            Ok(series_to_datetimes(series)?
                .into_iter()
                .map(|v| v.map(|dt| format_datetime(&dt, date_only)))
                .collect())
        }
        DtypeCategory::Boolean => Ok(series
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| if b { "True" } else { "False" }.to_string()))
            .collect()),
        DtypeCategory::String | DtypeCategory::Other => {
            let strings = series.cast(&DataType::String)?;
            Ok(strings
                .str()?
                .into_iter()
                .map(|v| v.map(str::to_string))
                .collect())
        }
    }
}

// =============================================================================
// Formatting Utilities
// =============================================================================

/// Round to two decimals.
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a float in its shortest round-trip form; integral values keep one
/// decimal (`30.0`).
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Round to two decimals and format as [`format_float`].
pub fn format_rounded(value: f64) -> String {
    format_float(round2(value))
}

/// Format a ratio in percent, rounded to two decimals: `0.0%`, `33.33%`.
pub fn format_percent(part: usize, total: usize) -> String {
    let ratio = if total > 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    format!("{}%", format_rounded(ratio))
}

/// Format a datetime for tables and labels.
pub fn format_datetime(dt: &NaiveDateTime, date_only: bool) -> String {
    if date_only {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

// =============================================================================
// Output Path Utilities
// =============================================================================

/// Create the output directory (and parents) if it does not exist.
pub fn create_output_directory(dir: &Path) -> Result<PathBuf> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        tracing::info!("Created output directory: {}", dir.display());
    }
    Ok(dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== dtype tests ====================

    #[test]
    fn test_dtype_categories() {
        assert_eq!(get_dtype_category(&DataType::Int64), DtypeCategory::Numeric);
        assert_eq!(get_dtype_category(&DataType::Float32), DtypeCategory::Numeric);
        assert_eq!(get_dtype_category(&DataType::String), DtypeCategory::String);
        assert_eq!(get_dtype_category(&DataType::Boolean), DtypeCategory::Boolean);
        assert_eq!(get_dtype_category(&DataType::Date), DtypeCategory::Datetime);
        assert_eq!(
            get_dtype_category(&DataType::Datetime(TimeUnit::Milliseconds, None)),
            DtypeCategory::Datetime
        );
    }

    #[test]
    fn test_is_integer_dtype() {
        assert!(is_integer_dtype(&DataType::UInt8));
        assert!(!is_integer_dtype(&DataType::Float64));
        assert!(!is_integer_dtype(&DataType::String));
    }

    // ==================== extraction tests ====================

    #[test]
    fn test_series_to_strings_integers_and_floats() {
        let ints = Series::new("age".into(), &[25i64, 30, 35]);
        let floats = Series::new("fare".into(), &[7.25f64, 30.0]);

        assert_eq!(
            series_to_strings(&ints).unwrap(),
            vec![Some("25".to_string()), Some("30".to_string()), Some("35".to_string())]
        );
        assert_eq!(
            series_to_strings(&floats).unwrap(),
            vec![Some("7.25".to_string()), Some("30.0".to_string())]
        );
    }

    #[test]
    fn test_datetime_round_trip() {
        let dt = NaiveDate::from_ymd_opt(2023, 4, 5)
            .unwrap()
            .and_hms_opt(13, 30, 0)
            .unwrap();
        let series = datetime_series("ts", &[Some(dt), None]).unwrap();
        let back = series_to_datetimes(&series).unwrap();
        assert_eq!(back, vec![Some(dt), None]);
        assert_eq!(
            series_to_strings(&series).unwrap()[0].as_deref(),
            Some("2023-04-05 13:30:00")
        );
    }

    #[test]
    fn test_series_to_f64_rejects_strings() {
        let series = Series::new("name".into(), &["a", "b"]);
        assert!(series_to_f64(&series).is_err());
    }

    // ==================== formatting tests ====================

    #[test]
    fn test_float_values_masks_nan_keeps_inf() {
        let series = Series::new("v".into(), &[1.0f64, f64::NAN, f64::INFINITY]);
        let values = float_values(&series).unwrap();
        assert_eq!(values.name().as_str(), "v");
        assert_eq!(values.null_count(), 1);
        assert_eq!(values.get(2), Some(f64::INFINITY));
        assert!(float_values(&Series::new("s".into(), &["a"])).is_err());
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(30.0), "30.0");
        assert_eq!(format_float(27.5), "27.5");
        assert_eq!(format_float(f64::NAN), "NaN");
        assert_eq!(format_rounded(1.23456), "1.23");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0, 3), "0.0%");
        assert_eq!(format_percent(1, 3), "33.33%");
        assert_eq!(format_percent(1, 2), "50.0%");
        assert_eq!(format_percent(0, 0), "0.0%");
    }

    // ==================== path tests ====================

    #[test]
    fn test_create_output_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b");
        create_output_directory(&nested).unwrap();
        assert!(nested.is_dir());
        // Existing directory is fine
        create_output_directory(&nested).unwrap();
    }
}
