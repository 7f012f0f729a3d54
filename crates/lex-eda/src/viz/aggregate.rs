//! Time bucketing for datetime line charts.

use crate::layout::AggregationMode;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use polars::prelude::*;
use std::collections::BTreeMap;

/// Aggregation applied to the values falling into one time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Mean,
    Median,
}

impl AggFunc {
    pub const ALL: [AggFunc; 2] = [AggFunc::Mean, AggFunc::Median];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggFunc::Mean => "mean",
            AggFunc::Median => "median",
        }
    }

    fn apply(&self, values: &[f64]) -> f64 {
        let bucket = Float64Chunked::from_slice("bucket".into(), values);
        let value = match self {
            AggFunc::Mean => bucket.mean(),
            AggFunc::Median => bucket.median(),
        };
        value.unwrap_or(f64::NAN)
    }
}

/// One aggregated point: bucket start, its display label and the value.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketPoint {
    pub at: NaiveDateTime,
    pub label: String,
    pub value: f64,
}

/// A named line of aggregated points, ordered by time.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedSeries {
    pub name: String,
    pub points: Vec<BucketPoint>,
}

impl AggregatedSeries {
    /// Time span covered by the points.
    pub fn span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        Some((first.at, last.at))
    }
}

/// Start of the bucket containing `dt`. `All` keeps the timestamp.
pub fn bucket_start(dt: NaiveDateTime, mode: AggregationMode) -> NaiveDateTime {
    let date = |y: i32, m: u32, d: u32| {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or(dt)
    };
    match mode {
        AggregationMode::All => dt,
        AggregationMode::Year => date(dt.year(), 1, 1),
        AggregationMode::Quarter => date(dt.year(), (dt.month() - 1) / 3 * 3 + 1, 1),
        AggregationMode::Month => date(dt.year(), dt.month(), 1),
        AggregationMode::Day => date(dt.year(), dt.month(), dt.day()),
        AggregationMode::Hour => dt
            .date()
            .and_hms_opt(dt.hour(), 0, 0)
            .unwrap_or(dt),
    }
}

/// Display label of a bucket: `2021`, `2021Q1`, `2021-03`, `2021-03-05`,
/// `2021-03-05 14:00:00`.
pub fn bucket_label(start: NaiveDateTime, mode: AggregationMode) -> String {
    match mode {
        AggregationMode::Year => start.format("%Y").to_string(),
        AggregationMode::Quarter => format!("{}Q{}", start.year(), (start.month() - 1) / 3 + 1),
        AggregationMode::Month => start.format("%Y-%m").to_string(),
        AggregationMode::Day => start.format("%Y-%m-%d").to_string(),
        AggregationMode::Hour | AggregationMode::All => {
            start.format("%Y-%m-%d %H:%M:%S").to_string()
        }
    }
}

/// Group `values` by the time bucket of the matching `times` entry and
/// aggregate each bucket. Rows with a missing time or value are dropped.
///
/// `All` skips grouping and returns the raw rows ordered by time.
pub fn aggregate(
    name: &str,
    times: &[Option<NaiveDateTime>],
    values: &[Option<f64>],
    mode: AggregationMode,
    func: AggFunc,
) -> AggregatedSeries {
    let pairs = times
        .iter()
        .zip(values)
        .filter_map(|(t, v)| match (t, v) {
            (Some(t), Some(v)) if v.is_finite() => Some((*t, *v)),
            _ => None,
        });

    let points = if mode == AggregationMode::All {
        let mut raw: Vec<(NaiveDateTime, f64)> = pairs.collect();
        raw.sort_by_key(|(t, _)| *t);
        raw.into_iter()
            .map(|(at, value)| BucketPoint {
                at,
                label: bucket_label(at, mode),
                value,
            })
            .collect()
    } else {
        let mut buckets: BTreeMap<NaiveDateTime, Vec<f64>> = BTreeMap::new();
        for (t, v) in pairs {
            buckets.entry(bucket_start(t, mode)).or_default().push(v);
        }
        buckets
            .into_iter()
            .map(|(at, bucket)| BucketPoint {
                at,
                label: bucket_label(at, mode),
                value: func.apply(&bucket),
            })
            .collect()
    };

    AggregatedSeries {
        name: name.to_string(),
        points,
    }
}
