//! Column statistics.
//!
//! Describe rows, value counts and correlation matrices are computed by
//! polars. Box plot whiskers, kernel densities and histogram bins are plot
//! geometry over plain `f64` slices.

use crate::config::CorrelationMethod;
use crate::error::Result;
use crate::utils::float_values;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Numeric describe row: count, mean, std, min, quartiles, max.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub max: f64,
}

impl Describe {
    /// Values in row order `count, mean, std, min, 25%, 50%, 75%, max`.
    pub fn values(&self) -> [f64; 8] {
        [
            self.count as f64,
            self.mean,
            self.std,
            self.min,
            self.q25,
            self.q50,
            self.q75,
            self.max,
        ]
    }
}

/// Row labels matching [`Describe::values`].
pub const DESCRIBE_INDEX: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

/// Describe a numeric series. Nulls and NaN are missing; infinities count
/// as values. Statistics of an empty column are NaN.
pub fn describe(series: &Series) -> Result<Describe> {
    let values = float_values(series)?;
    let quantile = |q: f64| -> Result<f64> {
        Ok(values
            .quantile(q, QuantileMethod::Linear)?
            .unwrap_or(f64::NAN))
    };

    Ok(Describe {
        count: values.len() - values.null_count(),
        mean: values.mean().unwrap_or(f64::NAN),
        std: values.std(1).unwrap_or(f64::NAN),
        min: values.min().unwrap_or(f64::NAN),
        q25: quantile(0.25)?,
        q50: quantile(0.5)?,
        q75: quantile(0.75)?,
        max: values.max().unwrap_or(f64::NAN),
    })
}

/// Distinct non-null values with their counts, most frequent first. Ties
/// are ordered by value.
pub fn value_counts(series: &Series) -> Result<DataFrame> {
    let count_name = if series.name().as_str() == "count" {
        "frequency"
    } else {
        "count"
    };
    let counts = series
        .drop_nulls()
        .value_counts(false, false, count_name.into(), false)?;
    Ok(counts.sort(
        [count_name, series.name().as_str()],
        SortMultipleOptions::default()
            .with_order_descending_multi([true, false])
            .with_maintain_order(true),
    )?)
}

/// Pairwise-complete correlation matrix of numeric series, in input order.
pub fn correlation_matrix(columns: &[&Series], method: CorrelationMethod) -> Result<Vec<Vec<f64>>> {
    let frame = DataFrame::new(
        columns
            .iter()
            .enumerate()
            .map(|(i, s)| Ok(float_values(s)?.with_name(format!("c{i}").into()).into_column()))
            .collect::<Result<Vec<Column>>>()?,
    )?;

    let n = columns.len();
    let mut exprs = Vec::with_capacity(n * (n + 1) / 2);
    for i in 0..n {
        for j in i..n {
            let (a, b) = (col(format!("c{i}")), col(format!("c{j}")));
            let r = match method {
                CorrelationMethod::Pearson => pearson_corr(a, b),
                CorrelationMethod::Spearman => spearman_rank_corr(a, b, false),
            };
            exprs.push(r.cast(DataType::Float64).alias(format!("{i}_{j}")));
        }
    }
    let result = frame.lazy().select(exprs).collect()?;

    let mut matrix = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = result
                .column(&format!("{i}_{j}"))?
                .f64()?
                .get(0)
                .unwrap_or(f64::NAN);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }
    Ok(matrix)
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

fn std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64;
    variance.sqrt()
}

/// Quantile of sorted values with linear interpolation (`q` in `0..=1`).
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let k = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let f = k.floor() as usize;
            let c = k.ceil() as usize;
            if f == c || c >= n {
                sorted[f.min(n - 1)]
            } else {
                let d = k - f as f64;
                sorted[f] * (1.0 - d) + sorted[c] * d
            }
        }
    }
}

/// Box plot statistics using the 1.5 * IQR whisker rule.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    /// Lowest value inside the lower fence
    pub whisker_low: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Highest value inside the upper fence
    pub whisker_high: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let sorted: Vec<f64> = sorted(values)
            .into_iter()
            .filter(|v| v.is_finite())
            .collect();
        if sorted.is_empty() {
            return None;
        }

        let q1 = quantile_sorted(&sorted, 0.25);
        let median = quantile_sorted(&sorted, 0.5);
        let q3 = quantile_sorted(&sorted, 0.75);
        let iqr = q3 - q1;
        let lower_fence = q1 - 1.5 * iqr;
        let upper_fence = q3 + 1.5 * iqr;

        let whisker_low = sorted
            .iter()
            .copied()
            .find(|&v| v >= lower_fence)
            .unwrap_or(sorted[0]);
        let whisker_high = sorted
            .iter()
            .rev()
            .copied()
            .find(|&v| v <= upper_fence)
            .unwrap_or(sorted[sorted.len() - 1]);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|&v| v < lower_fence || v > upper_fence)
            .collect();

        Some(Self {
            whisker_low,
            q1,
            median,
            q3,
            whisker_high,
            outliers,
        })
    }
}

/// Gaussian kernel density estimate evaluated on `n_points` evenly spaced
/// positions spanning the data plus three bandwidths on each side.
///
/// Bandwidth follows Silverman's rule of thumb. Returns an empty curve for
/// fewer than two distinct values.
pub fn gaussian_kde(values: &[f64], n_points: usize) -> Vec<(f64, f64)> {
    let clean: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if clean.len() < 2 || n_points < 2 {
        return Vec::new();
    }

    let sorted = sorted(&clean);
    let (min, max) = (sorted[0], sorted[sorted.len() - 1]);
    if max == min {
        return Vec::new();
    }

    let n = clean.len() as f64;
    let sd = std_dev(&clean);
    let iqr = quantile_sorted(&sorted, 0.75) - quantile_sorted(&sorted, 0.25);
    let spread = if iqr > 0.0 { sd.min(iqr / 1.34) } else { sd };
    let h = (1.06 * spread * n.powf(-0.2)).max((max - min) * 0.01);

    let lo = min - 3.0 * h;
    let hi = max + 3.0 * h;
    let step = (hi - lo) / (n_points - 1) as f64;
    let norm = 1.0 / (n * h * (2.0 * std::f64::consts::PI).sqrt());

    (0..n_points)
        .map(|i| {
            let x = lo + i as f64 * step;
            let density: f64 = clean
                .iter()
                .map(|&xi| {
                    let u = (x - xi) / h;
                    (-0.5 * u * u).exp()
                })
                .sum();
            (x, density * norm)
        })
        .collect()
}

/// Equal-width histogram. Returns `(left edge, right edge, count)` per bin;
/// the last bin is closed on the right.
pub fn histogram(values: &[f64], bins: usize) -> Vec<(f64, f64, usize)> {
    let clean: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if clean.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = clean.iter().copied().fold(f64::INFINITY, f64::min);
    let max = clean.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (lo, hi) = if max > min {
        (min, max)
    } else {
        (min - 0.5, max + 0.5)
    };
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0usize; bins];
    for v in clean {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| (lo + i as f64 * width, lo + (i + 1) as f64 * width, count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== describe tests ====================

    #[test]
    fn test_std_dev_sample() {
        // Variance = 10 / 4 = 2.5
        let std = std_dev(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!((std - 2.5f64.sqrt()).abs() < 1e-12);
        assert!(std_dev(&[5.0]).is_nan());
    }

    #[test]
    fn test_quantile_linear() {
        let sorted = [25.0, 30.0, 35.0];
        assert_eq!(quantile_sorted(&sorted, 0.25), 27.5);
        assert_eq!(quantile_sorted(&sorted, 0.5), 30.0);
        assert_eq!(quantile_sorted(&sorted, 0.75), 32.5);
        assert_eq!(quantile_sorted(&[7.0], 0.75), 7.0);
        assert!(quantile_sorted(&[], 0.5).is_nan());
    }

    #[test]
    fn test_describe_ages() {
        let s = Series::new("Age".into(), &[25.0, 30.0, 35.0]);
        let d = describe(&s).unwrap();
        assert_eq!(d.count, 3);
        assert_eq!(d.mean, 30.0);
        assert_eq!(d.std, 5.0);
        assert_eq!(d.min, 25.0);
        assert_eq!(d.q25, 27.5);
        assert_eq!(d.q75, 32.5);
        assert_eq!(d.max, 35.0);
    }

    #[test]
    fn test_describe_counts_infinity() {
        let s = Series::new("v".into(), &[1.0, f64::INFINITY, 3.0]);
        let d = describe(&s).unwrap();
        assert_eq!(d.count, 3);
        assert_eq!(d.min, 1.0);
        assert_eq!(d.max, f64::INFINITY);
        assert_eq!(d.q50, 3.0);
    }

    #[test]
    fn test_describe_skips_nan_and_null() {
        let s = Series::new("v".into(), &[Some(1.0), None, Some(f64::NAN), Some(3.0)]);
        let d = describe(&s).unwrap();
        assert_eq!(d.count, 2);
        assert_eq!(d.mean, 2.0);

        let empty = Series::new("e".into(), &[None::<f64>, None]);
        let d = describe(&empty).unwrap();
        assert_eq!(d.count, 0);
        assert!(d.mean.is_nan());
        assert!(d.std.is_nan());
        assert!(d.max.is_nan());
    }

    #[test]
    fn test_describe_single_value_has_nan_std() {
        let s = Series::new("v".into(), &[4i64]);
        let d = describe(&s).unwrap();
        assert_eq!(d.count, 1);
        assert!(d.std.is_nan());
        assert_eq!(d.q75, 4.0);
    }

    // ==================== value count tests ====================

    #[test]
    fn test_value_counts_most_frequent_first() {
        let s = Series::new("g".into(), &[Some("b"), Some("a"), None, Some("b"), Some("c"), Some("a"), Some("b")]);
        let counts = value_counts(&s).unwrap();
        let values: Vec<_> = counts
            .column("g")
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(values, vec!["b", "a", "c"]);
        let freq = counts.column("count").unwrap().cast(&DataType::UInt64).unwrap();
        assert_eq!(freq.u64().unwrap().get(0), Some(3));
    }

    #[test]
    fn test_value_counts_column_named_count() {
        let s = Series::new("count".into(), &[1i32, 1, 2]);
        let counts = value_counts(&s).unwrap();
        assert!(counts.column("frequency").is_ok());
        assert_eq!(counts.height(), 2);
    }

    // ==================== correlation tests ====================

    #[test]
    fn test_pearson_matrix() {
        let x = Series::new("x".into(), &[1.0, 2.0, 3.0, 4.0]);
        let y = Series::new("y".into(), &[2.0, 4.0, 6.0, 8.0]);
        let z = Series::new("z".into(), &[8.0, 6.0, 4.0, 2.0]);
        let m = correlation_matrix(&[&x, &y, &z], CorrelationMethod::Pearson).unwrap();
        assert!((m[0][0] - 1.0).abs() < 1e-12);
        assert!((m[0][1] - 1.0).abs() < 1e-12);
        assert!((m[0][2] + 1.0).abs() < 1e-12);
        assert_eq!(m[2][0], m[0][2]);
    }

    #[test]
    fn test_pearson_constant_is_nan() {
        let x = Series::new("x".into(), &[1.0, 2.0, 3.0]);
        let c = Series::new("c".into(), &[4.0, 4.0, 4.0]);
        let m = correlation_matrix(&[&x, &c], CorrelationMethod::Pearson).unwrap();
        assert!(m[0][1].is_nan());
    }

    #[test]
    fn test_spearman_monotonic() {
        let x = Series::new("x".into(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let y = Series::new("y".into(), &[1.0, 4.0, 9.0, 16.0, 100.0]);
        let m = correlation_matrix(&[&x, &y], CorrelationMethod::Spearman).unwrap();
        assert!((m[0][1] - 1.0).abs() < 1e-12);
    }

    // ==================== plot helper tests ====================

    #[test]
    fn test_box_stats_outlier() {
        let stats =
            BoxStats::from_values(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 100.0]).unwrap();
        assert_eq!(stats.outliers, vec![100.0]);
        assert_eq!(stats.whisker_high, 9.0);
        assert_eq!(stats.whisker_low, 1.0);
        assert!(BoxStats::from_values(&[]).is_none());
    }

    #[test]
    fn test_kde_integrates_to_one() {
        let values = [1.0, 2.0, 2.5, 3.0, 4.0, 4.5, 6.0];
        let curve = gaussian_kde(&values, 200);
        assert_eq!(curve.len(), 200);
        let step = curve[1].0 - curve[0].0;
        let area: f64 = curve.iter().map(|(_, d)| d * step).sum();
        assert!((area - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_kde_degenerate() {
        assert!(gaussian_kde(&[3.0, 3.0, 3.0], 50).is_empty());
        assert!(gaussian_kde(&[3.0], 50).is_empty());
    }

    #[test]
    fn test_histogram_counts() {
        let bins = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].2 + bins[1].2, 5);
        assert_eq!(bins[1].1, 4.0);
        assert_eq!(histogram(&[2.0, 2.0], 3).iter().map(|b| b.2).sum::<usize>(), 2);
    }
}
