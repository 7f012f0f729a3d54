//! Descriptive statistics for a [`Table`].
//!
//! Each summary covers one column kind and returns `Ok(None)` when the table
//! has no column of that kind. Missing data is never an error here.

pub mod statistics;

use crate::config::CorrelationMethod;
use crate::error::Result;
use crate::loader::Table;
use crate::types::{
    CategoricalSummary, CorrelationMatrix, DataInfo, DatePart, DatetimeDecomposition,
    DatetimeSummary, FeatureInfo, SummarySnapshot, TableData,
};
use crate::utils::{
    dtype_label, format_datetime, format_percent, format_rounded, round2, series_to_datetimes,
    series_to_strings,
};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use tracing::debug;

use statistics::{DESCRIBE_INDEX, correlation_matrix, describe, value_counts};

/// Rows shown in the head table.
pub const HEAD_ROWS: usize = 5;

/// Computes the summaries of one table.
///
/// # Example
///
/// ```rust,ignore
/// let summary = DataSummary::new(&table).with_exclude(["Name"]);
/// let info = summary.data_info()?;
/// let numeric = summary.numerical_summary()?;
/// ```
#[derive(Debug, Clone)]
pub struct DataSummary<'a> {
    table: &'a Table,
    exclude: Vec<String>,
    correlation_method: CorrelationMethod,
}

impl<'a> DataSummary<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self {
            table,
            exclude: Vec::new(),
            correlation_method: CorrelationMethod::default(),
        }
    }

    /// Columns left out of the categorical features listing.
    pub fn with_exclude<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_correlation_method(mut self, method: CorrelationMethod) -> Self {
        self.correlation_method = method;
        self
    }

    pub fn table(&self) -> &Table {
        self.table
    }

    // ===== Data information =====

    /// Shape, head, column listing, null counts and duplicate rows.
    pub fn data_info(&self) -> Result<DataInfo> {
        let df = self.table.frame();
        let nulls: Vec<(String, usize)> = df
            .get_columns()
            .iter()
            .map(|c| (c.name().to_string(), c.null_count()))
            .collect();

        let duplicates = if df.width() == 0 || df.height() == 0 {
            0
        } else {
            let unique = df.unique::<&str, &str>(None, UniqueKeepStrategy::First, None)?;
            df.height() - unique.height()
        };

        Ok(DataInfo {
            info: info_text(df),
            shape: df.shape(),
            head: TableData::from_frame(&df.head(Some(HEAD_ROWS)))?,
            nulls,
            duplicates,
        })
    }

    // ===== Numerical summary =====

    /// `count, mean, std, min, 25%, 50%, 75%, max` per numeric column,
    /// rounded to two decimals.
    pub fn numerical_summary(&self) -> Result<Option<TableData>> {
        let columns = self.table.numeric_columns();
        if columns.is_empty() {
            debug!("No numerical columns to summarize");
            return Ok(None);
        }

        let mut per_column = Vec::with_capacity(columns.len());
        for name in &columns {
            let d = describe(self.table.series(name)?)?;
            per_column.push(d.values().iter().map(|v| format_rounded(*v)).collect::<Vec<_>>());
        }

        let rows = (0..DESCRIBE_INDEX.len())
            .map(|i| per_column.iter().map(|cells| cells[i].clone()).collect())
            .collect();
        let index = DESCRIBE_INDEX.iter().map(|s| s.to_string()).collect();
        Ok(Some(TableData::new(columns, index, rows)?))
    }

    // ===== Categorical summary =====

    /// `count, unique, top, freq` per categorical column, plus the unique
    /// values of every categorical column not in the exclusion list.
    pub fn categorical_summary(&self) -> Result<Option<CategoricalSummary>> {
        let columns = self.table.categorical_columns();
        if columns.is_empty() {
            debug!("No categorical columns to summarize");
            return Ok(None);
        }

        let mut per_column = Vec::with_capacity(columns.len());
        let mut features = Vec::new();

        for name in &columns {
            let series = self.table.series(name)?;
            let present = series.drop_nulls();
            let (values, counts) = counted_values(&present)?;

            let (top, freq) = match (values.first(), counts.first()) {
                (Some(v), Some(c)) => (v.clone(), c.to_string()),
                _ => ("NaN".to_string(), "NaN".to_string()),
            };
            per_column.push(vec![
                present.len().to_string(),
                present.n_unique()?.to_string(),
                top,
                freq,
            ]);

            if !self.exclude.contains(name) {
                let uniques: Vec<String> = series_to_strings(&present.unique_stable()?)?
                    .into_iter()
                    .flatten()
                    .collect();
                features.push(FeatureInfo {
                    column: name.clone(),
                    num_features: uniques.len(),
                    features: uniques,
                });
            }
        }

        let rows = (0..4)
            .map(|i| per_column.iter().map(|cells| cells[i].clone()).collect())
            .collect();
        let index = ["count", "unique", "top", "freq"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        Ok(Some(CategoricalSummary {
            table: TableData::new(columns, index, rows)?,
            features,
        }))
    }

    // ===== Datetime summary =====

    /// `min, max, nunique` per datetime column, plus value counts of the
    /// year, month, day and weekday (Monday = 0) of every datetime column.
    pub fn datetime_summary(&self) -> Result<Option<DatetimeSummary>> {
        let columns = self.table.datetime_columns();
        if columns.is_empty() {
            debug!("No datetime columns to summarize");
            return Ok(None);
        }

        let mut per_column = Vec::with_capacity(columns.len());
        let mut decompositions = Vec::with_capacity(columns.len());

        for name in &columns {
            let series = self.table.series(name)?;
            let date_only = matches!(series.dtype(), DataType::Date);
            let present = series.drop_nulls();
            let sorted = present.sort(SortOptions::default())?;

            let render = |edge: Series| -> Result<String> {
                Ok(series_to_datetimes(&edge)?
                    .into_iter()
                    .flatten()
                    .next()
                    .map(|dt| format_datetime(&dt, date_only))
                    .unwrap_or_else(|| "NaT".to_string()))
            };
            per_column.push(vec![
                render(sorted.head(Some(1)))?,
                render(sorted.tail(Some(1)))?,
                present.n_unique()?.to_string(),
            ]);

            let mut parts = Vec::with_capacity(DatePart::ALL.len());
            for part in DatePart::ALL {
                let (index, counts) = counted_values(&date_component(&present, part)?)?;
                let rows = counts.iter().map(|c| vec![c.to_string()]).collect();
                parts.push((part, TableData::new(vec!["count".to_string()], index, rows)?));
            }
            decompositions.push(DatetimeDecomposition {
                column: name.clone(),
                parts,
            });
        }

        let rows = (0..3)
            .map(|i| per_column.iter().map(|cells| cells[i].clone()).collect())
            .collect();
        let index = ["min", "max", "nunique"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        Ok(Some(DatetimeSummary {
            summary: TableData::new(columns, index, rows)?,
            columns: decompositions,
        }))
    }

    // ===== Correlation =====

    /// Correlation matrix of the numeric columns with the configured method.
    pub fn correlation(&self) -> Result<Option<CorrelationMatrix>> {
        self.correlation_with(self.correlation_method)
    }

    /// Pairwise-complete correlation matrix, rounded to two decimals.
    pub fn correlation_with(&self, method: CorrelationMethod) -> Result<Option<CorrelationMatrix>> {
        let columns = self.table.numeric_columns();
        if columns.is_empty() {
            return Ok(None);
        }

        let series = columns
            .iter()
            .map(|name| self.table.series(name))
            .collect::<Result<Vec<_>>>()?;
        let values = correlation_matrix(&series, method)?
            .into_iter()
            .map(|row| row.into_iter().map(round2).collect())
            .collect();

        Ok(Some(CorrelationMatrix { columns, values }))
    }

    // ===== Snapshot =====

    /// Every summary in one serializable value.
    pub fn snapshot(&self, dataset_name: &str) -> Result<SummarySnapshot> {
        let info = self.data_info()?;
        let column_kinds = self
            .table
            .column_names()
            .into_iter()
            .filter_map(|name| self.table.kind(&name).map(|kind| (name, kind)))
            .collect();

        Ok(SummarySnapshot {
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            dataset_name: dataset_name.to_string(),
            shape: info.shape,
            column_kinds,
            duplicate_ratio: format_percent(info.duplicates, info.shape.0),
            nulls: info.nulls,
            duplicates: info.duplicates,
            numerical: self.numerical_summary()?,
            categorical: self.categorical_summary()?,
            datetime: self.datetime_summary()?,
            correlation: self.correlation()?,
        })
    }
}

/// Rendered distinct values and their counts, most frequent first.
fn counted_values(series: &Series) -> Result<(Vec<String>, Vec<u64>)> {
    let counts = value_counts(series)?;
    let columns = counts.get_columns();
    let values = series_to_strings(columns[0].as_materialized_series())?
        .into_iter()
        .map(|v| v.unwrap_or_default())
        .collect();
    let freq = columns[1].cast(&DataType::UInt64)?;
    let freq = freq.u64()?.into_no_null_iter().collect();
    Ok((values, freq))
}

/// Calendar component of a date or datetime series. Weekdays count from
/// Monday = 0.
fn date_component(series: &Series, part: DatePart) -> Result<Series> {
    let component = match part {
        DatePart::Year => series.year()?.into_series(),
        DatePart::Month => series.month()?.into_series(),
        DatePart::Day => series.day()?.into_series(),
        DatePart::DayOfWeek => (series.weekday()? - 1).into_series(),
    };
    Ok(component.with_name(part.as_str().into()))
}

/// Column listing: position, name, non-null count and dtype, then dtype
/// counts and memory usage.
fn info_text(df: &DataFrame) -> String {
    let mut out = String::new();
    let height = df.height();

    let _ = writeln!(out, "<class 'DataFrame'>");
    if height == 0 {
        let _ = writeln!(out, "RangeIndex: 0 entries");
    } else {
        let _ = writeln!(out, "RangeIndex: {} entries, 0 to {}", height, height - 1);
    }
    let _ = writeln!(out, "Data columns (total {} columns):", df.width());

    let name_width = df
        .get_column_names()
        .iter()
        .map(|n| n.chars().count())
        .max()
        .unwrap_or(0)
        .max("Column".len());

    let _ = writeln!(
        out,
        " #   {:<name_width$}  Non-Null Count  Dtype",
        "Column"
    );
    let _ = writeln!(
        out,
        "---  {:<name_width$}  --------------  -----",
        "------"
    );

    let mut dtype_counts: BTreeMap<String, usize> = BTreeMap::new();
    for (i, column) in df.get_columns().iter().enumerate() {
        let label = dtype_label(column.dtype());
        let non_null = format!("{} non-null", height - column.null_count());
        let _ = writeln!(
            out,
            " {:<3} {:<name_width$}  {:<14}  {}",
            i,
            column.name().as_str(),
            non_null,
            label
        );
        *dtype_counts.entry(label).or_insert(0) += 1;
    }

    let dtypes: Vec<String> = dtype_counts
        .iter()
        .map(|(label, count)| format!("{label}({count})"))
        .collect();
    let _ = writeln!(out, "dtypes: {}", dtypes.join(", "));
    let _ = write!(out, "memory usage: {}", format_bytes(df.estimated_size()));
    out
}

fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{bytes} bytes");
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}
