use crate::error::{EdaError, Result};
use crate::utils::series_to_strings;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Analysis kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Datetime,
    /// Booleans and nested types; excluded from every column set.
    Other,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Datetime => "datetime",
            ColumnKind::Other => "other",
        };
        f.write_str(label)
    }
}

// ============================================================================
// Uniform Rectangular Table
// ============================================================================

/// A rectangular table of display strings with an index column.
///
/// Every table that reaches the report (head, describe, value counts, ...)
/// is converted to this shape first; the paginator only ever lays out
/// `TableData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub columns: Vec<String>,
    pub index: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableData {
    /// Build a table, checking that every row matches the header width and
    /// the index length matches the row count.
    pub fn new(columns: Vec<String>, index: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if index.len() != rows.len() {
            return Err(EdaError::ColumnLengthMismatch {
                expected: rows.len(),
                found: index.len(),
            });
        }
        if let Some(row) = rows.iter().find(|row| row.len() != columns.len()) {
            return Err(EdaError::ColumnLengthMismatch {
                expected: columns.len(),
                found: row.len(),
            });
        }
        Ok(Self {
            columns,
            index,
            rows,
        })
    }

    /// Build a table from named columns of equal length with a positional
    /// index (`0..n`).
    pub fn from_columns(columns: Vec<(String, Vec<String>)>) -> Result<Self> {
        let height = columns.first().map(|(_, values)| values.len()).unwrap_or(0);
        if let Some((_, values)) = columns.iter().find(|(_, values)| values.len() != height) {
            return Err(EdaError::ColumnLengthMismatch {
                expected: height,
                found: values.len(),
            });
        }
        let names: Vec<String> = columns.iter().map(|(name, _)| name.clone()).collect();
        let rows = (0..height)
            .map(|i| columns.iter().map(|(_, values)| values[i].clone()).collect())
            .collect();
        Self::new(names, (0..height).map(|i| i.to_string()).collect(), rows)
    }

    /// Convert a polars frame, rendering nulls as `None`.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let mut columns = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let values = series_to_strings(column.as_materialized_series())?
                .into_iter()
                .map(|v| v.unwrap_or_else(|| "None".to_string()))
                .collect();
            columns.push((column.name().to_string(), values));
        }
        Self::from_columns(columns)
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.rows.is_empty()
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// Cell lookup by index label and column name.
    pub fn cell(&self, index: &str, column: &str) -> Option<&str> {
        let row = self.index.iter().position(|i| i == index)?;
        let col = self.columns.iter().position(|c| c == column)?;
        Some(self.rows[row][col].as_str())
    }
}

// ============================================================================
// Summary Types
// ============================================================================

/// Output of the data information step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataInfo {
    /// Column listing with non-null counts, dtypes and memory usage.
    pub info: String,
    /// (rows, columns)
    pub shape: (usize, usize),
    /// First five rows.
    pub head: TableData,
    /// Null count per column, in column order.
    pub nulls: Vec<(String, usize)>,
    /// Number of rows that repeat an earlier row.
    pub duplicates: usize,
}

/// Unique values of one categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureInfo {
    pub column: String,
    /// Unique values in order of first appearance.
    pub features: Vec<String>,
    pub num_features: usize,
}

/// Categorical describe table plus per-column feature listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalSummary {
    /// Rows `count`, `unique`, `top`, `freq`; one column per categorical column.
    pub table: TableData,
    pub features: Vec<FeatureInfo>,
}

/// Calendar component used for datetime decompositions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePart {
    Year,
    Month,
    Day,
    DayOfWeek,
}

impl DatePart {
    pub const ALL: [DatePart; 4] = [
        DatePart::Year,
        DatePart::Month,
        DatePart::Day,
        DatePart::DayOfWeek,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatePart::Year => "year",
            DatePart::Month => "month",
            DatePart::Day => "day",
            DatePart::DayOfWeek => "dayofweek",
        }
    }
}

impl fmt::Display for DatePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value counts of every calendar component of one datetime column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatetimeDecomposition {
    pub column: String,
    /// One value-count table per part (index = component value, column `count`).
    pub parts: Vec<(DatePart, TableData)>,
}

/// Datetime column summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatetimeSummary {
    /// Rows `min`, `max`, `nunique`; one column per datetime column.
    pub summary: TableData,
    pub columns: Vec<DatetimeDecomposition>,
}

/// Square correlation matrix over the numeric columns, rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == row)?;
        let j = self.columns.iter().position(|c| c == col)?;
        Some(self.values[i][j])
    }
}

/// Serializable snapshot of every summary, used for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarySnapshot {
    pub generated_at: String,
    pub dataset_name: String,
    pub shape: (usize, usize),
    pub column_kinds: BTreeMap<String, ColumnKind>,
    pub nulls: Vec<(String, usize)>,
    pub duplicates: usize,
    pub duplicate_ratio: String,
    pub numerical: Option<TableData>,
    pub categorical: Option<CategoricalSummary>,
    pub datetime: Option<DatetimeSummary>,
    pub correlation: Option<CorrelationMatrix>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_from_columns() {
        let table = TableData::from_columns(vec![
            ("Name".to_string(), vec!["A".to_string(), "B".to_string()]),
            ("Age".to_string(), vec!["25".to_string(), "30".to_string()]),
        ])
        .unwrap();

        assert_eq!(table.width(), 2);
        assert_eq!(table.height(), 2);
        assert_eq!(table.index, vec!["0", "1"]);
        assert_eq!(table.cell("1", "Age"), Some("30"));
        assert_eq!(table.column("Name"), Some(vec!["A", "B"]));
    }

    #[test]
    fn test_table_rejects_ragged_columns() {
        let result = TableData::from_columns(vec![
            ("a".to_string(), vec!["1".to_string()]),
            ("b".to_string(), vec![]),
        ]);
        assert!(matches!(result, Err(EdaError::ColumnLengthMismatch { .. })));
    }

    #[test]
    fn test_table_from_frame_renders_nulls() {
        let df = df! {
            "x" => [Some(1i64), None],
            "y" => ["a", "b"],
        }
        .unwrap();
        let table = TableData::from_frame(&df).unwrap();
        assert_eq!(table.cell("1", "x"), Some("None"));
        assert_eq!(table.cell("0", "y"), Some("a"));
    }

    #[test]
    fn test_correlation_lookup() {
        let matrix = CorrelationMatrix {
            columns: vec!["a".to_string(), "b".to_string()],
            values: vec![vec![1.0, 0.5], vec![0.5, 1.0]],
        };
        assert_eq!(matrix.get("a", "b"), Some(0.5));
        assert_eq!(matrix.get("a", "z"), None);
        assert_eq!(matrix.len(), 2);
    }
}
