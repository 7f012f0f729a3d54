//! Input normalization.
//!
//! Every supported input shape (in-memory frames, JSON-like columns, records
//! and rows, numeric arrays, CSV, JSON and Parquet files) is converted into a
//! [`Table`]: a polars `DataFrame` plus the analysis kind of every column.

mod datetime;
mod json;

use crate::error::{EdaError, Result, ResultExt};
use crate::types::ColumnKind;
use crate::utils::{DtypeCategory, get_dtype_category};
use polars::prelude::*;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Rows scanned to infer CSV column types.
const CSV_SCHEMA_ROWS: usize = 100;

/// A tabular input in one of the supported shapes.
#[derive(Debug, Clone)]
pub enum TableInput {
    /// An already-built frame, used as is.
    Frame(DataFrame),
    /// Named columns of JSON values.
    Columns(Vec<(String, Vec<Value>)>),
    /// A sequence of records keyed by column name.
    Records(Vec<Map<String, Value>>),
    /// Positional rows; names come from [`DataLoader::with_column_names`].
    Rows(Vec<Vec<Value>>),
    /// A 2-D numeric array; names come from [`DataLoader::with_column_names`].
    Array(Vec<Vec<f64>>),
    /// A JSON file holding records, rows or columns.
    JsonFile(PathBuf),
    /// JSON text holding records, rows or columns.
    JsonText(String),
    /// A CSV file with a header row.
    Csv(PathBuf),
    /// A Parquet file.
    Parquet(PathBuf),
}

impl TableInput {
    /// Pick the file input variant from the path extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("csv") => Ok(TableInput::Csv(path.to_path_buf())),
            Some("json") => Ok(TableInput::JsonFile(path.to_path_buf())),
            Some("parquet") | Some("pq") => Ok(TableInput::Parquet(path.to_path_buf())),
            _ => Err(EdaError::UnsupportedInput(format!(
                "cannot infer the format of '{}' (expected .csv, .json or .parquet)",
                path.display()
            ))),
        }
    }
}

impl From<DataFrame> for TableInput {
    fn from(df: DataFrame) -> Self {
        TableInput::Frame(df)
    }
}

/// Builds a [`Table`] from a [`TableInput`].
///
/// # Example
///
/// ```rust,ignore
/// use lex_eda::loader::{DataLoader, TableInput};
/// use serde_json::json;
///
/// let table = DataLoader::new(TableInput::Rows(vec![
///     vec![json!("Alice"), json!(25)],
///     vec![json!("Bob"), json!(30)],
/// ]))
/// .with_column_names(["Name", "Age"])
/// .load()?;
/// ```
#[derive(Debug, Clone)]
pub struct DataLoader {
    input: TableInput,
    column_names: Option<Vec<String>>,
    parse_dates: bool,
}

impl DataLoader {
    pub fn new(input: impl Into<TableInput>) -> Self {
        Self {
            input: input.into(),
            column_names: None,
            parse_dates: true,
        }
    }

    /// Column names for inputs that carry none. Ignored for other inputs.
    pub fn with_column_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Names given as an optional list, as carried by the configuration.
    pub fn with_optional_column_names(mut self, names: Option<Vec<String>>) -> Self {
        self.column_names = names;
        self
    }

    /// Convert date-like string columns to datetimes (default: on).
    /// Frames are never converted.
    pub fn parse_dates(mut self, enabled: bool) -> Self {
        self.parse_dates = enabled;
        self
    }

    /// Normalize the input into a [`Table`].
    pub fn load(self) -> Result<Table> {
        let names = self.column_names.as_deref();
        let convert_dates = self.parse_dates && !matches!(self.input, TableInput::Frame(_));

        let df = match self.input {
            TableInput::Frame(df) => df,
            TableInput::Columns(columns) => json::columns_to_frame(columns)?,
            TableInput::Records(records) => json::records_to_frame(&records)?,
            TableInput::Rows(rows) => json::rows_to_frame(&rows, names)?,
            TableInput::Array(array) => array_to_frame(&array, names)?,
            TableInput::JsonText(text) => {
                let value: Value = serde_json::from_str(&text)?;
                json::json_to_frame(value, names)?
            }
            TableInput::JsonFile(path) => {
                info!("Loading JSON: {}", path.display());
                let text = std::fs::read_to_string(&path)?;
                let value: Value = serde_json::from_str(&text)?;
                json::json_to_frame(value, names)
                    .context(format!("While loading {}", path.display()))?
            }
            TableInput::Csv(path) => {
                info!("Loading CSV: {}", path.display());
                load_csv_with_fallbacks(&path)?
            }
            TableInput::Parquet(path) => {
                info!("Loading Parquet: {}", path.display());
                let file = std::fs::File::open(&path)?;
                ParquetReader::new(file)
                    .finish()
                    .context(format!("While loading {}", path.display()))?
            }
        };

        let df = if convert_dates { convert_date_columns(df)? } else { df };
        debug!("Loaded table with shape {:?}", df.shape());
        Ok(Table::new(df))
    }
}

/// Build a frame from a numeric 2-D array.
fn array_to_frame(array: &[Vec<f64>], names: Option<&[String]>) -> Result<DataFrame> {
    let rows: Vec<Vec<Value>> = array
        .iter()
        .map(|row| {
            row.iter()
                .map(|v| serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number))
                .collect()
        })
        .collect();
    let df = json::rows_to_frame(&rows, names)?;

    // Arrays are float arrays even when every value is integral.
    let columns = df
        .get_columns()
        .iter()
        .map(|c| c.cast(&DataType::Float64))
        .collect::<PolarsResult<Vec<_>>>()?;
    Ok(DataFrame::new(columns)?)
}

/// Replace string columns whose every value is a date by datetime columns.
fn convert_date_columns(mut df: DataFrame) -> Result<DataFrame> {
    let candidates: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|c| c.dtype() == &DataType::String)
        .map(|c| c.name().to_string())
        .collect();

    for name in candidates {
        let series = df.column(&name)?.as_materialized_series().clone();
        if let Some(parsed) = datetime::try_parse_datetime_column(&series)? {
            debug!("Parsed column '{}' as datetime", name);
            df.replace(&name, parsed)?;
        }
    }
    Ok(df)
}

/// Read a CSV file, first with `"` as the quote character, then without
/// quoting, and finally from a copy with doubled quotes and blank lines
/// removed.
fn load_csv_with_fallbacks(path: &Path) -> Result<DataFrame> {
    for quote in [Some(b'"'), None] {
        let attempt = CsvReadOptions::default()
            .with_infer_schema_length(Some(CSV_SCHEMA_ROWS))
            .with_has_header(true)
            .with_parse_options(CsvParseOptions::default().with_quote_char(quote))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish();
        match attempt {
            Ok(df) => return Ok(df),
            Err(e) => debug!(
                "CSV read of {} with quote {:?} failed: {}",
                path.display(),
                quote.map(char::from),
                e
            ),
        }
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        error!("Could not read {}: {}", path.display(), e);
        EdaError::from(e)
    })?;
    info!("Retrying {} with doubled quotes collapsed", path.display());
    CsvReadOptions::default()
        .with_infer_schema_length(Some(CSV_SCHEMA_ROWS))
        .with_has_header(true)
        .into_reader_with_file_handle(std::io::Cursor::new(clean_csv_content(&content)))
        .finish()
        .context(format!("While loading {}", path.display()))
}

/// Collapse doubled quotes and drop blank lines.
fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Classify a column the way the summaries and plots see it.
pub fn classify_dtype(dtype: &DataType) -> ColumnKind {
    match get_dtype_category(dtype) {
        DtypeCategory::Numeric => ColumnKind::Numeric,
        DtypeCategory::String => ColumnKind::Categorical,
        DtypeCategory::Datetime => ColumnKind::Datetime,
        DtypeCategory::Boolean | DtypeCategory::Other => ColumnKind::Other,
    }
}

// =============================================================================
// Table
// =============================================================================

/// A normalized table: a frame plus the kind of each column.
///
/// Column kinds are computed once on construction; the table is immutable
/// afterwards so the kinds can never go stale.
#[derive(Debug, Clone)]
pub struct Table {
    df: DataFrame,
    kinds: Vec<ColumnKind>,
}

impl Table {
    pub fn new(df: DataFrame) -> Self {
        let kinds = df
            .get_columns()
            .iter()
            .map(|c| classify_dtype(c.dtype()))
            .collect();
        Self { df, kinds }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn into_frame(self) -> DataFrame {
        self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn width(&self) -> usize {
        self.df.width()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0 || self.df.width() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect()
    }

    /// Kind of a column, or `None` if the column does not exist.
    pub fn kind(&self, name: &str) -> Option<ColumnKind> {
        self.df
            .get_column_names()
            .iter()
            .position(|n| n.as_str() == name)
            .map(|i| self.kinds[i])
    }

    /// Names of the columns of one kind, in frame order.
    pub fn columns_of(&self, kind: ColumnKind) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .zip(&self.kinds)
            .filter(|(_, k)| **k == kind)
            .map(|(n, _)| n.to_string())
            .collect()
    }

    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns_of(ColumnKind::Numeric)
    }

    pub fn categorical_columns(&self) -> Vec<String> {
        self.columns_of(ColumnKind::Categorical)
    }

    pub fn datetime_columns(&self) -> Vec<String> {
        self.columns_of(ColumnKind::Datetime)
    }

    pub fn series(&self, name: &str) -> Result<&Series> {
        self.df
            .column(name)
            .map(|c| c.as_materialized_series())
            .map_err(|_| EdaError::ColumnNotFound(name.to_string()))
    }

    /// A copy of the table without the named columns. Unknown names are
    /// ignored.
    pub fn without_columns(&self, excluded: &[String]) -> Result<Table> {
        let keep: Vec<String> = self
            .column_names()
            .into_iter()
            .filter(|name| !excluded.contains(name))
            .collect();
        Ok(Table::new(self.df.select(keep)?))
    }
}

impl From<DataFrame> for Table {
    fn from(df: DataFrame) -> Self {
        Table::new(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn sample_rows() -> Vec<Vec<Value>> {
        vec![
            vec![json!("Alice"), json!(25), json!("Female")],
            vec![json!("Bob"), json!(30), json!("Male")],
            vec![json!("Charlie"), json!(35), json!("Male")],
        ]
    }

    // ==================== input tests ====================

    #[test]
    fn test_rows_with_names() {
        let table = DataLoader::new(TableInput::Rows(sample_rows()))
            .with_column_names(["Name", "Age", "Gender"])
            .load()
            .unwrap();

        assert_eq!(table.height(), 3);
        assert_eq!(table.numeric_columns(), vec!["Age"]);
        assert_eq!(table.categorical_columns(), vec!["Name", "Gender"]);
        assert!(table.datetime_columns().is_empty());
    }

    #[test]
    fn test_rows_default_names() {
        let table = DataLoader::new(TableInput::Rows(sample_rows())).load().unwrap();
        assert_eq!(table.column_names(), vec!["0", "1", "2"]);
    }

    #[test]
    fn test_rows_wrong_name_count() {
        let result = DataLoader::new(TableInput::Rows(sample_rows()))
            .with_column_names(["Name", "Age"])
            .load();
        assert!(matches!(
            result,
            Err(EdaError::ColumnLengthMismatch {
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn test_array_is_float() {
        let table = DataLoader::new(TableInput::Array(vec![vec![1.0, 2.0], vec![3.0, 4.0]]))
            .with_column_names(["a", "b"])
            .load()
            .unwrap();
        assert_eq!(table.series("a").unwrap().dtype(), &DataType::Float64);
        assert_eq!(table.numeric_columns(), vec!["a", "b"]);
    }

    #[test]
    fn test_frame_is_used_as_is() {
        let df = df! {
            "when" => ["2023-01-01", "2023-01-02"],
            "flag" => [true, false],
        }
        .unwrap();
        let table = DataLoader::new(df).load().unwrap();
        assert_eq!(table.kind("when"), Some(ColumnKind::Categorical));
        assert_eq!(table.kind("flag"), Some(ColumnKind::Other));
        assert_eq!(table.kind("missing"), None);
    }

    #[test]
    fn test_json_text_records_with_dates() {
        let text = r#"[
            {"id": 1, "joined": "2021-03-05", "city": "Seoul"},
            {"id": 2, "joined": "2021-04-01", "city": "Busan"}
        ]"#;
        let table = DataLoader::new(TableInput::JsonText(text.to_string()))
            .load()
            .unwrap();
        assert_eq!(table.datetime_columns(), vec!["joined"]);
        assert_eq!(table.numeric_columns(), vec!["id"]);
        assert_eq!(table.categorical_columns(), vec!["city"]);
    }

    #[test]
    fn test_parse_dates_can_be_disabled() {
        let text = r#"{"joined": ["2021-03-05", "2021-04-01"]}"#;
        let table = DataLoader::new(TableInput::JsonText(text.to_string()))
            .parse_dates(false)
            .load()
            .unwrap();
        assert_eq!(table.kind("joined"), Some(ColumnKind::Categorical));
    }

    #[test]
    fn test_json_scalar_rejected() {
        let result = DataLoader::new(TableInput::JsonText("\"hello\"".to_string())).load();
        assert!(matches!(result, Err(EdaError::UnsupportedInput(_))));
    }

    #[test]
    fn test_csv_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Name,Age,Gender").unwrap();
        writeln!(file, "Alice,25,Female").unwrap();
        writeln!(file, "Bob,30,Male").unwrap();

        let input = TableInput::from_path(file.path()).unwrap();
        let table = DataLoader::new(input).load().unwrap();
        assert_eq!(table.height(), 2);
        assert_eq!(table.numeric_columns(), vec!["Age"]);
    }

    #[test]
    fn test_csv_with_inch_marks_loads() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "id,size").unwrap();
        writeln!(file, "1,15\" screen").unwrap();
        writeln!(file, "2,plain").unwrap();

        let df = load_csv_with_fallbacks(file.path()).unwrap();
        assert_eq!(df.shape(), (2, 2));
        let size = df.column("size").unwrap().str().unwrap().get(1);
        assert_eq!(size, Some("plain"));
    }

    #[test]
    fn test_csv_missing_file_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let result = load_csv_with_fallbacks(&tmp.path().join("absent.csv"));
        assert!(result.is_err());
    }

    #[test]
    fn test_from_path_rejects_unknown_extension() {
        assert!(matches!(
            TableInput::from_path("data.xlsx"),
            Err(EdaError::UnsupportedInput(_))
        ));
    }

    // ==================== table tests ====================

    #[test]
    fn test_without_columns_reclassifies() {
        let table = DataLoader::new(TableInput::Rows(sample_rows()))
            .with_column_names(["Name", "Age", "Gender"])
            .load()
            .unwrap();
        let trimmed = table
            .without_columns(&["Name".to_string(), "Unknown".to_string()])
            .unwrap();
        assert_eq!(trimmed.column_names(), vec!["Age", "Gender"]);
        assert_eq!(trimmed.categorical_columns(), vec!["Gender"]);
    }

    #[test]
    fn test_series_missing_column() {
        let table = Table::new(DataFrame::empty());
        assert!(matches!(
            table.series("Age"),
            Err(EdaError::ColumnNotFound(_))
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn test_clean_csv_content() {
        let cleaned = clean_csv_content("a,b\n\n\"\"x\"\",1\n");
        assert_eq!(cleaned, "a,b\n\"x\",1");
    }
}
