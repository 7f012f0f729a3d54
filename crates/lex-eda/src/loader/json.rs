//! Conversion of JSON-shaped inputs into polars columns.

use crate::error::{EdaError, Result};
use polars::prelude::*;
use serde_json::{Map, Value};

/// Build a series from a column of JSON values.
///
/// Numbers become `Int64` when every number is integral, `Float64` otherwise;
/// booleans become `Boolean`; anything else (including mixed columns) becomes
/// `String`. JSON `null` is a missing value in every case.
pub(crate) fn values_to_series(name: &str, values: &[Value]) -> Series {
    let non_null: Vec<&Value> = values.iter().filter(|v| !v.is_null()).collect();

    if !non_null.is_empty() && non_null.iter().all(|v| v.is_number()) {
        if non_null.iter().all(|v| v.as_i64().is_some()) {
            let ints: Vec<Option<i64>> = values.iter().map(Value::as_i64).collect();
            return Series::new(name.into(), ints);
        }
        let floats: Vec<Option<f64>> = values.iter().map(Value::as_f64).collect();
        return Series::new(name.into(), floats);
    }

    if !non_null.is_empty() && non_null.iter().all(|v| v.is_boolean()) {
        let bools: Vec<Option<bool>> = values.iter().map(Value::as_bool).collect();
        return Series::new(name.into(), bools);
    }

    let strings: Vec<Option<String>> = values
        .iter()
        .map(|v| match v {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .collect();
    Series::new(name.into(), strings)
}

/// Build a frame from named columns, requiring equal lengths.
pub(crate) fn columns_to_frame(columns: Vec<(String, Vec<Value>)>) -> Result<DataFrame> {
    let height = columns.first().map(|(_, values)| values.len()).unwrap_or(0);
    let mut out = Vec::with_capacity(columns.len());
    for (name, values) in &columns {
        if values.len() != height {
            return Err(EdaError::ColumnLengthMismatch {
                expected: height,
                found: values.len(),
            });
        }
        out.push(values_to_series(name, values).into_column());
    }
    Ok(DataFrame::new(out)?)
}

/// Build a frame from records; the column order is the order of first
/// appearance and missing keys are nulls.
pub(crate) fn records_to_frame(records: &[Map<String, Value>]) -> Result<DataFrame> {
    let mut names: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
    }

    let columns = names
        .into_iter()
        .map(|name| {
            let values = records
                .iter()
                .map(|record| record.get(&name).cloned().unwrap_or(Value::Null))
                .collect();
            (name, values)
        })
        .collect();
    columns_to_frame(columns)
}

/// Build a frame from positional rows. All rows must have the same width and
/// `names`, when given, must match it. Without names columns are `0..width`.
pub(crate) fn rows_to_frame(rows: &[Vec<Value>], names: Option<&[String]>) -> Result<DataFrame> {
    let width = match (rows.first(), names) {
        (Some(row), _) => row.len(),
        (None, Some(names)) => names.len(),
        (None, None) => 0,
    };

    if let Some(row) = rows.iter().find(|row| row.len() != width) {
        return Err(EdaError::ColumnLengthMismatch {
            expected: width,
            found: row.len(),
        });
    }

    let names: Vec<String> = match names {
        Some(names) if names.len() != width => {
            return Err(EdaError::ColumnLengthMismatch {
                expected: width,
                found: names.len(),
            });
        }
        Some(names) => names.to_vec(),
        None => (0..width).map(|i| i.to_string()).collect(),
    };

    let columns = names
        .into_iter()
        .enumerate()
        .map(|(j, name)| (name, rows.iter().map(|row| row[j].clone()).collect()))
        .collect();
    columns_to_frame(columns)
}

/// Interpret a parsed JSON document as a table.
///
/// Accepted shapes: an array of records, an array of rows, an object of
/// column arrays, or an object of `{index: value}` column objects.
pub(crate) fn json_to_frame(value: Value, names: Option<&[String]>) -> Result<DataFrame> {
    match value {
        Value::Array(items) if items.iter().all(Value::is_object) => {
            let records: Vec<Map<String, Value>> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect();
            records_to_frame(&records)
        }
        Value::Array(items) if items.iter().all(Value::is_array) => {
            let rows: Vec<Vec<Value>> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Array(row) => Some(row),
                    _ => None,
                })
                .collect();
            rows_to_frame(&rows, names)
        }
        Value::Object(map) => {
            let mut columns = Vec::with_capacity(map.len());
            for (name, column) in map {
                let values = match column {
                    Value::Array(values) => values,
                    Value::Object(by_index) => by_index.into_iter().map(|(_, v)| v).collect(),
                    other => {
                        return Err(EdaError::UnsupportedInput(format!(
                            "column '{name}' must be an array or an object, got {other}"
                        )));
                    }
                };
                columns.push((name, values));
            }
            columns_to_frame(columns)
        }
        other => Err(EdaError::UnsupportedInput(format!(
            "JSON input must be an array of records/rows or an object of columns, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a mixed array",
        Value::Object(_) => "an object",
    }
}
