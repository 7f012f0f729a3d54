//! Markdown rendition of the summary report.

use crate::types::{CorrelationMatrix, DataInfo, SummarySnapshot, TableData};
use crate::utils::format_float;
use std::fmt::Write as _;

/// Render the five report sections as Markdown.
pub fn render_markdown(snapshot: &SummarySnapshot, info: &DataInfo) -> String {
    let mut out = String::new();
    let (rows, cols) = snapshot.shape;

    let _ = writeln!(out, "# Data Summary Report\n");
    let _ = writeln!(out, "_{} Dataset, generated at {}_\n", snapshot.dataset_name, snapshot.generated_at);

    out.push_str("## 01. Data Information\n\n");
    let _ = writeln!(out, "### 1.1. Data Shape\n\n{rows}, {cols}\n");
    out.push_str("### 1.2. Data Head\n\n");
    out.push_str(&markdown_table(&info.head));
    let _ = writeln!(out, "\n### 1.3. Data Information\n\n```text\n{}\n```\n", info.info.trim_end());
    out.push_str("### 1.4. Missing Values\n\n");
    for (name, count) in &snapshot.nulls {
        let _ = writeln!(out, "- {}: {}", escape(name), count);
    }
    let _ = writeln!(
        out,
        "\n### 1.5. Duplicated Rows\n\nNumber of duplicated rows : {} rows  \nNumber of data length : {} rows  \nRatio of duplicated rows : {}\n",
        snapshot.duplicates, rows, snapshot.duplicate_ratio
    );

    out.push_str("## 02. Numerical Columns Summary\n\n");
    match &snapshot.numerical {
        Some(table) => {
            out.push_str("### 2.1. Numerical Columns Statistics\n\n");
            out.push_str(&markdown_table(table));
            out.push('\n');
        }
        None => out.push_str("Numerical summary is not available.\n\n"),
    }

    out.push_str("## 03. Categorical Columns Summary\n\n");
    match &snapshot.categorical {
        Some(categorical) => {
            out.push_str("### 3.1. Categorical Columns Statistics\n\n");
            out.push_str(&markdown_table(&categorical.table));
            out.push_str("\n### 3.2. Features Information\n\n");
            for feature in &categorical.features {
                let _ = writeln!(
                    out,
                    "#### {}\n\nNumber of features : {}  \nFeatures : {}\n",
                    escape(&feature.column),
                    feature.num_features,
                    escape(&feature.features.join(", "))
                );
            }
        }
        None => out.push_str("Categorical summary is not available.\n\n"),
    }

    out.push_str("## 04. Datetime Columns Summary\n\n");
    match &snapshot.datetime {
        Some(datetime) => {
            out.push_str("### 4.1. Datetime Columns Statistics\n\n");
            out.push_str(&markdown_table(&datetime.summary));
            for (k, decomposition) in datetime.columns.iter().enumerate() {
                let _ = writeln!(out, "\n### 4.{}. {}\n", k + 2, escape(&decomposition.column));
                for (part, counts) in &decomposition.parts {
                    let _ = writeln!(out, "#### {part}\n");
                    out.push_str(&markdown_table(counts));
                    out.push('\n');
                }
            }
            out.push('\n');
        }
        None => out.push_str("Datetime summary is not available.\n\n"),
    }

    out.push_str("## 05. Correlation Matrix\n\n");
    match &snapshot.correlation {
        Some(matrix) => out.push_str(&correlation_table(matrix)),
        None => out.push_str("Correlation matrix is not available.\n"),
    }

    out
}

/// Pipe table with a `No` index column.
pub fn markdown_table(table: &TableData) -> String {
    let mut out = String::new();
    let header: Vec<String> = std::iter::once("No".to_string())
        .chain(table.columns.iter().map(|c| escape(c)))
        .collect();
    let _ = writeln!(out, "| {} |", header.join(" | "));
    let _ = writeln!(out, "|{}", "---|".repeat(header.len()));
    for (index, row) in table.index.iter().zip(&table.rows) {
        let cells: Vec<String> = std::iter::once(escape(index))
            .chain(row.iter().map(|c| escape(c)))
            .collect();
        let _ = writeln!(out, "| {} |", cells.join(" | "));
    }
    out
}

fn correlation_table(matrix: &CorrelationMatrix) -> String {
    let mut out = String::new();
    let header: Vec<String> = std::iter::once(String::new())
        .chain(matrix.columns.iter().map(|c| escape(c)))
        .collect();
    let _ = writeln!(out, "| {} |", header.join(" | "));
    let _ = writeln!(out, "|{}", "---|".repeat(header.len()));
    for (name, values) in matrix.columns.iter().zip(&matrix.values) {
        let cells: Vec<String> = std::iter::once(escape(name))
            .chain(values.iter().map(|v| format_float(*v)))
            .collect();
        let _ = writeln!(out, "| {} |", cells.join(" | "));
    }
    out
}

fn escape(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_markdown_table() {
        let table = TableData::new(
            vec!["a|b".to_string()],
            vec!["0".to_string()],
            vec![vec!["x".to_string()]],
        )
        .unwrap();
        assert_eq!(markdown_table(&table), "| No | a\\|b |\n|---|---|\n| 0 | x |\n");
    }

    #[test]
    fn test_correlation_table() {
        let matrix = CorrelationMatrix {
            columns: vec!["a".to_string(), "b".to_string()],
            values: vec![vec![1.0, -0.5], vec![-0.5, 1.0]],
        };
        let md = correlation_table(&matrix);
        assert!(md.contains("| a | 1.0 | -0.5 |"));
        assert!(md.starts_with("|  | a | b |"));
    }
}
