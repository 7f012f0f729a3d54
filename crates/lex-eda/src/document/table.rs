//! Table measurement and column packing.

use super::metrics::{DocumentFont, FontFace};
use crate::types::TableData;
use std::ops::Range;

/// Header of the index column.
pub const INDEX_HEADER: &str = "No";

/// A [`TableData`] measured for a given font size.
#[derive(Debug, Clone, PartialEq)]
pub struct TableBlock<'a> {
    pub data: &'a TableData,
    /// Width of the index column in mm.
    pub index_width: f64,
    /// Natural width of every data column in mm.
    pub column_widths: Vec<f64>,
}

impl<'a> TableBlock<'a> {
    /// Measure every column: `max(header, widest cell) + padding`. The index
    /// column is measured against the `No` header.
    pub fn measure(data: &'a TableData, font: &DocumentFont, size_pt: f64, padding: f64) -> Self {
        let width = |s: &str| font.text_width(s, FontFace::Regular, size_pt);

        let index_width = data
            .index
            .iter()
            .map(|i| width(i))
            .fold(width(INDEX_HEADER), f64::max)
            + padding;

        let column_widths = data
            .columns
            .iter()
            .enumerate()
            .map(|(j, name)| {
                data.rows
                    .iter()
                    .map(|row| width(&row[j]))
                    .fold(width(name), f64::max)
                    + padding
            })
            .collect();

        Self {
            data,
            index_width,
            column_widths,
        }
    }

    /// Split the columns into groups that fit `available` mm side by side.
    pub fn groups(&self, available: f64) -> Vec<Range<usize>> {
        pack_columns(&self.column_widths, available)
    }
}

/// Greedy left-to-right packing of column widths into groups whose total
/// width stays within `available`.
///
/// The groups partition `0..widths.len()` in order. A column wider than
/// `available` on its own gets a group to itself.
pub fn pack_columns(widths: &[f64], available: f64) -> Vec<Range<usize>> {
    let mut groups = Vec::new();
    let mut start = 0;
    let mut used = 0.0;

    for (i, &w) in widths.iter().enumerate() {
        if i > start && used + w > available {
            groups.push(start..i);
            start = i;
            used = 0.0;
        }
        used += w;
    }
    if start < widths.len() {
        groups.push(start..widths.len());
    }

    groups
}
