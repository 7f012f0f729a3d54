//! Grid sizing for subplot figures.

use crate::error::{EdaError, Result};
use crate::types::CorrelationMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a chart is spread over a figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotKind {
    /// One large axis.
    Single,
    /// One grid, one axis per column.
    Sub,
    /// One grid per main column, crossing it with sub columns and hues.
    Multi,
}

impl PlotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlotKind::Single => "single",
            PlotKind::Sub => "sub",
            PlotKind::Multi => "multi",
        }
    }
}

impl FromStr for PlotKind {
    type Err = EdaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(PlotKind::Single),
            "sub" => Ok(PlotKind::Sub),
            "multi" => Ok(PlotKind::Multi),
            _ => Err(EdaError::InvalidPlotKind(s.to_string())),
        }
    }
}

impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time bucket used by datetime line charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    /// Raw rows, no grouping.
    All,
    Year,
    Quarter,
    Month,
    Day,
    /// Floor to the hour.
    Hour,
}

impl AggregationMode {
    pub const ALL_MODES: [AggregationMode; 6] = [
        AggregationMode::All,
        AggregationMode::Year,
        AggregationMode::Quarter,
        AggregationMode::Month,
        AggregationMode::Day,
        AggregationMode::Hour,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMode::All => "all",
            AggregationMode::Year => "year",
            AggregationMode::Quarter => "quarter",
            AggregationMode::Month => "month",
            AggregationMode::Day => "day",
            AggregationMode::Hour => "hour",
        }
    }
}

impl FromStr for AggregationMode {
    type Err = EdaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(AggregationMode::All),
            "year" => Ok(AggregationMode::Year),
            "quarter" => Ok(AggregationMode::Quarter),
            "month" => Ok(AggregationMode::Month),
            "day" => Ok(AggregationMode::Day),
            "hour" => Ok(AggregationMode::Hour),
            _ => Err(EdaError::InvalidAggregationMode(s.to_string())),
        }
    }
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Grid Geometry
// ============================================================================

/// Subplot grid: `rows * cols >= cells`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
    /// Number of axes the caller intends to use.
    pub cells: usize,
}

impl GridSpec {
    /// Near-square grid for `n` cells: `cols = ceil(sqrt(n))`,
    /// `rows = ceil(n / cols)`. Zero cells still get one axis.
    pub fn for_cells(n: usize) -> Self {
        let n_eff = n.max(1);
        let mut cols = (n_eff as f64).sqrt().ceil() as usize;
        // guard against float error on perfect squares
        while cols * cols < n_eff {
            cols += 1;
        }
        while cols > 1 && (cols - 1) * (cols - 1) >= n_eff {
            cols -= 1;
        }
        let rows = n_eff.div_ceil(cols);
        Self { rows, cols, cells: n }
    }

    /// Explicit rows x cols grid.
    pub fn fixed(rows: usize, cols: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        Self {
            rows,
            cols,
            cells: rows * cols,
        }
    }

    pub fn single() -> Self {
        Self::for_cells(1)
    }

    /// Total number of axes in the grid.
    pub fn capacity(&self) -> usize {
        self.rows * self.cols
    }

    /// Axes beyond `used` that must be deleted before saving.
    pub fn unused(&self, used: usize) -> usize {
        self.capacity().saturating_sub(used)
    }

    /// Row-major position of a flat axis index.
    pub fn position(&self, index: usize) -> (usize, usize) {
        (index / self.cols, index % self.cols)
    }
}

/// Cardinalities of the request dimensions; `None` means "not given".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridDims {
    pub x: Option<usize>,
    pub y: Option<usize>,
    pub hue: Option<usize>,
}

impl GridDims {
    fn len(value: Option<usize>) -> usize {
        value.unwrap_or(1)
    }
}

/// Size the grid for a request.
///
/// * `sub`: `n = |x| * |y| * |hue|` (missing dimensions count as 1).
/// * `multi` with x, y and hue: rows = larger of `|y|`, `|hue|`,
///   cols = the smaller.
/// * `multi` with x and y: `n = max(|x|, |y|)`.
/// * `multi` with hue and one of x / y: `n = |hue|`.
/// * `single`: one axis.
pub fn calculate_grid(dims: GridDims, kind: PlotKind) -> Result<GridSpec> {
    let x = GridDims::len(dims.x);
    let y = GridDims::len(dims.y);
    let hue = GridDims::len(dims.hue);

    match kind {
        PlotKind::Single => Ok(GridSpec::single()),
        PlotKind::Sub => Ok(GridSpec::for_cells(x * y * hue)),
        PlotKind::Multi => match (dims.x.is_some(), dims.y.is_some(), dims.hue.is_some()) {
            (true, true, true) => {
                let grid = if y > hue {
                    GridSpec::fixed(y, hue)
                } else {
                    GridSpec::fixed(hue, y)
                };
                Ok(grid)
            }
            (true, true, false) => Ok(GridSpec::for_cells(x.max(y))),
            (true, false, true) | (false, true, true) => Ok(GridSpec::for_cells(hue)),
            _ => Err(EdaError::InvalidConfig(
                "multi plots need x and y, or a hue with x or y".to_string(),
            )),
        },
    }
}

// ============================================================================
// Plot Request
// ============================================================================

/// One visualization call: which kind of grid and which columns to use.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotRequest {
    pub kind: PlotKind,
    pub x: Option<Vec<String>>,
    pub y: Option<Vec<String>>,
    pub hue: Option<Vec<String>>,
    pub mode: Option<AggregationMode>,
    pub matrix: Option<CorrelationMatrix>,
}

impl PlotRequest {
    fn with_kind(kind: PlotKind) -> Self {
        Self {
            kind,
            x: None,
            y: None,
            hue: None,
            mode: None,
            matrix: None,
        }
    }

    /// One axis drawing a correlation matrix.
    pub fn single(matrix: CorrelationMatrix) -> Self {
        Self {
            matrix: Some(matrix),
            ..Self::with_kind(PlotKind::Single)
        }
    }

    /// One axis per column, column on the x axis.
    pub fn sub_x(columns: Vec<String>) -> Self {
        Self {
            x: Some(columns),
            ..Self::with_kind(PlotKind::Sub)
        }
    }

    /// One axis per column, column on the y axis.
    pub fn sub_y(columns: Vec<String>) -> Self {
        Self {
            y: Some(columns),
            ..Self::with_kind(PlotKind::Sub)
        }
    }

    /// Cross of x and y columns. Either side may be absent.
    pub fn multi(x: Option<Vec<String>>, y: Option<Vec<String>>) -> Self {
        Self {
            x,
            y,
            ..Self::with_kind(PlotKind::Multi)
        }
    }

    pub fn with_hue(mut self, hue: Vec<String>) -> Self {
        self.hue = Some(hue);
        self
    }

    pub fn with_mode(mut self, mode: AggregationMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn dims(&self) -> GridDims {
        GridDims {
            x: self.x.as_ref().map(Vec::len),
            y: self.y.as_ref().map(Vec::len),
            hue: self.hue.as_ref().map(Vec::len),
        }
    }

    /// Columns a `sub` request iterates over: x when given, else y.
    pub fn sub_columns(&self) -> &[String] {
        self.x
            .as_deref()
            .or(self.y.as_deref())
            .unwrap_or_default()
    }
}
