//! Chart primitives.
//!
//! A [`Chart`] turns one [`PlotData`] into artists on an [`Axes`]. Charts
//! never decide grid placement, titles or file names; the generator does.

use super::aggregate::AggregatedSeries;
use crate::error::{EdaError, Result};
use crate::figure::{Artist, Axes, Bar, FigureStyle, LegendEntry, Scale, TickPlan};
use crate::layout::{AggregationMode, date_ticks, truncate_legend};
use crate::loader::Table;
use crate::summary::statistics::{BoxStats, gaussian_kde, histogram};
use crate::types::{ColumnKind, CorrelationMatrix};
use crate::utils::{series_to_datetimes, series_to_f64, series_to_strings};
use chrono::NaiveDateTime;
use std::collections::HashMap;

const KDE_POINTS: usize = 200;
const VIOLIN_POINTS: usize = 100;
/// Share of a category slot taken by its (dodged) boxes or bars.
const GROUP_WIDTH: f64 = 0.8;

/// Which multi-plot strategy a chart uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartFamily {
    /// Per numeric main column, one axes per sub column.
    Numerical,
    /// Per categorical main column, crossed with sub columns and hues.
    Categorical,
    /// Per datetime main column, aggregated by time bucket.
    Datetime,
    /// Whole correlation matrix on one axes.
    Matrix,
}

/// Axis a single column is drawn along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    X,
    Y,
}

/// Data bound to one axes.
#[derive(Debug, Clone, Copy)]
pub enum PlotData<'a> {
    /// One column of a table.
    Column {
        table: &'a Table,
        column: &'a str,
        orientation: Orientation,
    },
    /// Two columns, optionally split by a hue column.
    Pair {
        table: &'a Table,
        x: &'a str,
        y: Option<&'a str>,
        hue: Option<&'a str>,
    },
    /// Pre-aggregated time series.
    TimeSeries {
        series: &'a [AggregatedSeries],
        mode: AggregationMode,
    },
    Matrix(&'a CorrelationMatrix),
}

/// A plot primitive the generator can place on any axes.
pub trait Drawable {
    fn name(&self) -> &str;

    fn family(&self) -> ChartFamily;

    fn draw(&self, axes: &mut Axes, data: &PlotData<'_>, style: &FigureStyle) -> Result<()>;
}

/// The built-in charts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Chart {
    Histogram { bins: usize, kde: bool },
    Kde { fill: bool },
    Box,
    Violin,
    Scatter,
    Bar,
    Count,
    Line,
    Heatmap { annotate: bool },
}

impl Drawable for Chart {
    fn name(&self) -> &str {
        match self {
            Chart::Histogram { .. } => "histogram",
            Chart::Kde { .. } => "kde",
            Chart::Box => "box",
            Chart::Violin => "violin",
            Chart::Scatter => "scatter",
            Chart::Bar => "bar",
            Chart::Count => "count",
            Chart::Line => "line",
            Chart::Heatmap { .. } => "heatmap",
        }
    }

    fn family(&self) -> ChartFamily {
        match self {
            Chart::Histogram { .. }
            | Chart::Kde { .. }
            | Chart::Box
            | Chart::Violin
            | Chart::Scatter => ChartFamily::Numerical,
            Chart::Bar | Chart::Count => ChartFamily::Categorical,
            Chart::Line => ChartFamily::Datetime,
            Chart::Heatmap { .. } => ChartFamily::Matrix,
        }
    }

    fn draw(&self, axes: &mut Axes, data: &PlotData<'_>, style: &FigureStyle) -> Result<()> {
        match (self, *data) {
            (Chart::Heatmap { annotate }, PlotData::Matrix(matrix)) => {
                draw_heatmap(axes, matrix, *annotate);
                Ok(())
            }
            (Chart::Line, PlotData::TimeSeries { series, mode }) => {
                self.draw_time_series(axes, series, mode, style)
            }
            (Chart::Line, PlotData::Pair { table, x, y: Some(y), hue }) => {
                self.draw_line(axes, table, x, y, hue, style)
            }
            (Chart::Histogram { bins, kde }, PlotData::Column { table, column, .. })
            | (Chart::Histogram { bins, kde }, PlotData::Pair { table, x: column, .. }) => {
                self.draw_histogram(axes, table, column, *bins, *kde, style)
            }
            (Chart::Kde { fill }, PlotData::Column { table, column, .. })
            | (Chart::Kde { fill }, PlotData::Pair { table, x: column, .. }) => {
                self.draw_kde(axes, table, column, *fill, style)
            }
            (Chart::Box | Chart::Violin, PlotData::Column { table, column, orientation }) => {
                let (x, y) = match orientation {
                    Orientation::X => (column, None),
                    Orientation::Y => (column, Some(column)),
                };
                self.draw_distribution(axes, table, x, y, None, style)
            }
            (Chart::Box | Chart::Violin, PlotData::Pair { table, x, y, hue }) => {
                self.draw_distribution(axes, table, x, y, hue, style)
            }
            (Chart::Scatter, PlotData::Pair { table, x, y: Some(y), hue }) => {
                self.draw_scatter(axes, table, x, y, hue, style)
            }
            (Chart::Bar, PlotData::Pair { table, x, y, hue }) => {
                self.draw_bars(axes, table, x, y, hue, style)
            }
            (Chart::Count, PlotData::Pair { table, x, hue, .. }) => {
                self.draw_bars(axes, table, x, None, hue, style)
            }
            (Chart::Count, PlotData::Column { table, column, .. }) => {
                self.draw_bars(axes, table, column, None, None, style)
            }
            (_, data) => Err(EdaError::plot_data(
                self.name(),
                format!("cannot draw {}", describe_data(&data)),
            )),
        }
    }
}

fn describe_data(data: &PlotData<'_>) -> &'static str {
    match data {
        PlotData::Column { .. } => "a single column",
        PlotData::Pair { y: None, .. } => "a column without a y column",
        PlotData::Pair { .. } => "a column pair",
        PlotData::TimeSeries { .. } => "time series",
        PlotData::Matrix(_) => "a correlation matrix",
    }
}

// ===== Column values =====

/// Distinct display values in order of first appearance, and each row's
/// index into them.
fn categories(table: &Table, column: &str) -> Result<(Vec<String>, Vec<Option<usize>>)> {
    let values = series_to_strings(table.series(column)?)?;
    let mut levels: Vec<String> = Vec::new();
    let mut lookup: HashMap<String, usize> = HashMap::new();
    let codes = values
        .into_iter()
        .map(|v| {
            v.map(|v| {
                *lookup.entry(v.clone()).or_insert_with(|| {
                    levels.push(v);
                    levels.len() - 1
                })
            })
        })
        .collect();
    Ok((levels, codes))
}

fn timestamp_ms(dt: &NaiveDateTime) -> f64 {
    dt.and_utc().timestamp_millis() as f64
}

/// Positions of a column along an axis and the matching scale.
struct AxisValues {
    positions: Vec<Option<f64>>,
    scale: Scale,
}

impl AxisValues {
    fn load(table: &Table, column: &str) -> Result<Self> {
        let series = table.series(column)?;
        match table.kind(column) {
            Some(ColumnKind::Numeric) => Ok(Self {
                positions: series_to_f64(series)?,
                scale: Scale::Linear,
            }),
            Some(ColumnKind::Datetime) => Ok(Self {
                positions: series_to_datetimes(series)?
                    .iter()
                    .map(|v| v.as_ref().map(timestamp_ms))
                    .collect(),
                scale: Scale::Time,
            }),
            _ => {
                let (levels, codes) = categories(table, column)?;
                Ok(Self {
                    positions: codes.into_iter().map(|c| c.map(|c| c as f64)).collect(),
                    scale: Scale::Categorical(levels),
                })
            }
        }
    }
}

fn finite_column(chart: &str, table: &Table, column: &str) -> Result<Vec<f64>> {
    let values: Vec<f64> = series_to_f64(table.series(column)?)
        .map_err(|_| EdaError::plot_data(chart, format!("column '{column}' is not numeric")))?
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .collect();
    if values.is_empty() {
        return Err(EdaError::plot_data(
            chart,
            format!("column '{column}' has no finite values"),
        ));
    }
    Ok(values)
}

/// Centre and width of hue slot `hue` of `n_hues` within category `group`.
fn dodge(group: usize, hue: usize, n_hues: usize) -> (f64, f64) {
    let width = GROUP_WIDTH / n_hues.max(1) as f64;
    let center = group as f64 - GROUP_WIDTH / 2.0 + width * (hue as f64 + 0.5);
    (center, width)
}

fn set_hue_legend(axes: &mut Axes, hue: &str, levels: &[String], style: &FigureStyle) {
    let entries = levels
        .iter()
        .enumerate()
        .map(|(i, label)| LegendEntry {
            label: label.clone(),
            color: style.series_color(i),
        })
        .collect();
    axes.legend = truncate_legend(entries);
    axes.legend_title = Some(hue.to_string());
}

/// Group codes and hue codes per row; rows with a missing code are `None`.
struct Grouping {
    groups: Vec<String>,
    hues: Option<(String, Vec<String>)>,
    rows: Vec<Option<(usize, usize)>>,
}

impl Grouping {
    fn new(table: &Table, group: Option<&str>, hue: Option<&str>) -> Result<Self> {
        let height = table.height();
        let (groups, group_codes) = match group {
            Some(column) => categories(table, column)?,
            None => (vec![String::new()], vec![Some(0); height]),
        };
        let (hues, hue_codes) = match hue {
            Some(column) => {
                let (levels, codes) = categories(table, column)?;
                (Some((column.to_string(), levels)), codes)
            }
            None => (None, vec![Some(0); height]),
        };
        let rows = group_codes
            .into_iter()
            .zip(hue_codes)
            .map(|(g, h)| Some((g?, h?)))
            .collect();
        Ok(Self { groups, hues, rows })
    }

    fn n_hues(&self) -> usize {
        self.hues.as_ref().map_or(1, |(_, levels)| levels.len().max(1))
    }

    fn color(&self, group: usize, hue: usize, style: &FigureStyle) -> plotters::style::RGBColor {
        if self.hues.is_some() {
            style.series_color(hue)
        } else {
            style.series_color(group)
        }
    }

    fn apply_legend(&self, axes: &mut Axes, style: &FigureStyle) {
        if let Some((name, levels)) = &self.hues {
            set_hue_legend(axes, name, levels, style);
        }
    }
}

// ===== Drawing =====

impl Chart {
    fn draw_histogram(
        &self,
        axes: &mut Axes,
        table: &Table,
        column: &str,
        bins: usize,
        kde: bool,
        style: &FigureStyle,
    ) -> Result<()> {
        let values = finite_column(self.name(), table, column)?;
        let counts = histogram(&values, bins);
        let Some(&(first_left, first_right, _)) = counts.first() else {
            return Err(EdaError::plot_data(self.name(), "histogram needs at least one bin"));
        };

        let color = style.series_color(0);
        axes.add(Artist::Bars(
            counts
                .iter()
                .map(|&(x0, x1, count)| Bar {
                    x0,
                    x1,
                    y0: 0.0,
                    y1: count as f64,
                    color,
                })
                .collect(),
        ));

        if kde {
            // density rescaled to counts so it overlays the bars
            let scale = values.len() as f64 * (first_right - first_left);
            let curve = gaussian_kde(&values, KDE_POINTS);
            if !curve.is_empty() {
                axes.add(Artist::Line {
                    points: curve.into_iter().map(|(x, d)| (x, d * scale)).collect(),
                    color,
                });
            }
        }
        axes.set_ylabel("Count");
        Ok(())
    }

    fn draw_kde(
        &self,
        axes: &mut Axes,
        table: &Table,
        column: &str,
        fill: bool,
        style: &FigureStyle,
    ) -> Result<()> {
        let values = finite_column(self.name(), table, column)?;
        let curve = gaussian_kde(&values, KDE_POINTS);
        if curve.is_empty() {
            return Err(EdaError::plot_data(
                self.name(),
                format!("column '{column}' needs at least two distinct values"),
            ));
        }
        let color = style.series_color(0);
        axes.add(if fill {
            Artist::Area {
                points: curve,
                baseline: 0.0,
                color,
            }
        } else {
            Artist::Line {
                points: curve,
                color,
            }
        });
        axes.set_ylabel("Density");
        Ok(())
    }

    /// Box or violin plot. The numeric side carries the values, the other
    /// side (if any) the categories.
    fn draw_distribution(
        &self,
        axes: &mut Axes,
        table: &Table,
        x: &str,
        y: Option<&str>,
        hue: Option<&str>,
        style: &FigureStyle,
    ) -> Result<()> {
        let numeric = |c: &str| table.kind(c) == Some(ColumnKind::Numeric);
        let (value_column, group_column, vertical) = match y {
            // a single column drawn along y
            Some(y) if y == x && numeric(y) => (y, None, true),
            Some(y) if numeric(y) && !numeric(x) => (y, Some(x), true),
            Some(y) if numeric(x) => (x, Some(y), false),
            None if numeric(x) => (x, None, false),
            _ => {
                return Err(EdaError::plot_data(
                    self.name(),
                    format!("no numeric column among '{x}' and '{}'", y.unwrap_or("-")),
                ));
            }
        };

        let values = series_to_f64(table.series(value_column)?)?;
        let grouping = Grouping::new(table, group_column, hue)?;
        let n_hues = grouping.n_hues();
        let mut buckets = vec![vec![Vec::new(); n_hues]; grouping.groups.len()];
        for (value, row) in values.iter().zip(&grouping.rows) {
            if let (Some(v), Some((g, h))) = (value, row)
                && v.is_finite()
            {
                buckets[*g][*h].push(*v);
            }
        }

        for (g, per_hue) in buckets.iter().enumerate() {
            for (h, bucket) in per_hue.iter().enumerate() {
                let (position, width) = dodge(g, h, n_hues);
                let color = grouping.color(g, h, style);
                let artist = match self {
                    Chart::Violin => violin_profile(bucket, width * 0.5).map(|profile| {
                        Artist::Violin {
                            position,
                            profile,
                            color,
                            vertical,
                        }
                    }),
                    _ => BoxStats::from_values(bucket).map(|stats| Artist::Box {
                        position,
                        width: width * 0.9,
                        stats,
                        color,
                        vertical,
                    }),
                };
                if let Some(artist) = artist {
                    axes.add(artist);
                }
            }
        }
        if axes.is_empty() {
            return Err(EdaError::plot_data(
                self.name(),
                format!("column '{value_column}' has no drawable groups"),
            ));
        }

        let category_scale = match group_column {
            Some(_) => (Scale::Categorical(grouping.groups.clone()), TickPlan::Auto),
            None => (Scale::Linear, TickPlan::Positions(Vec::new())),
        };
        if vertical {
            (axes.x_scale, axes.x_ticks) = category_scale;
        } else {
            (axes.y_scale, axes.y_ticks) = category_scale;
        }
        grouping.apply_legend(axes, style);
        Ok(())
    }

    fn draw_scatter(
        &self,
        axes: &mut Axes,
        table: &Table,
        x: &str,
        y: &str,
        hue: Option<&str>,
        style: &FigureStyle,
    ) -> Result<()> {
        let xs = AxisValues::load(table, x)?;
        let ys = AxisValues::load(table, y)?;
        let grouping = Grouping::new(table, None, hue)?;

        let mut per_hue: Vec<Vec<(f64, f64)>> = vec![Vec::new(); grouping.n_hues()];
        for ((px, py), row) in xs.positions.iter().zip(&ys.positions).zip(&grouping.rows) {
            if let (Some(px), Some(py), Some((_, h))) = (px, py, row)
                && px.is_finite()
                && py.is_finite()
            {
                per_hue[*h].push((*px, *py));
            }
        }
        for (h, points) in per_hue.into_iter().enumerate() {
            if !points.is_empty() {
                axes.add(Artist::Points {
                    points,
                    color: style.series_color(h),
                });
            }
        }
        if axes.is_empty() {
            return Err(EdaError::plot_data(
                self.name(),
                format!("no complete ('{x}', '{y}') pairs"),
            ));
        }
        axes.x_scale = xs.scale;
        axes.y_scale = ys.scale;
        grouping.apply_legend(axes, style);
        Ok(())
    }

    /// Bars per category: mean of `y` when given, else row counts.
    fn draw_bars(
        &self,
        axes: &mut Axes,
        table: &Table,
        x: &str,
        y: Option<&str>,
        hue: Option<&str>,
        style: &FigureStyle,
    ) -> Result<()> {
        let values = match y {
            Some(y) => Some(series_to_f64(table.series(y)?).map_err(|_| {
                EdaError::plot_data(self.name(), format!("column '{y}' is not numeric"))
            })?),
            None => None,
        };
        let grouping = Grouping::new(table, Some(x), hue)?;
        let n_hues = grouping.n_hues();

        // (sum, count) per group and hue
        let mut cells = vec![vec![(0.0f64, 0usize); n_hues]; grouping.groups.len()];
        for (i, row) in grouping.rows.iter().enumerate() {
            let Some((g, h)) = *row else { continue };
            match &values {
                Some(values) => {
                    if let Some(v) = values[i].filter(|v| v.is_finite()) {
                        cells[g][h].0 += v;
                        cells[g][h].1 += 1;
                    }
                }
                None => cells[g][h].1 += 1,
            }
        }

        let mut bars = Vec::new();
        for (g, per_hue) in cells.iter().enumerate() {
            for (h, &(sum, count)) in per_hue.iter().enumerate() {
                if count == 0 {
                    continue;
                }
                let height = if values.is_some() {
                    sum / count as f64
                } else {
                    count as f64
                };
                let (center, width) = dodge(g, h, n_hues);
                bars.push(Bar {
                    x0: center - width / 2.0,
                    x1: center + width / 2.0,
                    y0: 0.0,
                    y1: height,
                    color: grouping.color(g, h, style),
                });
            }
        }
        if bars.is_empty() {
            return Err(EdaError::plot_data(
                self.name(),
                format!("column '{x}' has no values"),
            ));
        }

        axes.add(Artist::Bars(bars));
        axes.x_scale = Scale::Categorical(grouping.groups.clone());
        if y.is_none() {
            axes.set_ylabel("count");
        }
        grouping.apply_legend(axes, style);
        Ok(())
    }

    fn draw_line(
        &self,
        axes: &mut Axes,
        table: &Table,
        x: &str,
        y: &str,
        hue: Option<&str>,
        style: &FigureStyle,
    ) -> Result<()> {
        let xs = AxisValues::load(table, x)?;
        let ys = series_to_f64(table.series(y)?)
            .map_err(|_| EdaError::plot_data(self.name(), format!("column '{y}' is not numeric")))?;
        let grouping = Grouping::new(table, None, hue)?;

        let mut per_hue: Vec<Vec<(f64, f64)>> = vec![Vec::new(); grouping.n_hues()];
        for ((px, py), row) in xs.positions.iter().zip(&ys).zip(&grouping.rows) {
            if let (Some(px), Some(py), Some((_, h))) = (px, py, row)
                && px.is_finite()
                && py.is_finite()
            {
                per_hue[*h].push((*px, *py));
            }
        }
        for (h, mut points) in per_hue.into_iter().enumerate() {
            points.sort_by(|a, b| a.0.total_cmp(&b.0));
            if !points.is_empty() {
                axes.add(Artist::Line {
                    points,
                    color: style.series_color(h),
                });
            }
        }
        if axes.is_empty() {
            return Err(EdaError::plot_data(
                self.name(),
                format!("no complete ('{x}', '{y}') pairs"),
            ));
        }
        axes.x_scale = xs.scale;
        grouping.apply_legend(axes, style);
        Ok(())
    }

    fn draw_time_series(
        &self,
        axes: &mut Axes,
        series: &[AggregatedSeries],
        mode: AggregationMode,
        style: &FigureStyle,
    ) -> Result<()> {
        let mut span: Option<(NaiveDateTime, NaiveDateTime)> = None;
        for (i, line) in series.iter().enumerate() {
            let Some((first, last)) = line.span() else {
                continue;
            };
            span = Some(match span {
                Some((lo, hi)) => (lo.min(first), hi.max(last)),
                None => (first, last),
            });
            axes.add(Artist::Line {
                points: line
                    .points
                    .iter()
                    .map(|p| (timestamp_ms(&p.at), p.value))
                    .collect(),
                color: style.series_color(i),
            });
        }
        let Some((min, max)) = span else {
            return Err(EdaError::plot_data(self.name(), "time series has no points"));
        };

        axes.x_scale = Scale::Time;
        axes.x_ticks = TickPlan::Dates(date_ticks(min, max, Some(mode)));
        if series.len() > 1 {
            let entries = series
                .iter()
                .enumerate()
                .map(|(i, s)| LegendEntry {
                    label: s.name.clone(),
                    color: style.series_color(i),
                })
                .collect();
            axes.legend = truncate_legend(entries);
        }
        Ok(())
    }
}

/// Mirrored KDE outline scaled so the widest point is `half_width`.
fn violin_profile(values: &[f64], half_width: f64) -> Option<Vec<(f64, f64)>> {
    let curve = gaussian_kde(values, VIOLIN_POINTS);
    let peak = curve.iter().map(|(_, d)| *d).fold(0.0, f64::max);
    if curve.is_empty() || peak <= 0.0 {
        return None;
    }
    Some(
        curve
            .into_iter()
            .map(|(v, d)| (v, d / peak * half_width))
            .collect(),
    )
}

fn draw_heatmap(axes: &mut Axes, matrix: &CorrelationMatrix, annotate: bool) {
    axes.add(Artist::Heatmap {
        values: matrix.values.clone(),
        annotate,
    });
    axes.x_scale = Scale::Categorical(matrix.columns.clone());
    // the first row is drawn at the top
    axes.y_scale = Scale::Categorical(matrix.columns.iter().rev().cloned().collect());
}
