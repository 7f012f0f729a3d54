//! Retained figure model.
//!
//! A [`Figure`] is a grid of optional [`Axes`]; charts push [`Artist`]s onto
//! an axes, the generator trims unused axes and hands the figure to a
//! [`FigureSink`], which consumes it. There is no global "current figure".

pub mod render;
pub mod style;

use crate::error::Result;
use crate::layout::{DateTickPlan, GridSpec, LegendSlot};
use crate::summary::statistics::BoxStats;
use plotters::style::RGBColor;
use std::path::{Path, PathBuf};

pub use render::{DEFAULT_FONT, PngSink, RgbImage, render_rgb};
pub use style::FigureStyle;

/// How an axis maps data to positions.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Scale {
    #[default]
    Linear,
    /// Labels at integer positions `0..n`.
    Categorical(Vec<String>),
    /// Milliseconds since the epoch.
    Time,
}

/// Explicit tick placement for an axis.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TickPlan {
    /// Let the renderer choose.
    #[default]
    Auto,
    /// Label only these positions.
    Positions(Vec<(f64, String)>),
    /// Date ticks; positions are milliseconds since the epoch.
    Dates(DateTickPlan),
}

/// One bar in data coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
    pub color: RGBColor,
}

/// Something drawn inside an axes, in data coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Artist {
    Bars(Vec<Bar>),
    Line {
        points: Vec<(f64, f64)>,
        color: RGBColor,
    },
    /// Filled region between a curve and `y = baseline`.
    Area {
        points: Vec<(f64, f64)>,
        baseline: f64,
        color: RGBColor,
    },
    Points {
        points: Vec<(f64, f64)>,
        color: RGBColor,
    },
    /// Box and whiskers centred on `position` of the category axis.
    Box {
        position: f64,
        width: f64,
        stats: BoxStats,
        color: RGBColor,
        /// Values run along y when true, along x otherwise.
        vertical: bool,
    },
    /// Mirrored density outline; `profile` holds `(value, half width)`.
    Violin {
        position: f64,
        profile: Vec<(f64, f64)>,
        color: RGBColor,
        vertical: bool,
    },
    /// Correlation matrix cells; cell `(i, j)` is centred on `(j, n - 1 - i)`
    /// so the first row is drawn at the top.
    Heatmap {
        values: Vec<Vec<f64>>,
        annotate: bool,
    },
}

impl Artist {
    /// Data extent `((x_min, x_max), (y_min, y_max))` of the artist.
    pub fn bounds(&self) -> Option<((f64, f64), (f64, f64))> {
        let mut b = Bounds::default();
        match self {
            Artist::Bars(bars) => {
                for bar in bars {
                    b.add(bar.x0, bar.y0);
                    b.add(bar.x1, bar.y1);
                }
            }
            Artist::Line { points, .. } | Artist::Points { points, .. } => {
                points.iter().for_each(|(x, y)| b.add(*x, *y));
            }
            Artist::Area {
                points, baseline, ..
            } => {
                for (x, y) in points {
                    b.add(*x, *y);
                    b.add(*x, *baseline);
                }
            }
            Artist::Box {
                position,
                width,
                stats,
                vertical,
                ..
            } => {
                let mut values = vec![stats.whisker_low, stats.whisker_high, stats.q1, stats.q3];
                values.extend(stats.outliers.iter().copied());
                for v in values {
                    b.add_oriented(*vertical, position - width / 2.0, v);
                    b.add_oriented(*vertical, position + width / 2.0, v);
                }
            }
            Artist::Violin {
                position,
                profile,
                vertical,
                ..
            } => {
                for (v, half) in profile {
                    b.add_oriented(*vertical, position - half, *v);
                    b.add_oriented(*vertical, position + half, *v);
                }
            }
            Artist::Heatmap { values, .. } => {
                let n = values.len() as f64;
                b.add(-0.5, -0.5);
                b.add(n - 0.5, n - 0.5);
            }
        }
        b.finish()
    }
}

#[derive(Debug, Default)]
struct Bounds {
    x: Option<(f64, f64)>,
    y: Option<(f64, f64)>,
}

impl Bounds {
    fn add(&mut self, x: f64, y: f64) {
        if x.is_finite() {
            self.x = Some(self.x.map_or((x, x), |(lo, hi)| (lo.min(x), hi.max(x))));
        }
        if y.is_finite() {
            self.y = Some(self.y.map_or((y, y), |(lo, hi)| (lo.min(y), hi.max(y))));
        }
    }

    fn add_oriented(&mut self, vertical: bool, category: f64, value: f64) {
        if vertical {
            self.add(category, value);
        } else {
            self.add(value, category);
        }
    }

    fn finish(self) -> Option<((f64, f64), (f64, f64))> {
        Some((self.x?, self.y?))
    }
}

/// A legend entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub color: RGBColor,
}

/// One subplot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Axes {
    pub title: Option<String>,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    pub x_scale: Scale,
    pub y_scale: Scale,
    pub x_ticks: TickPlan,
    pub y_ticks: TickPlan,
    /// Rotation of the x tick labels in degrees.
    pub x_tick_rotation: f64,
    pub artists: Vec<Artist>,
    pub legend: Vec<LegendSlot<LegendEntry>>,
    pub legend_title: Option<String>,
}

impl Axes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn set_xlabel(&mut self, label: impl Into<String>) {
        self.xlabel = Some(label.into());
    }

    pub fn set_ylabel(&mut self, label: impl Into<String>) {
        self.ylabel = Some(label.into());
    }

    pub fn add(&mut self, artist: Artist) {
        self.artists.push(artist);
    }

    /// Nothing drawn yet.
    pub fn is_empty(&self) -> bool {
        self.artists.is_empty()
    }

    /// Union of the artist extents, padded by 5% and widened when flat.
    pub fn data_bounds(&self) -> ((f64, f64), (f64, f64)) {
        let mut b = Bounds::default();
        for artist in &self.artists {
            if let Some(((x0, x1), (y0, y1))) = artist.bounds() {
                b.add(x0, y0);
                b.add(x1, y1);
            }
        }
        if let Scale::Categorical(labels) = &self.x_scale {
            b.add(-0.5, f64::NAN);
            b.add(labels.len() as f64 - 0.5, f64::NAN);
        }
        if let Scale::Categorical(labels) = &self.y_scale {
            b.add(f64::NAN, -0.5);
            b.add(f64::NAN, labels.len() as f64 - 0.5);
        }

        let pad = |range: Option<(f64, f64)>, categorical: bool| match range {
            None => (0.0, 1.0),
            Some((lo, hi)) if categorical => (lo, hi),
            Some((lo, hi)) if hi > lo => {
                let margin = (hi - lo) * 0.05;
                (lo - margin, hi + margin)
            }
            Some((lo, _)) => (lo - 0.5, lo + 0.5),
        };
        (
            pad(b.x, matches!(self.x_scale, Scale::Categorical(_))),
            pad(b.y, matches!(self.y_scale, Scale::Categorical(_))),
        )
    }
}

/// A grid of axes owned by one plotting call.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub grid: GridSpec,
    axes: Vec<Option<Axes>>,
    /// Pixel size `(width, height)`.
    pub size: (u32, u32),
    tight: bool,
}

impl Figure {
    /// A figure with one empty axes per grid cell, each `cell_px` square.
    pub fn new(grid: GridSpec, cell_px: u32) -> Self {
        Self {
            axes: vec![Some(Axes::new()); grid.capacity()],
            size: (cell_px * grid.cols as u32, cell_px * grid.rows as u32),
            grid,
            tight: false,
        }
    }

    /// A one-axes figure of `size_px` square.
    pub fn single(size_px: u32) -> Self {
        Self::new(GridSpec::single(), size_px)
    }

    pub fn axes(&self, index: usize) -> Option<&Axes> {
        self.axes.get(index).and_then(Option::as_ref)
    }

    pub fn axes_mut(&mut self, index: usize) -> Option<&mut Axes> {
        self.axes.get_mut(index).and_then(Option::as_mut)
    }

    /// Every slot in row-major order; deleted axes are `None`.
    pub fn slots(&self) -> &[Option<Axes>] {
        &self.axes
    }

    /// Delete the axes beyond the first `used`. Returns how many were removed.
    pub fn delete_unused(&mut self, used: usize) -> usize {
        let mut removed = 0;
        for slot in self.axes.iter_mut().skip(used) {
            if slot.take().is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Remaining axes.
    pub fn live_axes(&self) -> usize {
        self.axes.iter().filter(|a| a.is_some()).count()
    }

    /// Ask the renderer to shrink margins to the content.
    pub fn tight_layout(&mut self) {
        self.tight = true;
    }

    pub fn is_tight(&self) -> bool {
        self.tight
    }
}

/// Destination of finished figures. `save` consumes the figure.
pub trait FigureSink {
    fn save(&mut self, figure: Figure, path: &Path) -> Result<()>;
}

/// A figure handed to a [`RecordingSink`].
#[derive(Debug, Clone)]
pub struct SavedFigure {
    pub path: PathBuf,
    pub figure: Figure,
}

impl SavedFigure {
    /// File name without the `.png` extension.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Keeps figures in memory instead of rasterizing them.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub saved: Vec<SavedFigure>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stems(&self) -> Vec<String> {
        self.saved.iter().map(SavedFigure::stem).collect()
    }
}

impl FigureSink for RecordingSink {
    fn save(&mut self, figure: Figure, path: &Path) -> Result<()> {
        self.saved.push(SavedFigure {
            path: path.to_path_buf(),
            figure,
        });
        Ok(())
    }
}
