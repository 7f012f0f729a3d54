//! Rasterization of [`Figure`]s with plotters.
//!
//! Text (titles, tick labels, legends, annotations) is drawn with the font
//! configured in [`PlotStyle::font_path`], or the bundled DejaVu Sans.

use super::style::{FigureStyle, coolwarm};
use super::{Artist, Axes, Figure, FigureSink, LegendEntry, Scale, TickPlan};
use crate::config::PlotStyle;
use crate::error::{EdaError, Result};
use crate::layout::{LegendSlot, date_ticks, thin_ticks};
use chrono::DateTime;
use once_cell::sync::OnceCell;
use plotters::coord::Shift;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

const FONT_FAMILY: &str = "sans-serif";

/// DejaVu Sans, used when no font file is configured.
pub const DEFAULT_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Font files already read, by canonical path. plotters keeps the data for
/// the process lifetime, so each file is loaded once.
static FONT_FILES: OnceCell<Mutex<HashMap<PathBuf, &'static [u8]>>> = OnceCell::new();

type Chart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn render_error<E: std::error::Error + Send + Sync>(err: DrawingAreaErrorKind<E>) -> EdaError {
    EdaError::Render(err.to_string())
}

fn register_font_data(data: &'static [u8], origin: &str) -> Result<()> {
    for font_style in [FontStyle::Normal, FontStyle::Bold] {
        plotters::style::register_font(FONT_FAMILY, font_style, data)
            .map_err(|_| EdaError::InvalidFont(origin.to_string()))?;
    }
    Ok(())
}

/// Register the bundled font for all figure text.
pub fn register_default_font() -> Result<()> {
    register_font_data(DEFAULT_FONT, "bundled DejaVu Sans")
}

/// Register a TrueType font file for all figure text.
pub fn register_font_file(path: &Path) -> Result<()> {
    let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let files = FONT_FILES.get_or_init(|| Mutex::new(HashMap::new()));
    let mut files = files
        .lock()
        .map_err(|_| EdaError::Render("font registry lock poisoned".to_string()))?;

    let data = match files.get(&key) {
        Some(data) => *data,
        None => {
            let bytes = std::fs::read(path)?;
            let data: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            files.insert(key, data);
            info!("Loaded figure font: {}", path.display());
            data
        }
    };
    register_font_data(data, &path.display().to_string())
}

/// An RGB pixel buffer, row-major, three bytes per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Writes figures as PNG files.
#[derive(Debug, Clone)]
pub struct PngSink {
    style: FigureStyle,
}

impl PngSink {
    /// Resolve the style and register the configured font, or the bundled
    /// one.
    pub fn new(plot_style: &PlotStyle) -> Result<Self> {
        let mut style = FigureStyle::from_plot_style(plot_style);
        match &plot_style.font_path {
            Some(path) => register_font_file(path)?,
            None => register_default_font()?,
        }
        style.text = true;
        Ok(Self { style })
    }

    pub fn with_style(style: FigureStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &FigureStyle {
        &self.style
    }
}

impl FigureSink for PngSink {
    fn save(&mut self, figure: Figure, path: &Path) -> Result<()> {
        let root = BitMapBackend::new(path, figure.size).into_drawing_area();
        draw_figure(&root, &figure, &self.style)?;
        root.present().map_err(render_error)?;
        debug!("Wrote figure {}", path.display());
        Ok(())
    }
}

/// Rasterize a figure into memory.
pub fn render_rgb(figure: &Figure, style: &FigureStyle) -> Result<RgbImage> {
    let (width, height) = figure.size;
    let mut pixels = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, figure.size).into_drawing_area();
        draw_figure(&root, figure, style)?;
        root.present().map_err(render_error)?;
    }
    Ok(RgbImage {
        width,
        height,
        pixels,
    })
}

fn draw_figure<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &Figure,
    style: &FigureStyle,
) -> Result<()> {
    root.fill(&style.figure_background).map_err(render_error)?;
    let areas = root.split_evenly((figure.grid.rows, figure.grid.cols));
    for (i, (area, slot)) in areas.iter().zip(figure.slots()).enumerate() {
        let Some(axes) = slot else { continue };
        if let Err(e) = draw_axes(area, axes, style, figure.is_tight()) {
            warn!("Failed to draw axes {}: {}", i, e);
        }
    }
    Ok(())
}

// ===== Axes =====

fn draw_axes<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    axes: &Axes,
    style: &FigureStyle,
    tight: bool,
) -> Result<()> {
    let ((x0, x1), (y0, y1)) = axes.data_bounds();
    let font_px = style.font_px(1.0);

    let mut builder = ChartBuilder::on(area);
    builder.margin(if tight { 8 } else { 20 });
    if style.text {
        if let Some(title) = &axes.title {
            builder.caption(title, text_style(style, 1.1));
        }
        let rotated = axes.x_tick_rotation.abs() > f64::EPSILON;
        let x_area = if rotated { font_px * 6.0 } else { font_px * 3.5 };
        builder
            .x_label_area_size(x_area as u32)
            .y_label_area_size((font_px * 5.0) as u32);
    }
    let mut chart = builder
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(render_error)?;
    chart
        .plotting_area()
        .fill(&style.axes_background)
        .map_err(render_error)?;

    let x_ticks = tick_positions(&axes.x_scale, &axes.x_ticks, (x0, x1));
    let y_ticks = tick_positions(&axes.y_scale, &axes.y_ticks, (y0, y1));

    if let Some(grid) = style.grid {
        let grid_style = grid.stroke_width(1);
        chart
            .draw_series(
                x_ticks
                    .iter()
                    .map(|(x, _)| PathElement::new(vec![(*x, y0), (*x, y1)], grid_style)),
            )
            .map_err(render_error)?;
        chart
            .draw_series(
                y_ticks
                    .iter()
                    .map(|(y, _)| PathElement::new(vec![(x0, *y), (x1, *y)], grid_style)),
            )
            .map_err(render_error)?;
    }

    for artist in &axes.artists {
        draw_artist(&mut chart, artist, style)?;
    }

    let axis_style = style.axis_color.stroke_width(1);
    chart
        .draw_series([
            PathElement::new(vec![(x0, y0), (x1, y0)], axis_style),
            PathElement::new(vec![(x0, y0), (x0, y1)], axis_style),
        ])
        .map_err(render_error)?;

    if style.text {
        draw_tick_labels(area, &chart, axes, style, &x_ticks, &y_ticks, (x0, y0))?;
        draw_legend(area, &chart, axes, style, (x1, y1))?;
    }
    Ok(())
}

fn text_style(style: &FigureStyle, relative: f64) -> TextStyle<'static> {
    (FONT_FAMILY, style.font_px(relative))
        .into_font()
        .color(&style.text_color)
}

fn relative(area_base: (i32, i32), point: (i32, i32)) -> (i32, i32) {
    (point.0 - area_base.0, point.1 - area_base.1)
}

#[allow(clippy::too_many_arguments)]
fn draw_tick_labels<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    chart: &Chart<'_, DB>,
    axes: &Axes,
    style: &FigureStyle,
    x_ticks: &[(f64, String)],
    y_ticks: &[(f64, String)],
    origin: (f64, f64),
) -> Result<()> {
    let base = area.get_base_pixel();
    let tick_len = if style.ticks { 5 } else { 3 };
    let rotated = axes.x_tick_rotation.abs() > f64::EPSILON;

    let x_label_style = if rotated {
        (FONT_FAMILY, style.font_px(0.8))
            .into_font()
            .transform(FontTransform::Rotate270)
            .color(&style.text_color)
            .pos(Pos::new(HPos::Right, VPos::Center))
    } else {
        text_style(style, 0.8).pos(Pos::new(HPos::Center, VPos::Top))
    };
    for (x, label) in x_ticks {
        let p = relative(base, chart.backend_coord(&(*x, origin.1)));
        area.draw(&PathElement::new(
            vec![p, (p.0, p.1 + tick_len)],
            style.axis_color.stroke_width(1),
        ))
        .map_err(render_error)?;
        area.draw(&Text::new(
            label.clone(),
            (p.0, p.1 + tick_len + 2),
            x_label_style.clone(),
        ))
        .map_err(render_error)?;
    }

    let y_label_style = text_style(style, 0.8).pos(Pos::new(HPos::Right, VPos::Center));
    for (y, label) in y_ticks {
        let p = relative(base, chart.backend_coord(&(origin.0, *y)));
        area.draw(&PathElement::new(
            vec![p, (p.0 - tick_len, p.1)],
            style.axis_color.stroke_width(1),
        ))
        .map_err(render_error)?;
        area.draw(&Text::new(
            label.clone(),
            (p.0 - tick_len - 2, p.1),
            y_label_style.clone(),
        ))
        .map_err(render_error)?;
    }

    let (width, height) = area.dim_in_pixel();
    if let Some(xlabel) = &axes.xlabel {
        area.draw(&Text::new(
            xlabel.clone(),
            (width as i32 / 2, height as i32 - 4),
            text_style(style, 0.9).pos(Pos::new(HPos::Center, VPos::Bottom)),
        ))
        .map_err(render_error)?;
    }
    if let Some(ylabel) = &axes.ylabel {
        let font = (FONT_FAMILY, style.font_px(0.9))
            .into_font()
            .transform(FontTransform::Rotate270)
            .color(&style.text_color)
            .pos(Pos::new(HPos::Center, VPos::Top));
        area.draw(&Text::new(ylabel.clone(), (4, height as i32 / 2), font))
            .map_err(render_error)?;
    }
    Ok(())
}

fn draw_legend<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    chart: &Chart<'_, DB>,
    axes: &Axes,
    style: &FigureStyle,
    top_right: (f64, f64),
) -> Result<()> {
    if axes.legend.is_empty() {
        return Ok(());
    }
    let base = area.get_base_pixel();
    let anchor = relative(base, chart.backend_coord(&top_right));
    let row_h = style.font_px(0.8) as i32 + 4;
    let swatch = (row_h - 6).max(4);
    let label_style = text_style(style, 0.7).pos(Pos::new(HPos::Right, VPos::Center));
    let x_text = anchor.0 - swatch - 10;
    let mut y = anchor.1 + 8;

    if let Some(title) = &axes.legend_title {
        area.draw(&Text::new(title.clone(), (anchor.0 - 6, y), label_style.clone()))
            .map_err(render_error)?;
        y += row_h;
    }

    for slot in &axes.legend {
        match slot {
            LegendSlot::Entry(LegendEntry { label, color }) => {
                area.draw(&Rectangle::new(
                    [
                        (anchor.0 - swatch - 6, y - swatch / 2),
                        (anchor.0 - 6, y + swatch / 2),
                    ],
                    color.filled(),
                ))
                .map_err(render_error)?;
                area.draw(&Text::new(label.clone(), (x_text, y), label_style.clone()))
                    .map_err(render_error)?;
            }
            LegendSlot::Ellipsis => {
                area.draw(&Text::new(
                    crate::layout::axis::LEGEND_ELLIPSIS,
                    (x_text, y),
                    label_style.clone(),
                ))
                .map_err(render_error)?;
            }
        }
        y += row_h;
    }
    Ok(())
}

// ===== Artists =====

fn orient(vertical: bool, category: f64, value: f64) -> (f64, f64) {
    if vertical {
        (category, value)
    } else {
        (value, category)
    }
}

fn draw_artist<DB: DrawingBackend>(
    chart: &mut Chart<'_, DB>,
    artist: &Artist,
    style: &FigureStyle,
) -> Result<()> {
    match artist {
        Artist::Bars(bars) => {
            chart
                .draw_series(bars.iter().map(|bar| {
                    Rectangle::new([(bar.x0, bar.y0), (bar.x1, bar.y1)], bar.color.filled())
                }))
                .map_err(render_error)?;
        }
        Artist::Line { points, color } => {
            chart
                .draw_series(LineSeries::new(
                    points.iter().copied(),
                    color.stroke_width(style.line_width),
                ))
                .map_err(render_error)?;
        }
        Artist::Area {
            points,
            baseline,
            color,
        } => {
            chart
                .draw_series(AreaSeries::new(
                    points.iter().copied(),
                    *baseline,
                    color.mix(0.3).filled(),
                ))
                .map_err(render_error)?;
            chart
                .draw_series(LineSeries::new(
                    points.iter().copied(),
                    color.stroke_width(style.line_width),
                ))
                .map_err(render_error)?;
        }
        Artist::Points { points, color } => {
            chart
                .draw_series(
                    points
                        .iter()
                        .map(|p| Circle::new(*p, 3, color.mix(0.8).filled())),
                )
                .map_err(render_error)?;
        }
        Artist::Box {
            position,
            width,
            stats,
            color,
            vertical,
        } => {
            let v = *vertical;
            let (lo, hi) = (position - width / 2.0, position + width / 2.0);
            let edge = style.axis_color.stroke_width(1);
            chart
                .draw_series([
                    Rectangle::new([orient(v, lo, stats.q1), orient(v, hi, stats.q3)], color.filled()),
                    Rectangle::new([orient(v, lo, stats.q1), orient(v, hi, stats.q3)], edge),
                ])
                .map_err(render_error)?;
            let cap = width / 4.0;
            chart
                .draw_series([
                    PathElement::new(
                        vec![orient(v, lo, stats.median), orient(v, hi, stats.median)],
                        style.axis_color.stroke_width(2),
                    ),
                    PathElement::new(
                        vec![
                            orient(v, *position, stats.q1),
                            orient(v, *position, stats.whisker_low),
                        ],
                        edge,
                    ),
                    PathElement::new(
                        vec![
                            orient(v, *position, stats.q3),
                            orient(v, *position, stats.whisker_high),
                        ],
                        edge,
                    ),
                    PathElement::new(
                        vec![
                            orient(v, position - cap, stats.whisker_low),
                            orient(v, position + cap, stats.whisker_low),
                        ],
                        edge,
                    ),
                    PathElement::new(
                        vec![
                            orient(v, position - cap, stats.whisker_high),
                            orient(v, position + cap, stats.whisker_high),
                        ],
                        edge,
                    ),
                ])
                .map_err(render_error)?;
            chart
                .draw_series(
                    stats
                        .outliers
                        .iter()
                        .map(|o| Circle::new(orient(v, *position, *o), 3, edge)),
                )
                .map_err(render_error)?;
        }
        Artist::Violin {
            position,
            profile,
            color,
            vertical,
        } => {
            if profile.len() < 2 {
                return Ok(());
            }
            let mut outline: Vec<(f64, f64)> = profile
                .iter()
                .map(|(value, half)| orient(*vertical, position + half, *value))
                .collect();
            outline.extend(
                profile
                    .iter()
                    .rev()
                    .map(|(value, half)| orient(*vertical, position - half, *value)),
            );
            chart
                .draw_series(std::iter::once(Polygon::new(
                    outline.clone(),
                    color.mix(0.8).filled(),
                )))
                .map_err(render_error)?;
            outline.push(outline[0]);
            chart
                .draw_series(std::iter::once(PathElement::new(
                    outline,
                    style.axis_color.stroke_width(1),
                )))
                .map_err(render_error)?;
        }
        Artist::Heatmap { values, annotate } => {
            let n = values.len();
            let cells = values.iter().enumerate().flat_map(|(i, row)| {
                row.iter().enumerate().map(move |(j, v)| {
                    let (cx, cy) = (j as f64, (n - 1 - i) as f64);
                    Rectangle::new(
                        [(cx - 0.5, cy - 0.5), (cx + 0.5, cy + 0.5)],
                        coolwarm(*v).filled(),
                    )
                })
            });
            chart.draw_series(cells).map_err(render_error)?;

            if *annotate && style.text {
                let font = text_style(style, 0.8).pos(Pos::new(HPos::Center, VPos::Center));
                let labels = values.iter().enumerate().flat_map(|(i, row)| {
                    let font = font.clone();
                    row.iter().enumerate().map(move |(j, v)| {
                        Text::new(
                            format!("{v:.2}"),
                            (j as f64, (n - 1 - i) as f64),
                            font.clone(),
                        )
                    })
                });
                chart.draw_series(labels).map_err(render_error)?;
            }
        }
    }
    Ok(())
}

// ===== Ticks =====

/// Tick positions and labels for one axis.
pub(crate) fn tick_positions(scale: &Scale, plan: &TickPlan, range: (f64, f64)) -> Vec<(f64, String)> {
    let in_range = |x: f64| x >= range.0 - 1e-9 && x <= range.1 + 1e-9;
    let ticks: Vec<(f64, String)> = match (plan, scale) {
        (TickPlan::Positions(positions), _) => positions.clone(),
        (TickPlan::Dates(dates), _) => dates
            .major
            .iter()
            .map(|t| (t.at.and_utc().timestamp_millis() as f64, t.label.clone()))
            .collect(),
        (TickPlan::Auto, Scale::Categorical(labels)) => thin_ticks(labels.len())
            .into_iter()
            .map(|i| (i as f64, labels[i].clone()))
            .collect(),
        (TickPlan::Auto, Scale::Time) => {
            let to_dt = |ms: f64| DateTime::from_timestamp_millis(ms as i64).map(|d| d.naive_utc());
            match (to_dt(range.0), to_dt(range.1)) {
                (Some(min), Some(max)) => date_ticks(min, max, None)
                    .major
                    .into_iter()
                    .map(|t| (t.at.and_utc().timestamp_millis() as f64, t.label))
                    .collect(),
                _ => Vec::new(),
            }
        }
        (TickPlan::Auto, Scale::Linear) => nice_ticks(range.0, range.1, 5),
    };
    ticks.into_iter().filter(|(x, _)| in_range(*x)).collect()
}

/// Round-number ticks covering `lo..=hi`.
pub(crate) fn nice_ticks(lo: f64, hi: f64, target: usize) -> Vec<(f64, String)> {
    let span = hi - lo;
    if !(span > 0.0 && span.is_finite()) || target == 0 {
        return Vec::new();
    }
    let raw = span / target as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let norm = raw / magnitude;
    let step = magnitude
        * if norm < 1.5 {
            1.0
        } else if norm < 3.0 {
            2.0
        } else if norm < 7.0 {
            5.0
        } else {
            10.0
        };
    let decimals = if step >= 1.0 {
        0
    } else {
        (-step.log10()).ceil().clamp(0.0, 6.0) as usize
    };

    let mut ticks = Vec::new();
    let mut k = (lo / step).ceil();
    while k * step <= hi + step * 1e-9 {
        let value = k * step;
        // avoid "-0"
        let value = if value.abs() < step * 1e-9 { 0.0 } else { value };
        ticks.push((value, format!("{value:.decimals$}")));
        k += 1.0;
    }
    ticks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::Bar;
    use crate::layout::GridSpec;

    #[test]
    fn test_nice_ticks() {
        let ticks = nice_ticks(0.0, 10.0, 5);
        let labels: Vec<&str> = ticks.iter().map(|(_, l)| l.as_str()).collect();
        assert_eq!(labels, vec!["0", "2", "4", "6", "8", "10"]);

        let small = nice_ticks(0.0, 0.5, 5);
        assert_eq!(small[1].1, "0.1");
        assert!(nice_ticks(1.0, 1.0, 5).is_empty());
    }

    #[test]
    fn test_categorical_ticks_thinned() {
        let labels: Vec<String> = (0..30).map(|i| format!("c{i}")).collect();
        let ticks = tick_positions(&Scale::Categorical(labels), &TickPlan::Auto, (-0.5, 29.5));
        assert!(ticks.len() <= 10);
        assert_eq!(ticks[0], (0.0, "c0".to_string()));
    }

    #[test]
    fn test_render_rgb_without_font() {
        let mut figure = Figure::new(GridSpec::for_cells(2), 120);
        if let Some(axes) = figure.axes_mut(0) {
            axes.set_title("ignored without a font");
            axes.add(Artist::Bars(vec![Bar {
                x0: 0.0,
                x1: 1.0,
                y0: 0.0,
                y1: 3.0,
                color: RGBColor(0x4C, 0x72, 0xB0),
            }]));
        }
        figure.delete_unused(1);

        let image = render_rgb(&figure, &FigureStyle::default()).unwrap();
        assert_eq!((image.width, image.height), (240, 120));
        assert_eq!(image.pixels.len(), 240 * 120 * 3);
        // the deleted right half stays figure background
        let last = image.pixels.len() - 3;
        assert_eq!(&image.pixels[last..], &[0xFF, 0xFF, 0xFF]);
        // the bar color appears somewhere
        assert!(
            image
                .pixels
                .chunks(3)
                .any(|p| p == [0x4C, 0x72, 0xB0])
        );
    }

    #[test]
    fn test_png_sink_writes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("plot.png");
        let mut figure = Figure::single(150);
        if let Some(axes) = figure.axes_mut(0) {
            axes.add(Artist::Line {
                points: vec![(0.0, 0.0), (1.0, 1.0)],
                color: RGBColor(0xDD, 0x84, 0x52),
            });
        }
        let mut sink = PngSink::with_style(FigureStyle::default());
        sink.save(figure, &path).unwrap();
        assert!(path.exists());
        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.width(), 150);
    }

    // ==================== font tests ====================

    #[test]
    fn test_default_font_draws_text() {
        let sink = PngSink::new(&PlotStyle::default()).unwrap();
        assert!(sink.style().text);

        let mut figure = Figure::single(200);
        if let Some(axes) = figure.axes_mut(0) {
            axes.set_title("Temperature by hour");
        }
        let shapes_only = FigureStyle {
            text: false,
            ..sink.style().clone()
        };
        let with_text = render_rgb(&figure, sink.style()).unwrap();
        let without_text = render_rgb(&figure, &shapes_only).unwrap();
        assert_ne!(with_text.pixels, without_text.pixels);
    }

    #[test]
    fn test_font_file_is_read_once() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sans.ttf");
        std::fs::write(&path, DEFAULT_FONT).unwrap();

        register_font_file(&path).unwrap();
        let key = path.canonicalize().unwrap();
        let first = FONT_FILES.get().unwrap().lock().unwrap()[&key];
        register_font_file(&path).unwrap();
        let second = FONT_FILES.get().unwrap().lock().unwrap()[&key];
        assert!(std::ptr::eq(first, second));

        // registering the bundled font again leaves later figures drawable
        register_default_font().unwrap();
    }

    #[test]
    fn test_invalid_font_file_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        let err = register_font_file(&path).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_FONT");
    }
}
