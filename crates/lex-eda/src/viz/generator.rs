//! Grid allocation and rendering for one visualization call.
//!
//! [`GraphGenerator::allocate_and_render`] sizes a grid for a
//! [`PlotRequest`], binds data to each axes, trims the unused axes and hands
//! the finished figure to a [`FigureSink`].

use super::aggregate::{AggFunc, AggregatedSeries, aggregate};
use super::charts::{ChartFamily, Drawable, Orientation, PlotData};
use crate::error::{EdaError, Result};
use crate::figure::{Axes, Figure, FigureSink, FigureStyle};
use crate::layout::{AggregationMode, GridDims, GridSpec, PlotKind, PlotRequest, calculate_grid};
use crate::loader::Table;
use crate::utils::{series_to_datetimes, series_to_f64};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Rotation applied to x tick labels of datetime charts, in degrees.
const DATE_TICK_ROTATION: f64 = 45.0;

/// What to do when drawing one cell fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Abort the call and return the error.
    #[default]
    Propagate,
    /// Log the error and leave the cell empty.
    SkipAndLog,
}

/// Renders plot requests against one table into an output directory.
pub struct GraphGenerator<'a, S: FigureSink> {
    table: &'a Table,
    output_dir: PathBuf,
    sink: S,
    style: FigureStyle,
    cell_px: u32,
    single_px: u32,
    policy: ErrorPolicy,
}

impl<'a, S: FigureSink> GraphGenerator<'a, S> {
    pub fn new(table: &'a Table, output_dir: impl Into<PathBuf>, sink: S, style: FigureStyle) -> Self {
        Self {
            table,
            output_dir: output_dir.into(),
            sink,
            style,
            cell_px: 400,
            single_px: 1000,
            policy: ErrorPolicy::default(),
        }
    }

    /// Pixel size of one grid cell.
    pub fn with_cell_size(mut self, px: u32) -> Self {
        self.cell_px = px;
        self
    }

    /// Pixel size of single-axes figures.
    pub fn with_single_size(mut self, px: u32) -> Self {
        self.single_px = px;
        self
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn table(&self) -> &Table {
        self.table
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Render `chart` for `request` and return the written paths, one per
    /// figure.
    pub fn allocate_and_render(
        &mut self,
        chart: &dyn Drawable,
        plot_name: &str,
        request: &PlotRequest,
    ) -> Result<Vec<PathBuf>> {
        match request.kind {
            PlotKind::Single => self.generate_single(chart, plot_name, request).map(|p| vec![p]),
            PlotKind::Sub => self.generate_sub(chart, plot_name, request).map(|p| vec![p]),
            PlotKind::Multi => match chart.family() {
                ChartFamily::Numerical => self.generate_numerical(chart, plot_name, request),
                ChartFamily::Categorical => self.generate_categorical(chart, plot_name, request),
                ChartFamily::Datetime => self.generate_datetime(chart, plot_name, request),
                ChartFamily::Matrix => Err(EdaError::InvalidPlotKind(format!(
                    "{} (chart '{}' only supports 'single')",
                    request.kind,
                    chart.name()
                ))),
            },
        }
    }

    // ===== Strategies =====

    fn generate_single(
        &mut self,
        chart: &dyn Drawable,
        plot_name: &str,
        request: &PlotRequest,
    ) -> Result<PathBuf> {
        let column = request.sub_columns().first();
        let data = match (&request.matrix, column) {
            (Some(matrix), _) => PlotData::Matrix(matrix),
            (None, Some(column)) => PlotData::Column {
                table: self.table,
                column,
                orientation: if request.x.is_some() {
                    Orientation::X
                } else {
                    Orientation::Y
                },
            },
            (None, None) => {
                return Err(EdaError::InvalidConfig(format!(
                    "single plot '{plot_name}' needs a correlation matrix or a column"
                )));
            }
        };

        let mut figure = Figure::single(self.single_px);
        if let Some(axes) = figure.axes_mut(0) {
            self.draw_cell(chart, axes, &data)?;
            axes.set_title(plot_name);
        }
        self.save(figure, 1, plot_name)
    }

    fn generate_sub(
        &mut self,
        chart: &dyn Drawable,
        plot_name: &str,
        request: &PlotRequest,
    ) -> Result<PathBuf> {
        let grid = calculate_grid(request.dims(), PlotKind::Sub)?;
        let mut figure = Figure::new(grid, self.cell_px);
        let columns = request.sub_columns();
        let orientation = if request.x.is_some() {
            Orientation::X
        } else {
            Orientation::Y
        };

        for (i, column) in columns.iter().enumerate() {
            let Some(axes) = figure.axes_mut(i) else { break };
            let data = PlotData::Column {
                table: self.table,
                column,
                orientation,
            };
            self.draw_cell(chart, axes, &data)?;
            match orientation {
                Orientation::X => axes.set_xlabel(column.as_str()),
                Orientation::Y => axes.set_ylabel(column.as_str()),
            }
        }
        self.save(figure, columns.len(), plot_name)
    }

    /// One figure per main (y) column, one axes per sub (x) column. Each
    /// axes plots the main column along x against the sub column along y.
    fn generate_numerical(
        &mut self,
        chart: &dyn Drawable,
        plot_name: &str,
        request: &PlotRequest,
    ) -> Result<Vec<PathBuf>> {
        let (Some(mains), Some(subs)) = (&request.y, &request.x) else {
            return Err(EdaError::InvalidConfig(format!(
                "multi plot '{plot_name}' needs both x and y columns"
            )));
        };

        let mut paths = Vec::new();
        for main in mains {
            let dims = GridDims {
                x: Some(1),
                y: Some(subs.len()),
                hue: None,
            };
            let mut figure = Figure::new(calculate_grid(dims, PlotKind::Multi)?, self.cell_px);
            for (j, sub) in subs.iter().enumerate() {
                let Some(axes) = figure.axes_mut(j) else { break };
                let data = PlotData::Pair {
                    table: self.table,
                    x: main,
                    y: Some(sub.as_str()),
                    hue: None,
                };
                self.draw_cell(chart, axes, &data)?;
                set_axis_properties(axes, None, main, sub);
            }
            paths.push(self.save(figure, subs.len(), &format!("{plot_name}_{main}"))?);
        }
        Ok(paths)
    }

    /// One figure per main categorical column. The other categorical
    /// columns act as hues; without any hue left the main column is drawn
    /// plainly.
    fn generate_categorical(
        &mut self,
        chart: &dyn Drawable,
        plot_name: &str,
        request: &PlotRequest,
    ) -> Result<Vec<PathBuf>> {
        let Some(mains) = &request.x else {
            return Err(EdaError::InvalidConfig(format!(
                "multi plot '{plot_name}' needs x columns"
            )));
        };
        let subs = request.y.as_deref().filter(|s| !s.is_empty());

        let mut paths = Vec::new();
        for main in mains {
            let hues: Vec<&String> = mains.iter().filter(|h| *h != main).collect();
            let stem = format!("{plot_name}_{main}");
            let figure = match (subs, hues.is_empty()) {
                (Some(subs), false) => self.categorical_with_subs(chart, main, subs, &hues)?,
                (None, false) => self.categorical_without_subs(chart, main, &hues)?,
                (subs, true) => {
                    debug!("No hue available for '{}', drawing it without hue", main);
                    self.categorical_plain(chart, main, subs)?
                }
            };
            let used = figure.grid.cells;
            paths.push(self.save(figure, used, &stem)?);
        }
        Ok(paths)
    }

    fn categorical_with_subs(
        &self,
        chart: &dyn Drawable,
        main: &str,
        subs: &[String],
        hues: &[&String],
    ) -> Result<Figure> {
        let dims = GridDims {
            x: Some(1),
            y: Some(subs.len()),
            hue: Some(hues.len()),
        };
        let mut grid = calculate_grid(dims, PlotKind::Multi)?;
        grid.cells = subs.len() * hues.len();
        let mut figure = Figure::new(grid, self.cell_px);

        for (j, sub) in subs.iter().enumerate() {
            for (k, hue) in hues.iter().enumerate() {
                let Some(axes) = figure.axes_mut(j * hues.len() + k) else {
                    break;
                };
                let data = PlotData::Pair {
                    table: self.table,
                    x: main,
                    y: Some(sub.as_str()),
                    hue: Some(hue.as_str()),
                };
                self.draw_cell(chart, axes, &data)?;
                axes.set_title(format!("{sub} by {main} (hue: {hue})"));
                set_axis_properties(axes, Some(hue.as_str()), main, sub);
            }
        }
        Ok(figure)
    }

    fn categorical_without_subs(
        &self,
        chart: &dyn Drawable,
        main: &str,
        hues: &[&String],
    ) -> Result<Figure> {
        let dims = GridDims {
            x: Some(1),
            y: None,
            hue: Some(hues.len()),
        };
        let mut figure = Figure::new(calculate_grid(dims, PlotKind::Multi)?, self.cell_px);
        for (k, hue) in hues.iter().enumerate() {
            let Some(axes) = figure.axes_mut(k) else { break };
            let data = PlotData::Pair {
                table: self.table,
                x: main,
                y: None,
                hue: Some(hue.as_str()),
            };
            self.draw_cell(chart, axes, &data)?;
            axes.set_title(format!("{main} by {hue}"));
            axes.set_xlabel(main);
        }
        Ok(figure)
    }

    fn categorical_plain(
        &self,
        chart: &dyn Drawable,
        main: &str,
        subs: Option<&[String]>,
    ) -> Result<Figure> {
        let Some(subs) = subs else {
            let mut figure = Figure::new(GridSpec::single(), self.cell_px);
            if let Some(axes) = figure.axes_mut(0) {
                let data = PlotData::Pair {
                    table: self.table,
                    x: main,
                    y: None,
                    hue: None,
                };
                self.draw_cell(chart, axes, &data)?;
                axes.set_title(main);
                axes.set_xlabel(main);
            }
            return Ok(figure);
        };

        let dims = GridDims {
            x: Some(1),
            y: Some(subs.len()),
            hue: None,
        };
        let mut figure = Figure::new(calculate_grid(dims, PlotKind::Multi)?, self.cell_px);
        for (j, sub) in subs.iter().enumerate() {
            let Some(axes) = figure.axes_mut(j) else { break };
            let data = PlotData::Pair {
                table: self.table,
                x: main,
                y: Some(sub.as_str()),
                hue: None,
            };
            self.draw_cell(chart, axes, &data)?;
            axes.set_title(format!("{sub} by {main}"));
            set_axis_properties(axes, None, main, sub);
        }
        Ok(figure)
    }

    /// One figure per datetime main column and aggregation function; each
    /// axes shows one aggregated y column. Mode `all` plots the raw rows, so
    /// its mean and median figures carry the same lines.
    fn generate_datetime(
        &mut self,
        chart: &dyn Drawable,
        plot_name: &str,
        request: &PlotRequest,
    ) -> Result<Vec<PathBuf>> {
        let (Some(mains), Some(subs)) = (&request.x, &request.y) else {
            return Err(EdaError::InvalidConfig(format!(
                "multi plot '{plot_name}' needs both x and y columns"
            )));
        };
        let mode = request.mode.unwrap_or(AggregationMode::All);

        let mut paths = Vec::new();
        for main in mains {
            let times = series_to_datetimes(self.table.series(main)?)?;
            let dims = GridDims {
                x: Some(1),
                y: Some(subs.len()),
                hue: None,
            };
            let grid = calculate_grid(dims, PlotKind::Multi)?;

            for func in AggFunc::ALL {
                let mut figure = Figure::new(grid, self.cell_px);
                for (j, sub) in subs.iter().enumerate() {
                    let Some(axes) = figure.axes_mut(j) else { break };
                    let values = series_to_f64(self.table.series(sub)?)?;
                    let series: [AggregatedSeries; 1] = [aggregate(
                        sub,
                        &times,
                        &values,
                        mode,
                        func,
                    )];
                    let data = PlotData::TimeSeries {
                        series: &series,
                        mode,
                    };
                    self.draw_cell(chart, axes, &data)?;
                    axes.x_tick_rotation = DATE_TICK_ROTATION;

                    axes.set_title(format!(
                        "{sub} by {main} (mode: {mode}, agg_func: {})",
                        func.as_str()
                    ));
                    set_axis_properties(axes, None, main, sub);
                }

                let stem = format!("{plot_name}_{main}_{mode}_{}", func.as_str());
                paths.push(self.save(figure, subs.len(), &stem)?);
            }
        }
        Ok(paths)
    }

    // ===== Cells and output =====

    fn draw_cell(&self, chart: &dyn Drawable, axes: &mut Axes, data: &PlotData<'_>) -> Result<()> {
        match chart.draw(axes, data, &self.style) {
            Ok(()) => Ok(()),
            Err(e) => match self.policy {
                ErrorPolicy::Propagate => Err(e),
                ErrorPolicy::SkipAndLog => {
                    warn!("Skipping {} cell: {}", chart.name(), e);
                    *axes = Axes::new();
                    Ok(())
                }
            },
        }
    }

    /// Delete the axes beyond `used`, tighten the layout and write
    /// `{stem}.png`.
    fn save(&mut self, mut figure: Figure, used: usize, stem: &str) -> Result<PathBuf> {
        let removed = figure.delete_unused(used);
        if removed > 0 {
            debug!("Removed {} unused axes from {}", removed, stem);
        }
        figure.tight_layout();

        let path = self.output_dir.join(format!("{stem}.png"));
        info!("Generating plot: {}", stem);
        self.sink
            .save(figure, &path)
            .map_err(|e| e.with_context(format!("Failed to save plot '{stem}'")))?;
        Ok(path)
    }
}

/// Axis labels and, when a hue is set, the legend title.
fn set_axis_properties(axes: &mut Axes, hue: Option<&str>, main: &str, sub: &str) {
    axes.set_xlabel(main);
    axes.set_ylabel(sub);
    if let Some(hue) = hue
        && !axes.legend.is_empty()
    {
        axes.legend_title = Some(hue.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::{Artist, RecordingSink, Scale};
    use crate::types::CorrelationMatrix;
    use crate::utils::datetime_series;
    use crate::viz::charts::Chart;
    use chrono::{NaiveDate, NaiveDateTime};
    use polars::prelude::*;
    use pretty_assertions::assert_eq;

    fn people() -> Table {
        let df = df! {
            "age" => [25.0, 30.0, 35.0, 40.0],
            "income" => [100.0, 300.0, 200.0, 400.0],
            "gender" => ["F", "M", "M", "F"],
            "city" => ["Seoul", "Busan", "Seoul", "Jeju"],
            "team" => ["a", "b", "a", "b"],
        }
        .unwrap();
        Table::new(df)
    }

    fn generator(table: &Table) -> GraphGenerator<'_, RecordingSink> {
        GraphGenerator::new(table, "out", RecordingSink::new(), FigureStyle::default())
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    // ==================== single and sub tests ====================

    #[test]
    fn test_single_heatmap() {
        let table = people();
        let mut generator = generator(&table);
        let matrix = CorrelationMatrix {
            columns: strings(&["age", "income"]),
            values: vec![vec![1.0, 0.8], vec![0.8, 1.0]],
        };
        let paths = generator
            .allocate_and_render(
                &Chart::Heatmap { annotate: true },
                "heatmap",
                &PlotRequest::single(matrix),
            )
            .unwrap();

        assert_eq!(paths, vec![PathBuf::from("out/heatmap.png")]);
        let saved = &generator.sink().saved[0];
        assert_eq!(saved.figure.size, (1000, 1000));
        assert!(saved.figure.is_tight());
        assert_eq!(
            saved.figure.axes(0).and_then(|a| a.title.clone()),
            Some("heatmap".to_string())
        );
    }

    #[test]
    fn test_sub_grid_trims_unused_axes() {
        let table = people();
        let mut generator = generator(&table);
        let request = PlotRequest::sub_x(strings(&["age", "income", "age"]));
        generator
            .allocate_and_render(&Chart::Histogram { bins: 15, kde: false }, "histogram", &request)
            .unwrap();

        let figure = &generator.sink().saved[0].figure;
        assert_eq!((figure.grid.rows, figure.grid.cols), (2, 2));
        assert_eq!(figure.live_axes(), 3);
        assert_eq!(
            figure.axes(1).and_then(|a| a.xlabel.clone()),
            Some("income".to_string())
        );
    }

    #[test]
    fn test_sub_box_uses_y_orientation() {
        let table = people();
        let mut generator = generator(&table);
        generator
            .allocate_and_render(&Chart::Box, "box", &PlotRequest::sub_y(strings(&["age"])))
            .unwrap();
        let axes = generator.sink().saved[0].figure.axes(0).cloned().unwrap();
        assert!(matches!(axes.artists[0], Artist::Box { vertical: true, .. }));
        assert_eq!(axes.ylabel.as_deref(), Some("age"));
    }

    // ==================== multi tests ====================

    #[test]
    fn test_numerical_multi_one_figure_per_main() {
        let table = people();
        let mut generator = generator(&table);
        let request = PlotRequest::multi(
            Some(strings(&["gender", "city", "team"])),
            Some(strings(&["age", "income"])),
        );
        let paths = generator
            .allocate_and_render(&Chart::Box, "box", &request)
            .unwrap();

        assert_eq!(paths.len(), 2);
        assert_eq!(generator.sink().stems(), vec!["box_age", "box_income"]);
        let figure = &generator.sink().saved[0].figure;
        assert_eq!(figure.live_axes(), 3);
        let axes = figure.axes(2).unwrap();
        assert_eq!(axes.xlabel.as_deref(), Some("age"));
        assert_eq!(axes.ylabel.as_deref(), Some("team"));
    }

    #[test]
    fn test_categorical_multi_with_subs() {
        let table = people();
        let mut generator = generator(&table);
        let request = PlotRequest::multi(
            Some(strings(&["gender", "city", "team"])),
            Some(strings(&["age"])),
        );
        generator
            .allocate_and_render(&Chart::Bar, "bar", &request)
            .unwrap();

        assert_eq!(generator.sink().stems(), vec!["bar_gender", "bar_city", "bar_team"]);
        let figure = &generator.sink().saved[0].figure;
        // one sub, two hues: rows = max(1, 2), cols = min(1, 2)
        assert_eq!((figure.grid.rows, figure.grid.cols), (2, 1));
        let titles: Vec<String> = figure
            .slots()
            .iter()
            .flatten()
            .filter_map(|a| a.title.clone())
            .collect();
        assert_eq!(
            titles,
            vec!["age by gender (hue: city)", "age by gender (hue: team)"]
        );
    }

    #[test]
    fn test_categorical_multi_without_subs() {
        let table = people();
        let mut generator = generator(&table);
        let request = PlotRequest::multi(Some(strings(&["gender", "city"])), None);
        generator
            .allocate_and_render(&Chart::Count, "count", &request)
            .unwrap();

        let figure = &generator.sink().saved[1].figure;
        assert_eq!(figure.live_axes(), 1);
        let axes = figure.axes(0).unwrap();
        assert_eq!(axes.title.as_deref(), Some("city by gender"));
        assert_eq!(axes.legend_title.as_deref(), Some("gender"));
    }

    #[test]
    fn test_categorical_multi_zero_hue() {
        let table = people();
        let mut generator = generator(&table);
        let request = PlotRequest::multi(Some(strings(&["gender"])), None);
        generator
            .allocate_and_render(&Chart::Count, "count", &request)
            .unwrap();

        assert_eq!(generator.sink().stems(), vec!["count_gender"]);
        let axes = generator.sink().saved[0].figure.axes(0).cloned().unwrap();
        assert_eq!(axes.title.as_deref(), Some("gender"));
        assert!(axes.legend.is_empty());
    }

    #[test]
    fn test_matrix_chart_rejects_multi() {
        let table = people();
        let mut generator = generator(&table);
        let request = PlotRequest::multi(Some(strings(&["age"])), Some(strings(&["income"])));
        let err = generator
            .allocate_and_render(&Chart::Heatmap { annotate: true }, "heatmap", &request)
            .unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_single_without_data_is_config_error() {
        let table = people();
        let mut generator = generator(&table);
        let mut request = PlotRequest::sub_x(Vec::new());
        request.kind = PlotKind::Single;
        let err = generator
            .allocate_and_render(&Chart::Box, "box", &request)
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    // ==================== error policy tests ====================

    #[test]
    fn test_propagate_policy_returns_cell_error() {
        let table = people();
        let mut generator = generator(&table);
        let request = PlotRequest::sub_x(strings(&["gender"]));
        let result =
            generator.allocate_and_render(&Chart::Kde { fill: true }, "kde", &request);
        assert!(result.is_err());
        assert!(generator.sink().saved.is_empty());
    }

    #[test]
    fn test_skip_policy_leaves_cell_empty() {
        let table = people();
        let mut generator = generator(&table).with_policy(ErrorPolicy::SkipAndLog);
        let request = PlotRequest::sub_x(strings(&["gender", "age"]));
        generator
            .allocate_and_render(&Chart::Kde { fill: true }, "kde", &request)
            .unwrap();

        let figure = &generator.sink().saved[0].figure;
        assert!(figure.axes(0).unwrap().is_empty());
        assert!(!figure.axes(1).unwrap().is_empty());
    }

    // ==================== datetime tests ====================

    fn sales() -> Table {
        let start = NaiveDate::from_ymd_opt(2022, 1, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        let dates: Vec<Option<NaiveDateTime>> = (0..90)
            .map(|d| Some(start + chrono::Duration::hours(d * 20)))
            .collect();
        let when = datetime_series("when", &dates).unwrap();
        let amount = Series::new("amount".into(), (0..90).map(|v| v as f64).collect::<Vec<_>>());
        let units = Series::new("units".into(), (0..90).map(|v| (v % 7) as f64).collect::<Vec<_>>());
        Table::new(
            DataFrame::new(vec![
                when.into_column(),
                amount.into_column(),
                units.into_column(),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_datetime_multi_files_per_agg_func() {
        let table = sales();
        let mut generator = generator(&table);
        let request = PlotRequest::multi(
            Some(strings(&["when"])),
            Some(strings(&["amount", "units"])),
        )
        .with_mode(AggregationMode::Month);
        generator
            .allocate_and_render(&Chart::Line, "line", &request)
            .unwrap();

        assert_eq!(
            generator.sink().stems(),
            vec!["line_when_month_mean", "line_when_month_median"]
        );
        let figure = &generator.sink().saved[0].figure;
        assert_eq!(figure.live_axes(), 2);
        let axes = figure.axes(1).unwrap();
        assert_eq!(
            axes.title.as_deref(),
            Some("units by when (mode: month, agg_func: mean)")
        );
        assert_eq!(axes.x_scale, Scale::Time);
        assert_eq!(axes.x_tick_rotation, 45.0);
        let Artist::Line { points, .. } = &axes.artists[0] else {
            panic!("expected a line");
        };
        // 90 readings every 20 hours span January to March
        assert_eq!(points.len(), 3);
    }

    #[test]
    fn test_datetime_mode_all_emits_mean_and_median() {
        let table = sales();
        let mut generator = generator(&table);
        let request = PlotRequest::multi(Some(strings(&["when"])), Some(strings(&["amount"])))
            .with_mode(AggregationMode::All);
        generator
            .allocate_and_render(&Chart::Line, "line", &request)
            .unwrap();

        assert_eq!(
            generator.sink().stems(),
            vec!["line_when_all_mean", "line_when_all_median"]
        );
        let saved = &generator.sink().saved;
        let mean = saved[0].figure.axes(0).cloned().unwrap();
        let median = saved[1].figure.axes(0).cloned().unwrap();
        assert_eq!(
            mean.title.as_deref(),
            Some("amount by when (mode: all, agg_func: mean)")
        );
        assert_eq!(
            median.title.as_deref(),
            Some("amount by when (mode: all, agg_func: median)")
        );
        // raw rows either way
        assert_eq!(mean.artists, median.artists);
    }
}
