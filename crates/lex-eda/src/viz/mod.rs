//! Visualization battery.
//!
//! [`Visualization`] runs the standard set of charts over a table: per
//! column distributions, the correlation heatmap, numeric-by-category
//! grids, categorical counts and time-bucketed lines. Chart families whose
//! columns are missing are skipped with a log line; per-chart render
//! failures are logged and do not stop the batch.

pub mod aggregate;
pub mod charts;
pub mod generator;

pub use aggregate::{AggFunc, AggregatedSeries, BucketPoint};
pub use charts::{Chart, ChartFamily, Drawable, Orientation, PlotData};
pub use generator::{ErrorPolicy, GraphGenerator};

use crate::config::EdaConfig;
use crate::error::Result;
use crate::figure::{FigureSink, FigureStyle, PngSink};
use crate::layout::{AggregationMode, PlotRequest};
use crate::loader::Table;
use crate::summary::DataSummary;
use crate::utils::create_output_directory;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// What a visualization run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VisualizationSummary {
    /// Written figures, in generation order.
    pub paths: Vec<PathBuf>,
    /// Plot names whose generation failed and was skipped.
    pub skipped: Vec<String>,
}

/// Runs the chart battery for one table and configuration.
pub struct Visualization<'a> {
    table: &'a Table,
    config: &'a EdaConfig,
}

impl<'a> Visualization<'a> {
    pub fn new(table: &'a Table, config: &'a EdaConfig) -> Self {
        Self { table, config }
    }

    /// Render every chart as PNG into the configured output directory.
    pub fn visualize(&self) -> Result<VisualizationSummary> {
        create_output_directory(&self.config.output_dir)?;
        let sink = PngSink::new(&self.config.plot_style)?;
        let (summary, _) = self.visualize_into(sink)?;
        Ok(summary)
    }

    /// Run the battery against any sink and hand the sink back.
    pub fn visualize_into<S: FigureSink>(&self, sink: S) -> Result<(VisualizationSummary, S)> {
        let table = self.table.without_columns(&self.config.exclude_columns)?;
        let num_cols = table.numeric_columns();
        let cat_cols = table.categorical_columns();
        let dt_cols = table.datetime_columns();
        let correlation = DataSummary::new(&table)
            .with_correlation_method(self.config.correlation_method)
            .correlation()?;

        let mut generator = GraphGenerator::new(
            &table,
            &self.config.output_dir,
            sink,
            FigureStyle::from_plot_style(&self.config.plot_style),
        )
        .with_cell_size(self.config.cell_size_px)
        .with_single_size(self.config.single_size_px)
        .with_policy(ErrorPolicy::SkipAndLog);
        let mut summary = VisualizationSummary::default();
        let bins = self.config.histogram_bins;

        if num_cols.is_empty() {
            info!("No numeric columns, skipping numerical plots");
        } else {
            let mut batch = Batch::new(&mut generator, &mut summary);
            batch.run(
                Chart::Histogram { bins, kde: false },
                "histogram",
                PlotRequest::sub_x(num_cols.clone()),
            )?;
            batch.run(
                Chart::Histogram { bins, kde: true },
                "histogram_kde",
                PlotRequest::sub_x(num_cols.clone()),
            )?;
            batch.run(Chart::Kde { fill: true }, "kde", PlotRequest::sub_x(num_cols.clone()))?;
            batch.run(Chart::Box, "box", PlotRequest::sub_y(num_cols.clone()))?;
            batch.run(Chart::Violin, "violin", PlotRequest::sub_y(num_cols.clone()))?;

            if let Some(matrix) = correlation {
                batch.run(
                    Chart::Heatmap { annotate: true },
                    "heatmap",
                    PlotRequest::single(matrix),
                )?;
            }

            if cat_cols.is_empty() {
                info!("No categorical columns, skipping box and violin grids");
            } else {
                let request =
                    PlotRequest::multi(Some(cat_cols.clone()), Some(num_cols.clone()));
                batch.run(Chart::Box, "box", request.clone())?;
                batch.run(Chart::Violin, "violin", request)?;
            }

            batch.run(
                Chart::Scatter,
                "scatter",
                PlotRequest::multi(Some(table.column_names()), Some(num_cols.clone())),
            )?;
        }

        if cat_cols.is_empty() {
            info!("No categorical columns, skipping categorical plots");
        } else {
            let mut batch = Batch::new(&mut generator, &mut summary);
            let subs = (!num_cols.is_empty()).then(|| num_cols.clone());
            batch.run(Chart::Bar, "bar", PlotRequest::multi(Some(cat_cols.clone()), subs))?;
            batch.run(Chart::Count, "count", PlotRequest::multi(Some(cat_cols.clone()), None))?;
        }

        if dt_cols.is_empty() || num_cols.is_empty() {
            info!("No datetime/numeric column pair, skipping line plots");
        } else {
            let mut batch = Batch::new(&mut generator, &mut summary);
            for mode in AggregationMode::ALL_MODES {
                batch.run(
                    Chart::Line,
                    "line",
                    PlotRequest::multi(Some(dt_cols.clone()), Some(num_cols.clone()))
                        .with_mode(mode),
                )?;
            }
        }

        info!(
            "Generated {} plots ({} skipped)",
            summary.paths.len(),
            summary.skipped.len()
        );
        Ok((summary, generator.into_sink()))
    }
}

/// Runs requests and records their outcome. Configuration errors abort the
/// batch; anything else is logged and skipped.
struct Batch<'g, 'a, S: FigureSink> {
    generator: &'g mut GraphGenerator<'a, S>,
    summary: &'g mut VisualizationSummary,
}

impl<'g, 'a, S: FigureSink> Batch<'g, 'a, S> {
    fn new(generator: &'g mut GraphGenerator<'a, S>, summary: &'g mut VisualizationSummary) -> Self {
        Self { generator, summary }
    }

    fn run(&mut self, chart: Chart, name: &str, request: PlotRequest) -> Result<()> {
        match self.generator.allocate_and_render(&chart, name, &request) {
            Ok(paths) => {
                self.summary.paths.extend(paths);
                Ok(())
            }
            Err(e) if e.is_configuration_error() => Err(e),
            Err(e) => {
                warn!("Skipping {} plot: {}", name, e);
                self.summary.skipped.push(name.to_string());
                Ok(())
            }
        }
    }
}
