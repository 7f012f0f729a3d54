//! One-call driver over loading, figures and reports.

use crate::config::EdaConfig;
use crate::error::Result;
use crate::loader::{DataLoader, Table, TableInput};
use crate::reporting::ReportGenerator;
use crate::utils::create_output_directory;
use crate::viz::{Visualization, VisualizationSummary};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Files written by [`Eda::run`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct EdaOutput {
    pub plots: Option<VisualizationSummary>,
    pub report: Option<PathBuf>,
    pub markdown: Option<PathBuf>,
}

/// Runs the configured steps for one dataset.
///
/// # Example
///
/// ```rust,ignore
/// let config = EdaConfig::builder().dataset_name("Titanic").build()?;
/// let output = Eda::new(config).run_input(TableInput::from_path("titanic.csv")?)?;
/// ```
#[derive(Debug, Clone)]
pub struct Eda {
    config: EdaConfig,
}

impl Eda {
    pub fn new(config: EdaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EdaConfig {
        &self.config
    }

    /// Load an input with the configured column names.
    pub fn load(&self, input: impl Into<TableInput>) -> Result<Table> {
        DataLoader::new(input)
            .with_optional_column_names(self.config.column_names.clone())
            .load()
    }

    pub fn run_input(&self, input: impl Into<TableInput>) -> Result<EdaOutput> {
        let table = self.load(input)?;
        self.run(&table)
    }

    /// Render figures and write the reports that are switched on.
    pub fn run(&self, table: &Table) -> Result<EdaOutput> {
        create_output_directory(&self.config.output_dir)?;
        let mut output = EdaOutput::default();

        if self.config.generate_plots {
            output.plots = Some(Visualization::new(table, &self.config).visualize()?);
        }

        let reports = ReportGenerator::new(table, &self.config);
        if self.config.generate_report {
            output.report = Some(reports.generate_report()?);
        }
        if self.config.generate_markdown {
            output.markdown = Some(reports.generate_markdown()?);
        }

        info!(
            "Finished {} ({} figures)",
            self.config.dataset_name,
            output.plots.as_ref().map_or(0, |p| p.paths.len())
        );
        Ok(output)
    }
}
