use crate::config::EdaConfig;
use crate::document::{
    Body, BodyOptions, DocumentFont, DocumentPaginator, ImageSource, TableOptions,
};
use crate::error::{Result, ResultExt};
use crate::figure::{Figure, PngSink, RgbImage, render_rgb};
use crate::loader::Table;
use crate::summary::DataSummary;
use crate::types::{CorrelationMatrix, DataInfo, SummarySnapshot, TableData};
use crate::utils::{create_output_directory, format_percent};
use crate::viz::{Chart, Drawable, PlotData};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

use super::markdown::render_markdown;

/// Placeholder bodies for sections without data.
const NO_NUMERICAL: &str = "Numerical summary is not available.";
const NO_CATEGORICAL: &str = "Categorical summary is not available.";
const NO_DATETIME: &str = "Datetime summary is not available.";
const NO_CORRELATION: &str = "Correlation matrix is not available.";

/// Builds the five-section data summary report of one table.
///
/// Sections start on their own page:
///
/// 1. data information (shape, head, info, missing values, duplicates)
/// 2. numerical describe table
/// 3. categorical describe table and per-column features
/// 4. datetime statistics and calendar value counts
/// 5. correlation heatmap
///
/// A section whose columns are missing prints a one-line placeholder.
pub struct ReportGenerator<'a> {
    table: &'a Table,
    config: &'a EdaConfig,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(table: &'a Table, config: &'a EdaConfig) -> Self {
        Self { table, config }
    }

    fn summary(&self) -> DataSummary<'a> {
        DataSummary::new(self.table)
            .with_exclude(self.config.exclude_columns.iter().cloned())
            .with_correlation_method(self.config.correlation_method)
    }

    /// Lay out the whole report without writing it.
    pub fn build_document(&self) -> Result<DocumentPaginator> {
        let summary = self.summary();
        let mut pdf = DocumentPaginator::new(&self.config.dataset_name);
        if let Some(path) = &self.config.plot_style.font_path {
            pdf = pdf.with_font(DocumentFont::load(path)?);
        }
        pdf.add_page();

        self.add_data_info_section(&mut pdf, &summary.data_info()?);
        self.add_numerical_section(&mut pdf, summary.numerical_summary()?.as_ref());
        self.add_categorical_section(&mut pdf, &summary)?;
        self.add_datetime_section(&mut pdf, &summary)?;
        self.add_correlation_section(&mut pdf, summary.correlation()?.as_ref())?;

        debug!("Report laid out on {} pages", pdf.page_count());
        Ok(pdf)
    }

    /// Write the PDF report into the output directory.
    pub fn generate_report(&self) -> Result<PathBuf> {
        create_output_directory(&self.config.output_dir)?;
        let path = self.config.report_path();
        self.build_document()?
            .save(&path)
            .context(format!("Failed to write report {}", path.display()))?;
        info!(
            "Generating {} Data Summary Report in {}",
            self.config.dataset_name,
            self.config.output_dir.display()
        );
        Ok(path)
    }

    /// Write the same sections as a Markdown file next to the PDF.
    pub fn generate_markdown(&self) -> Result<PathBuf> {
        create_output_directory(&self.config.output_dir)?;
        let snapshot = self.snapshot()?;
        let info = self.summary().data_info()?;
        let path = self.config.markdown_path();
        fs::write(&path, render_markdown(&snapshot, &info))?;
        info!("Markdown report saved: {}", path.display());
        Ok(path)
    }

    /// Every summary as one serializable value.
    pub fn snapshot(&self) -> Result<SummarySnapshot> {
        self.summary().snapshot(&self.config.dataset_name)
    }

    /// Write `summary.json` into the output directory.
    pub fn write_summary_json(&self) -> Result<PathBuf> {
        create_output_directory(&self.config.output_dir)?;
        let path = self.config.output_dir.join("summary.json");
        fs::write(&path, serde_json::to_string_pretty(&self.snapshot()?)?)?;
        info!("Summary saved: {}", path.display());
        Ok(path)
    }

    // ===== Sections =====

    fn add_data_info_section(&self, pdf: &mut DocumentPaginator, info: &DataInfo) {
        let (rows, cols) = info.shape;
        pdf.chapter_title("01. Data Information", 1);
        pdf.chapter_body(
            "1.1. Data Shape",
            Body::Tuple(vec![rows.to_string(), cols.to_string()]),
            2,
            BodyOptions::last(),
        );
        pdf.add_table(&info.head, "1.2. Data Head", 2, TableOptions::default());
        pdf.chapter_body("1.3. Data Information", info.info.as_str(), 2, BodyOptions::default());
        pdf.chapter_body(
            "1.4. Missing Values",
            Body::Map(
                info.nulls
                    .iter()
                    .map(|(name, n)| (name.clone(), n.to_string()))
                    .collect(),
            ),
            2,
            BodyOptions::last(),
        );
        pdf.chapter_body(
            "1.5. Duplicated Rows",
            format!("Number of duplicated rows : {} rows", info.duplicates),
            2,
            BodyOptions::default(),
        );
        pdf.chapter_body(
            "",
            format!("Number of data length : {rows} rows"),
            4,
            BodyOptions::default().without_title(),
        );
        pdf.chapter_body(
            "",
            format!(
                "Ratio of duplicated rows : {}",
                format_percent(info.duplicates, rows)
            ),
            4,
            BodyOptions::last().without_title(),
        );
    }

    fn add_numerical_section(&self, pdf: &mut DocumentPaginator, numerical: Option<&TableData>) {
        pdf.add_page();
        pdf.chapter_title("02. Numerical Columns Summary", 1);
        match numerical {
            Some(table) => pdf.add_table(
                table,
                "2.1. Numerical Columns Statistics",
                2,
                TableOptions::default(),
            ),
            None => placeholder(pdf, NO_NUMERICAL),
        }
    }

    fn add_categorical_section(
        &self,
        pdf: &mut DocumentPaginator,
        summary: &DataSummary<'_>,
    ) -> Result<()> {
        pdf.add_page();
        pdf.chapter_title("03. Categorical Columns Summary", 1);
        let Some(categorical) = summary.categorical_summary()? else {
            placeholder(pdf, NO_CATEGORICAL);
            return Ok(());
        };

        pdf.add_table(
            &categorical.table,
            "3.1. Categorical Columns Statistics",
            2,
            TableOptions::default(),
        );
        pdf.chapter_title("3.2. Features Information", 2);
        for feature in &categorical.features {
            let body = format!(
                "Number of features : {}\nFeatures :\n{}",
                feature.num_features,
                feature.features.join(", ")
            );
            pdf.chapter_body(&feature.column, body, 3, BodyOptions::default().with_ln(1.0));
        }
        Ok(())
    }

    fn add_datetime_section(
        &self,
        pdf: &mut DocumentPaginator,
        summary: &DataSummary<'_>,
    ) -> Result<()> {
        pdf.add_page();
        pdf.chapter_title("04. Datetime Columns Summary", 1);
        let Some(datetime) = summary.datetime_summary()? else {
            placeholder(pdf, NO_DATETIME);
            return Ok(());
        };

        pdf.add_table(
            &datetime.summary,
            "4.1. Datetime Columns Statistics",
            2,
            TableOptions::default().repeat_title(),
        );
        for (k, decomposition) in datetime.columns.iter().enumerate() {
            let title = format!("4.{}. {}", k + 2, decomposition.column);
            pdf.chapter_title(&title, 2);
            for (part, counts) in &decomposition.parts {
                let mut counts = counts.clone();
                counts.columns = vec![part.as_str().to_string()];
                let options = TableOptions {
                    none_main_title: true,
                    none_title: false,
                };
                pdf.add_table(&counts, &title, 2, options);
            }
        }
        Ok(())
    }

    fn add_correlation_section(
        &self,
        pdf: &mut DocumentPaginator,
        matrix: Option<&CorrelationMatrix>,
    ) -> Result<()> {
        pdf.add_page();
        pdf.chapter_title("05. Correlation Matrix", 1);
        match matrix {
            Some(matrix) => {
                let image = self.correlation_image(matrix)?;
                pdf.add_image(ImageSource::Rgb(image))
            }
            None => {
                placeholder(pdf, NO_CORRELATION);
                Ok(())
            }
        }
    }

    /// Annotated heatmap rasterized in memory.
    fn correlation_image(&self, matrix: &CorrelationMatrix) -> Result<RgbImage> {
        let sink = PngSink::new(&self.config.plot_style)?;
        let style = sink.style();
        let mut figure = Figure::single(self.config.single_size_px);
        if let Some(axes) = figure.axes_mut(0) {
            Chart::Heatmap { annotate: true }.draw(axes, &PlotData::Matrix(matrix), style)?;
        }
        figure.tight_layout();
        render_rgb(&figure, style).context("Failed to render correlation heatmap")
    }
}

fn placeholder(pdf: &mut DocumentPaginator, text: &str) {
    pdf.chapter_body("", text, 4, BodyOptions::last().without_title());
}
