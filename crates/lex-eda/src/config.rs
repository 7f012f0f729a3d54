//! Configuration types for the EDA toolkit.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic setup of summaries, plots and reports.

use crate::error::EdaError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

/// Visual theme applied to every figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// White background with a light grid
    #[default]
    WhiteGrid,
    /// Grey background with a white grid
    DarkGrid,
    /// White background, no grid
    White,
    /// Grey background, no grid
    Dark,
    /// White background, no grid, tick marks on the axes
    Ticks,
}

impl FromStr for Theme {
    type Err = EdaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whitegrid" => Ok(Theme::WhiteGrid),
            "darkgrid" => Ok(Theme::DarkGrid),
            "white" => Ok(Theme::White),
            "dark" => Ok(Theme::Dark),
            "ticks" => Ok(Theme::Ticks),
            other => Err(EdaError::InvalidConfig(format!("unknown theme '{other}'"))),
        }
    }
}

/// Color palette used for series and hue groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    #[default]
    Deep,
    Muted,
    Pastel,
    Bright,
    Dark,
    Colorblind,
}

impl FromStr for Palette {
    type Err = EdaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deep" => Ok(Palette::Deep),
            "muted" => Ok(Palette::Muted),
            "pastel" => Ok(Palette::Pastel),
            "bright" => Ok(Palette::Bright),
            "dark" => Ok(Palette::Dark),
            "colorblind" => Ok(Palette::Colorblind),
            other => Err(EdaError::InvalidConfig(format!("unknown palette '{other}'"))),
        }
    }
}

/// Correlation coefficient used for the correlation matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    /// Linear (Pearson product-moment) correlation
    #[default]
    Pearson,
    /// Rank (Spearman) correlation
    Spearman,
}

impl FromStr for CorrelationMethod {
    type Err = EdaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pearson" => Ok(CorrelationMethod::Pearson),
            "spearman" => Ok(CorrelationMethod::Spearman),
            other => Err(EdaError::InvalidConfig(format!(
                "unknown correlation method '{other}'"
            ))),
        }
    }
}

/// Plot styling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotStyle {
    /// Visual theme.
    /// Default: WhiteGrid
    pub theme: Theme,

    /// Multiplier applied to every font size in figures (must be > 0).
    /// Default: 1.2
    pub font_scale: f64,

    /// Series color palette.
    /// Default: Deep
    pub palette: Palette,

    /// rc-style overrides such as `axes.facecolor = "#eaeaf2"`.
    /// Unknown keys are logged and ignored.
    pub overrides: BTreeMap<String, String>,

    /// TrueType font used for figure text and embedded in the PDF report.
    /// Figures fall back to the bundled DejaVu Sans and the report to
    /// Helvetica when unset.
    /// Default: None
    pub font_path: Option<PathBuf>,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            font_scale: 1.2,
            palette: Palette::default(),
            overrides: BTreeMap::new(),
            font_path: None,
        }
    }
}

/// Configuration for summaries, figures and reports.
///
/// Use [`EdaConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lex_eda::config::{EdaConfig, Theme};
///
/// let config = EdaConfig::builder()
///     .output_dir("outputs/titanic")
///     .dataset_name("Titanic")
///     .exclude_columns(["Name", "Ticket"])
///     .theme(Theme::DarkGrid)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdaConfig {
    /// Output directory for figures and reports. Created if absent.
    /// Default: "./outputs"
    pub output_dir: PathBuf,

    /// Dataset display name embedded in the report header.
    /// Default: "Dataset"
    pub dataset_name: String,

    /// File name of the PDF report (must end in `.pdf`).
    /// Default: "report.pdf"
    pub report_name: String,

    /// Columns excluded from the categorical features listing and from the
    /// visualization column sets.
    /// Default: empty
    pub exclude_columns: Vec<String>,

    /// Column names for inputs that carry none (rows, arrays).
    /// Default: None
    pub column_names: Option<Vec<String>>,

    /// Plot styling.
    pub plot_style: PlotStyle,

    /// Number of histogram bins.
    /// Default: 15
    pub histogram_bins: usize,

    /// Pixel size of one grid cell (square).
    /// Default: 400
    pub cell_size_px: u32,

    /// Pixel size of single-axis figures such as the heatmap.
    /// Default: 1000
    pub single_size_px: u32,

    /// Correlation coefficient for the correlation matrix.
    /// Default: Pearson
    pub correlation_method: CorrelationMethod,

    /// Whether to render the figure battery.
    /// Default: true
    pub generate_plots: bool,

    /// Whether to write the PDF report.
    /// Default: true
    pub generate_report: bool,

    /// Whether to also write the Markdown report.
    /// Default: false
    pub generate_markdown: bool,
}

impl Default for EdaConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./outputs"),
            dataset_name: "Dataset".to_string(),
            report_name: "report.pdf".to_string(),
            exclude_columns: Vec::new(),
            column_names: None,
            plot_style: PlotStyle::default(),
            histogram_bins: 15,
            cell_size_px: 400,
            single_size_px: 1000,
            correlation_method: CorrelationMethod::default(),
            generate_plots: true,
            generate_report: true,
            generate_markdown: false,
        }
    }
}

impl EdaConfig {
    /// Create a new configuration builder.
    pub fn builder() -> EdaConfigBuilder {
        EdaConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.plot_style.font_scale > 0.0 && self.plot_style.font_scale.is_finite()) {
            return Err(ConfigValidationError::InvalidFontScale(
                self.plot_style.font_scale,
            ));
        }

        if self.histogram_bins == 0 {
            return Err(ConfigValidationError::InvalidBins(self.histogram_bins));
        }

        if self.cell_size_px < 100 {
            return Err(ConfigValidationError::InvalidFigureSize {
                field: "cell_size_px".to_string(),
                value: self.cell_size_px,
            });
        }

        if self.single_size_px < 100 {
            return Err(ConfigValidationError::InvalidFigureSize {
                field: "single_size_px".to_string(),
                value: self.single_size_px,
            });
        }

        if !self.report_name.to_ascii_lowercase().ends_with(".pdf") || self.report_name.len() < 5
        {
            return Err(ConfigValidationError::InvalidReportName(
                self.report_name.clone(),
            ));
        }

        if self.dataset_name.trim().is_empty() {
            return Err(ConfigValidationError::EmptyDatasetName);
        }

        Ok(())
    }

    /// Path of the PDF report inside the output directory.
    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(&self.report_name)
    }

    /// Path of the Markdown report (same stem as the PDF).
    pub fn markdown_path(&self) -> PathBuf {
        self.report_path().with_extension("md")
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid font scale: {0} (must be a positive number)")]
    InvalidFontScale(f64),

    #[error("Invalid histogram bins: {0} (must be at least 1)")]
    InvalidBins(usize),

    #[error("Invalid figure size for '{field}': {value}px (must be at least 100)")]
    InvalidFigureSize { field: String, value: u32 },

    #[error("Invalid report name '{0}' (must end in .pdf)")]
    InvalidReportName(String),

    #[error("Dataset name must not be empty")]
    EmptyDatasetName,
}

impl From<ConfigValidationError> for EdaError {
    fn from(err: ConfigValidationError) -> Self {
        EdaError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`EdaConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct EdaConfigBuilder {
    output_dir: Option<PathBuf>,
    dataset_name: Option<String>,
    report_name: Option<String>,
    exclude_columns: Option<Vec<String>>,
    column_names: Option<Vec<String>>,
    theme: Option<Theme>,
    font_scale: Option<f64>,
    palette: Option<Palette>,
    overrides: BTreeMap<String, String>,
    font_path: Option<PathBuf>,
    histogram_bins: Option<usize>,
    cell_size_px: Option<u32>,
    single_size_px: Option<u32>,
    correlation_method: Option<CorrelationMethod>,
    generate_plots: Option<bool>,
    generate_report: Option<bool>,
    generate_markdown: Option<bool>,
}

impl EdaConfigBuilder {
    /// Set the output directory for figures and reports.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Set the dataset display name used in the report header.
    pub fn dataset_name(mut self, name: impl Into<String>) -> Self {
        self.dataset_name = Some(name.into());
        self
    }

    /// Set the PDF report file name.
    pub fn report_name(mut self, name: impl Into<String>) -> Self {
        self.report_name = Some(name.into());
        self
    }

    /// Set columns excluded from features listing and plots.
    pub fn exclude_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set column names for inputs without names.
    pub fn column_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Set the figure theme.
    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }

    /// Set the figure font scale.
    pub fn font_scale(mut self, scale: f64) -> Self {
        self.font_scale = Some(scale);
        self
    }

    /// Set the color palette.
    pub fn palette(mut self, palette: Palette) -> Self {
        self.palette = Some(palette);
        self
    }

    /// Add an rc-style override.
    pub fn style_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Set the TrueType font used for figure text.
    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }

    /// Set the number of histogram bins.
    pub fn histogram_bins(mut self, bins: usize) -> Self {
        self.histogram_bins = Some(bins);
        self
    }

    /// Set the pixel size of one grid cell.
    pub fn cell_size_px(mut self, size: u32) -> Self {
        self.cell_size_px = Some(size);
        self
    }

    /// Set the pixel size of single-axis figures.
    pub fn single_size_px(mut self, size: u32) -> Self {
        self.single_size_px = Some(size);
        self
    }

    /// Set the correlation method.
    pub fn correlation_method(mut self, method: CorrelationMethod) -> Self {
        self.correlation_method = Some(method);
        self
    }

    /// Enable or disable the figure battery.
    pub fn generate_plots(mut self, enabled: bool) -> Self {
        self.generate_plots = Some(enabled);
        self
    }

    /// Enable or disable the PDF report.
    pub fn generate_report(mut self, enabled: bool) -> Self {
        self.generate_report = Some(enabled);
        self
    }

    /// Enable or disable the Markdown report.
    pub fn generate_markdown(mut self, enabled: bool) -> Self {
        self.generate_markdown = Some(enabled);
        self
    }

    /// Build the configuration with validation.
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn build(self) -> Result<EdaConfig, ConfigValidationError> {
        let config = self.build_unchecked();
        config.validate()?;
        Ok(config)
    }

    /// Build the configuration without validation.
    pub fn build_unchecked(self) -> EdaConfig {
        let default = EdaConfig::default();
        let style_default = PlotStyle::default();
        EdaConfig {
            output_dir: self.output_dir.unwrap_or(default.output_dir),
            dataset_name: self.dataset_name.unwrap_or(default.dataset_name),
            report_name: self.report_name.unwrap_or(default.report_name),
            exclude_columns: self.exclude_columns.unwrap_or(default.exclude_columns),
            column_names: self.column_names.or(default.column_names),
            plot_style: PlotStyle {
                theme: self.theme.unwrap_or(style_default.theme),
                font_scale: self.font_scale.unwrap_or(style_default.font_scale),
                palette: self.palette.unwrap_or(style_default.palette),
                overrides: self.overrides,
                font_path: self.font_path.or(style_default.font_path),
            },
            histogram_bins: self.histogram_bins.unwrap_or(default.histogram_bins),
            cell_size_px: self.cell_size_px.unwrap_or(default.cell_size_px),
            single_size_px: self.single_size_px.unwrap_or(default.single_size_px),
            correlation_method: self
                .correlation_method
                .unwrap_or(default.correlation_method),
            generate_plots: self.generate_plots.unwrap_or(default.generate_plots),
            generate_report: self.generate_report.unwrap_or(default.generate_report),
            generate_markdown: self.generate_markdown.unwrap_or(default.generate_markdown),
        }
    }
}
