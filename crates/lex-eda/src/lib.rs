//! Exploratory Data Analysis Library
//!
//! Descriptive statistics, standard statistical plots and a paginated PDF
//! summary report for tabular data, built with Rust and Polars.
//!
//! # Overview
//!
//! - **Loading**: frames, JSON-like columns/records/rows, numeric arrays,
//!   CSV, JSON and Parquet files, each column tagged numeric, categorical,
//!   datetime or other
//! - **Summaries**: shape, head, info, missing values, duplicates, describe
//!   tables per column kind, datetime decompositions and correlation
//! - **Figures**: histograms, KDEs, box/violin plots, scatter, bar and count
//!   grids, time-bucketed lines and a correlation heatmap, laid out in
//!   near-square grids and rasterized with `plotters`
//! - **Reports**: a five-section PDF written with `lopdf`, plus optional
//!   Markdown and JSON outputs
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_eda::{DataLoader, Eda, EdaConfig, TableInput};
//!
//! let config = EdaConfig::builder()
//!     .output_dir("outputs/titanic")
//!     .dataset_name("Titanic")
//!     .exclude_columns(["Name", "Ticket"])
//!     .build()?;
//!
//! let output = Eda::new(config).run_input(TableInput::from_path("titanic.csv")?)?;
//! println!("Report: {:?}", output.report);
//! ```
//!
//! # Building blocks
//!
//! ```rust,ignore
//! use lex_eda::{DataSummary, GraphGenerator, PlotRequest, Chart, RecordingSink};
//!
//! let summary = DataSummary::new(&table);
//! let numeric = summary.numerical_summary()?;
//!
//! let mut generator = GraphGenerator::new(&table, "plots", RecordingSink::new(), style);
//! generator.allocate_and_render(&Chart::Box, "box", &PlotRequest::sub_y(cols))?;
//! ```

pub mod config;
pub mod document;
pub mod eda;
pub mod error;
pub mod figure;
pub mod layout;
pub mod loader;
pub mod reporting;
pub mod summary;
pub mod types;
pub mod utils;
pub mod viz;

// Re-exports for convenient access
pub use config::{
    ConfigValidationError, CorrelationMethod, EdaConfig, EdaConfigBuilder, Palette, PlotStyle,
    Theme,
};
pub use document::{
    Body, BodyOptions, Cursor, DocumentFont, DocumentPaginator, ImageSource, TableOptions,
};
pub use eda::{Eda, EdaOutput};
pub use error::{EdaError, Result as EdaResult, ResultExt};
pub use figure::{
    Axes, Figure, FigureSink, FigureStyle, PngSink, RecordingSink, RgbImage, render_rgb,
};
pub use layout::{AggregationMode, GridDims, GridSpec, PlotKind, PlotRequest, calculate_grid};
pub use loader::{DataLoader, Table, TableInput};
pub use reporting::ReportGenerator;
pub use summary::DataSummary;
pub use types::{
    CategoricalSummary, ColumnKind, CorrelationMatrix, DataInfo, DatePart, DatetimeDecomposition,
    DatetimeSummary, FeatureInfo, SummarySnapshot, TableData,
};
pub use viz::{
    AggFunc, Chart, ChartFamily, Drawable, ErrorPolicy, GraphGenerator, PlotData, Visualization,
    VisualizationSummary,
};

static_assertions::assert_impl_all!(EdaConfig: Send, Sync);
static_assertions::assert_impl_all!(Table: Send, Sync);
static_assertions::assert_impl_all!(DocumentPaginator: Send);
