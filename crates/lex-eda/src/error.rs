//! Custom error types for the EDA toolkit.
//!
//! This module provides the error hierarchy using `thiserror`. Errors fall
//! into three groups:
//!
//! - **Configuration errors** (unknown plot kind, unknown aggregation mode,
//!   mismatched column names) are fatal and never retried.
//! - **Input errors** (unsupported input shape, missing column) fail fast.
//! - **Wrapped errors** from polars, lopdf, image decoding and IO.
//!
//! Missing optional data (no numeric columns, no datetime columns, ...) is not
//! an error anywhere in the crate; the summary engine returns `None` instead.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the EDA toolkit.
#[derive(Error, Debug)]
pub enum EdaError {
    /// Plot kind or chart family is not valid for the request.
    #[error("Selected plot type ({0}) is invalid. Use 'single', 'sub' or 'multi'")]
    InvalidPlotKind(String),

    /// Datetime aggregation mode is not recognized.
    #[error(
        "Selected mode ({0}) is invalid. Use 'all', 'year', 'quarter', 'month', 'day' or 'hour'"
    )]
    InvalidAggregationMode(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Number of supplied column names does not match the data width,
    /// or rows/columns of the input have different lengths.
    #[error("Column length mismatch: expected {expected}, found {found}")]
    ColumnLengthMismatch { expected: usize, found: usize },

    /// Input data shape cannot be converted to a table.
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A chart was handed data it cannot draw.
    #[error("Cannot draw {chart}: {reason}")]
    InvalidPlotData { chart: String, reason: String },

    /// Rasterizing a figure failed.
    #[error("Failed to render figure: {0}")]
    Render(String),

    /// A font file could not be parsed as TrueType.
    #[error("Invalid font file: {0}")]
    InvalidFont(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// PDF serialization error.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Image decoding error.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<EdaError>,
    },
}

impl EdaError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        EdaError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for [`EdaError::InvalidPlotData`].
    pub fn plot_data(chart: impl Into<String>, reason: impl Into<String>) -> Self {
        EdaError::InvalidPlotData {
            chart: chart.into(),
            reason: reason.into(),
        }
    }

    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidPlotKind(_) => "INVALID_PLOT_KIND",
            Self::InvalidAggregationMode(_) => "INVALID_AGGREGATION_MODE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::ColumnLengthMismatch { .. } => "COLUMN_LENGTH_MISMATCH",
            Self::UnsupportedInput(_) => "UNSUPPORTED_INPUT",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidPlotData { .. } => "INVALID_PLOT_DATA",
            Self::Render(_) => "RENDER_ERROR",
            Self::InvalidFont(_) => "INVALID_FONT",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Pdf(_) => "PDF_ERROR",
            Self::Image(_) => "IMAGE_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error is a programmer/configuration error.
    ///
    /// These are raised immediately and must not be swallowed by the
    /// per-chart skip policy of the visualization batch.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Self::InvalidPlotKind(_)
            | Self::InvalidAggregationMode(_)
            | Self::InvalidConfig(_)
            | Self::ColumnLengthMismatch { .. } => true,
            Self::WithContext { source, .. } => source.is_configuration_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for EdaError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("EdaError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for EDA operations.
pub type Result<T> = std::result::Result<T, EdaError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| EdaError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            EdaError::InvalidPlotKind("grid".to_string()).error_code(),
            "INVALID_PLOT_KIND"
        );
        assert_eq!(
            EdaError::ColumnNotFound("Age".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
    }

    #[test]
    fn test_is_configuration_error() {
        assert!(EdaError::InvalidAggregationMode("week".to_string()).is_configuration_error());
        assert!(
            EdaError::ColumnLengthMismatch {
                expected: 3,
                found: 2
            }
            .is_configuration_error()
        );
        assert!(!EdaError::Render("boom".to_string()).is_configuration_error());
        assert!(
            EdaError::InvalidPlotKind("x".to_string())
                .with_context("while plotting")
                .is_configuration_error()
        );
    }

    #[test]
    fn test_error_serialization() {
        let error = EdaError::UnsupportedInput("scalar JSON value".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("UNSUPPORTED_INPUT"));
        assert!(json.contains("scalar JSON value"));
    }

    #[test]
    fn test_with_context() {
        let error = EdaError::ColumnNotFound("test".to_string()).with_context("During summary");
        assert!(error.to_string().contains("During summary"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_invalid_mode_message_lists_modes() {
        let error = EdaError::InvalidAggregationMode("week".to_string());
        let message = error.to_string();
        assert!(message.contains("week"));
        assert!(message.contains("quarter"));
    }
}
