//! Error types shared by every stage of the credit default pipeline.
//!
//! The variants follow the four failure classes the pipeline distinguishes:
//! configuration, schema, data quality and numerical. Each one carries the
//! piece of context a user needs to fix the run (a path, a column name or a
//! model name). Nothing is retried; every error aborts the run.
//!
//! Errors serialize as `{ code, message }` so `--json` callers get a stable
//! machine-readable shape.

use crate::config::ConfigValidationError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Configuration file or a configured path is missing or unreadable.
    #[error("Configuration error for '{}': {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    /// Configuration values failed validation.
    #[error("Invalid configuration: {0}")]
    ConfigValidation(#[from] ConfigValidationError),

    /// Expected column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// None of the configured target names matched a column.
    #[error("No target column found: expected one of {candidates:?}, dataset has {columns:?}")]
    TargetNotFound {
        candidates: Vec<String>,
        columns: Vec<String>,
    },

    /// Column exists but its values cannot be read as the expected type.
    #[error("Column '{column}' has an unsupported type (expected {expected})")]
    InvalidColumnType { column: String, expected: String },

    /// Table content is unusable (empty table, all-missing column, single-class target).
    #[error("Data quality error: {0}")]
    DataQuality(String),

    /// File exists but could not be parsed as tabular data.
    #[error("Failed to parse '{}' as tabular data: {reason}", path.display())]
    DataParse { path: PathBuf, reason: String },

    /// Model fitting or scoring produced degenerate output.
    #[error("Numerical error in {model}: {reason}")]
    Numerical { model: String, reason: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parse error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Shorthand for [`PipelineError::Numerical`].
    pub fn numerical(model: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::Numerical {
            model: model.into(),
            reason: reason.into(),
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PipelineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable code for machine consumers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "CONFIG_ERROR",
            Self::ConfigValidation(_) => "INVALID_CONFIG",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::TargetNotFound { .. } => "TARGET_NOT_FOUND",
            Self::InvalidColumnType { .. } => "INVALID_COLUMN_TYPE",
            Self::DataQuality(_) => "DATA_QUALITY",
            Self::DataParse { .. } => "DATA_PARSE",
            Self::Numerical { .. } => "NUMERICAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Toml(_) => "TOML_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// True for missing/invalid configuration, including wrapped ones.
    pub fn is_config_error(&self) -> bool {
        match self {
            Self::Config { .. } | Self::ConfigValidation(_) | Self::Toml(_) => true,
            Self::WithContext { source, .. } => source.is_config_error(),
            _ => false,
        }
    }

    /// True for missing or mistyped columns.
    pub fn is_schema_error(&self) -> bool {
        match self {
            Self::ColumnNotFound(_)
            | Self::TargetNotFound { .. }
            | Self::InvalidColumnType { .. } => true,
            Self::WithContext { source, .. } => source.is_schema_error(),
            _ => false,
        }
    }

    /// True for unusable table content.
    pub fn is_data_quality_error(&self) -> bool {
        match self {
            Self::DataQuality(_) => true,
            Self::WithContext { source, .. } => source.is_data_quality_error(),
            _ => false,
        }
    }
}

impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PipelineError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

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
        self.map_err(|e| PipelineError::Polars(e).with_context(context))
    }
}
