//! Custom error types for the data preparation pipeline.
//!
//! This module provides the error hierarchy using `thiserror`. Every error
//! maps onto an [`ErrorKind`] so callers can tell configuration mistakes
//! apart from training or I/O failures without matching on every variant.
//!
//! Errors are serializable so they can be emitted as JSON by the CLI.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// Broad classification of pipeline failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid or missing column references, out-of-range parameters.
    Config,
    /// Fitting failed (empty training set, unusable target, degenerate matrix).
    Training,
    /// Reading or writing files failed.
    Io,
    /// The experiment tracker rejected a record.
    Tracking,
    /// Anything that does not fit the categories above.
    Internal,
}

/// The main error type for the data preparation steps.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A numeric operation was configured for a non-numeric column.
    #[error("Column '{column}' is not numeric (dtype {dtype})")]
    NonNumericColumn { column: String, dtype: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A fill strategy was configured for a column with no usable values.
    #[error("No valid values found in column '{0}'")]
    NoValidValues(String),

    /// The dataset is too small for the requested operation.
    #[error("Dataset has {actual} rows, at least {required} required")]
    InsufficientRows { required: usize, actual: usize },

    /// The input file format is not supported.
    #[error("Unsupported dataset format: {0}")]
    UnsupportedFormat(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProcessingError>,
    },
}

impl ProcessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ProcessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for a non-numeric column error.
    pub fn non_numeric(column: impl Into<String>, dtype: impl ToString) -> Self {
        ProcessingError::NonNumericColumn {
            column: column.into(),
            dtype: dtype.to_string(),
        }
    }

    /// Get error code for machine-readable output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::NonNumericColumn { .. } => "NON_NUMERIC_COLUMN",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::NoValidValues(_) => "NO_VALID_VALUES",
            Self::InsufficientRows { .. } => "INSUFFICIENT_ROWS",
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// The broad category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ColumnNotFound(_)
            | Self::NonNumericColumn { .. }
            | Self::InvalidConfig(_)
            | Self::NoValidValues(_)
            | Self::InsufficientRows { .. }
            | Self::UnsupportedFormat(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
            Self::Polars(_) | Self::Json(_) => ErrorKind::Internal,
            Self::WithContext { source, .. } => source.kind(),
        }
    }

    /// Check if this error is a configuration error.
    pub fn is_config_error(&self) -> bool {
        self.kind() == ErrorKind::Config
    }
}

/// Errors are serialized as a struct with `code`, `kind` and `message` fields.
impl Serialize for ProcessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ProcessingError", 3)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("kind", &self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for processing operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;

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
        self.map_err(|e| ProcessingError::Polars(e).with_context(context))
    }
}
