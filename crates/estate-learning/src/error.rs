//! Error types for the estate-learning crate.
//!
//! This module defines [`LearningError`], the main error type used throughout
//! the crate. All public API functions return `Result<T, LearningError>`.
//!
//! Errors from the preparation steps are wrapped unchanged in
//! [`LearningError::Processing`], so their [`ErrorKind`] and error code
//! survive the trip through the training pipeline.
//!
//! # Example
//!
//! ```no_run
//! use estate_learning::{LearningError, TrainingConfig};
//!
//! fn configure() -> Result<TrainingConfig, LearningError> {
//!     // Errors are automatically propagated with ?
//!     let config = TrainingConfig::builder()
//!         .target_column("SalePrice")
//!         .build()?;
//!     Ok(config)
//! }
//! ```

use estate_processing::{ErrorKind, ProcessingError};
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for estate-learning operations.
///
/// This enum covers all error conditions that can occur during:
/// - Pipeline configuration and validation
/// - Data preparation (wrapped [`ProcessingError`])
/// - Model fitting and evaluation
/// - Model persistence
/// - Experiment tracking
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// Invalid configuration provided to the pipeline.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A column required for evaluation or prediction is missing.
    ///
    /// Column names are case-sensitive.
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    /// Invalid data provided for evaluation or prediction.
    ///
    /// Common causes:
    /// - The evaluation set is empty
    /// - The target column holds nulls or non-numeric values
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Fitting the model failed.
    ///
    /// Common causes:
    /// - The target column is absent, non-numeric or holds nulls
    /// - The training set is empty or has no usable feature columns
    /// - The least-squares solution is not finite
    #[error("Training failed: {0}")]
    TrainingFailed(String),

    /// The specified model file was not found.
    #[error("Model not found: {path}")]
    ModelNotFound {
        /// The path that was not found.
        path: String,
    },

    /// The experiment tracker failed to record a run.
    #[error("Tracking error: {0}")]
    Tracking(String),

    /// A data preparation step failed.
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// Polars error while assembling matrices or predictions.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// I/O error during model save/load or tracker writes.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LearningError {
    /// Shorthand for a training failure.
    pub fn training(message: impl Into<String>) -> Self {
        LearningError::TrainingFailed(message.into())
    }

    /// Shorthand for a tracking failure.
    pub fn tracking(message: impl Into<String>) -> Self {
        LearningError::Tracking(message.into())
    }

    /// Get error code for machine-readable output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::TrainingFailed(_) => "TRAINING_FAILED",
            Self::ModelNotFound { .. } => "MODEL_NOT_FOUND",
            Self::Tracking(_) => "TRACKING_ERROR",
            Self::Processing(e) => e.error_code(),
            Self::Polars(_) => "POLARS_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    /// The broad category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig(_) | Self::ColumnNotFound(_) | Self::InvalidData(_) => {
                ErrorKind::Config
            }
            Self::TrainingFailed(_) => ErrorKind::Training,
            Self::ModelNotFound { .. } | Self::Io(_) => ErrorKind::Io,
            Self::Tracking(_) => ErrorKind::Tracking,
            Self::Processing(e) => e.kind(),
            Self::Polars(_) | Self::Json(_) => ErrorKind::Internal,
        }
    }

    /// Check if this error is a configuration error.
    pub fn is_config_error(&self) -> bool {
        self.kind() == ErrorKind::Config
    }
}

/// Errors are serialized as a struct with `code`, `kind` and `message` fields.
impl Serialize for LearningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("LearningError", 3)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("kind", &self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for learning operations.
pub type Result<T> = std::result::Result<T, LearningError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(LearningError::training("singular").kind(), ErrorKind::Training);
        assert_eq!(LearningError::tracking("disk full").kind(), ErrorKind::Tracking);
        assert_eq!(
            LearningError::ColumnNotFound("SalePrice".into()).kind(),
            ErrorKind::Config
        );
        assert_eq!(
            LearningError::ModelNotFound {
                path: "model.json".into()
            }
            .kind(),
            ErrorKind::Io
        );
    }

    #[test]
    fn test_processing_errors_keep_their_kind() {
        let inner = ProcessingError::InsufficientRows {
            required: 2,
            actual: 1,
        };
        let err = LearningError::from(inner);
        assert!(err.is_config_error());
        assert_eq!(err.error_code(), "INSUFFICIENT_ROWS");
        assert_eq!(err.to_string(), "Dataset has 1 rows, at least 2 required");
    }

    #[test]
    fn test_error_serialization() {
        let json = serde_json::to_string(&LearningError::training("no features")).unwrap();
        assert!(json.contains("TRAINING_FAILED"));
        assert!(json.contains("\"training\""));
        assert!(json.contains("no features"));
    }
}
