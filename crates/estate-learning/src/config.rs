//! Configuration types for the training pipeline.
//!
//! This module provides [`TrainingConfig`] and its builder. The preparation
//! steps are configured through the embedded
//! [`estate_processing::PipelineConfig`].
//!
//! # Example
//!
//! ```
//! use estate_learning::TrainingConfig;
//! use estate_processing::PipelineConfig;
//!
//! let config = TrainingConfig::builder()
//!     .target_column("SalePrice")
//!     .experiment("ames-baseline")
//!     .processing(
//!         PipelineConfig::builder()
//!             .log_transform(["SalePrice", "Gr Liv Area"])
//!             .build()
//!             .expect("valid processing config"),
//!     )
//!     .build()
//!     .expect("valid config");
//! ```

use crate::error::LearningError;
use estate_processing::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default name of the column the model predicts.
pub const DEFAULT_TARGET_COLUMN: &str = "SalePrice";

/// Default experiment name handed to the tracker.
pub const DEFAULT_EXPERIMENT: &str = "house-prices";

/// Configuration for the training pipeline.
///
/// Use [`TrainingConfig::builder()`] to construct a configuration with the
/// builder pattern, or deserialize one from JSON with [`TrainingConfig::from_json_file`].
///
/// # Validation
///
/// The builder validates the following constraints on [`build()`](TrainingConfigBuilder::build):
/// - `target_column` must not be empty
/// - `experiment` must not be empty
/// - the processing configuration must itself be valid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Name of the target column (default: `SalePrice`).
    ///
    /// Every other column surviving preparation is treated as a feature.
    #[serde(default = "default_target_column")]
    pub target_column: String,

    /// Experiment name for the tracker (default: `house-prices`).
    #[serde(default = "default_experiment")]
    pub experiment: String,

    /// Configuration of the preparation steps.
    #[serde(default)]
    pub processing: PipelineConfig,
}

fn default_target_column() -> String {
    DEFAULT_TARGET_COLUMN.to_string()
}

fn default_experiment() -> String {
    DEFAULT_EXPERIMENT.to_string()
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            target_column: default_target_column(),
            experiment: default_experiment(),
            processing: PipelineConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Create a new builder for `TrainingConfig`.
    #[must_use]
    pub fn builder() -> TrainingConfigBuilder {
        TrainingConfigBuilder::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), LearningError> {
        if self.target_column.trim().is_empty() {
            return Err(LearningError::InvalidConfig(
                "target_column must not be empty".to_string(),
            ));
        }
        if self.experiment.trim().is_empty() {
            return Err(LearningError::InvalidConfig(
                "experiment must not be empty".to_string(),
            ));
        }
        self.processing
            .validate()
            .map_err(|e| LearningError::InvalidConfig(e.to_string()))
    }

    /// Load and validate a configuration from a JSON file.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LearningError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LearningError::InvalidConfig(format!(
                "Cannot read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: TrainingConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }
}

/// Builder for [`TrainingConfig`].
///
/// Created via [`TrainingConfig::builder()`]. Unset fields keep their defaults.
#[derive(Debug, Default)]
pub struct TrainingConfigBuilder {
    target_column: Option<String>,
    experiment: Option<String>,
    processing: Option<PipelineConfig>,
}

impl TrainingConfigBuilder {
    /// Set the target column name.
    #[must_use]
    pub fn target_column(mut self, name: impl Into<String>) -> Self {
        self.target_column = Some(name.into());
        self
    }

    /// Set the experiment name.
    #[must_use]
    pub fn experiment(mut self, name: impl Into<String>) -> Self {
        self.experiment = Some(name.into());
        self
    }

    /// Set the preparation configuration.
    #[must_use]
    pub fn processing(mut self, config: PipelineConfig) -> Self {
        self.processing = Some(config);
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if validation fails.
    pub fn build(self) -> Result<TrainingConfig, LearningError> {
        let config = TrainingConfig {
            target_column: self.target_column.unwrap_or_else(default_target_column),
            experiment: self.experiment.unwrap_or_else(default_experiment),
            processing: self.processing.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}
