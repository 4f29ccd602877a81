//! Configuration types for the data preparation pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup. Every type derives
//! `Serialize`/`Deserialize` so a whole configuration can be supplied as a
//! JSON document.

use crate::error::ProcessingError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default z-score cutoff used by the outlier detector.
pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;

/// Default IQR multiplier used by the outlier detector.
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;

/// Default fraction of rows assigned to the training set.
pub const DEFAULT_TRAIN_RATIO: f64 = 0.8;

/// Default seed for the row shuffle.
pub const DEFAULT_SEED: u64 = 42;

/// How missing values in a single column are handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingStrategy {
    /// Use the mean of non-null values (numeric columns only)
    Mean,
    /// Use the median of non-null values (numeric columns only)
    Median,
    /// Use the most frequent value
    Mode,
    /// Use a fixed value, parsed as a number for numeric columns
    Constant(String),
    /// Drop rows where this column is missing
    DropRows,
    /// Drop the whole column
    DropColumn,
    /// Leave missing values in place
    Keep,
}

impl MissingStrategy {
    /// Whether this strategy computes a statistic that only exists for numbers.
    pub fn requires_numeric(&self) -> bool {
        matches!(self, Self::Mean | Self::Median)
    }
}

/// Column strategy configuration for the missing value handler.
///
/// Columns listed in `columns` use their explicit strategy; every other
/// column falls back to the default for its kind: numeric columns use
/// `numeric_default` (Mean), categorical columns use `categorical_default`
/// (Mode), and any other column is kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingValueConfig {
    /// Explicit per-column strategies.
    #[serde(default)]
    pub columns: BTreeMap<String, MissingStrategy>,

    /// Strategy for numeric columns not listed in `columns`.
    /// Default: Mean
    #[serde(default = "default_numeric_strategy")]
    pub numeric_default: MissingStrategy,

    /// Strategy for categorical columns not listed in `columns`.
    /// Default: Mode
    #[serde(default = "default_categorical_strategy")]
    pub categorical_default: MissingStrategy,
}

fn default_numeric_strategy() -> MissingStrategy {
    MissingStrategy::Mean
}

fn default_categorical_strategy() -> MissingStrategy {
    MissingStrategy::Mode
}

impl Default for MissingValueConfig {
    fn default() -> Self {
        Self {
            columns: BTreeMap::new(),
            numeric_default: default_numeric_strategy(),
            categorical_default: default_categorical_strategy(),
        }
    }
}

impl MissingValueConfig {
    /// Set an explicit strategy for one column.
    pub fn with_column(mut self, column: impl Into<String>, strategy: MissingStrategy) -> Self {
        self.columns.insert(column.into(), strategy);
        self
    }

    /// Validate strategy combinations that are wrong regardless of the data.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.categorical_default.requires_numeric() {
            return Err(ConfigValidationError::InvalidStrategy {
                target: "categorical_default".to_string(),
                strategy: format!("{:?}", self.categorical_default),
            });
        }
        Ok(())
    }
}

/// Method used to flag outlier rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OutlierMethod {
    /// Drop rows whose absolute z-score exceeds `threshold`.
    ZScore { threshold: f64 },
    /// Drop rows outside `[Q1 - multiplier * IQR, Q3 + multiplier * IQR]`.
    Iqr { multiplier: f64 },
}

impl Default for OutlierMethod {
    fn default() -> Self {
        OutlierMethod::ZScore {
            threshold: DEFAULT_Z_THRESHOLD,
        }
    }
}

/// Outlier policy: a detection method plus the columns it applies to.
///
/// An empty column list means every numeric column present before feature
/// engineering; indicator columns added by one-hot encoding are not scored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlierPolicy {
    #[serde(default)]
    pub method: OutlierMethod,
    #[serde(default)]
    pub columns: Vec<String>,
}

impl OutlierPolicy {
    /// Z-score policy over the given columns.
    pub fn z_score(threshold: f64, columns: Vec<String>) -> Self {
        Self {
            method: OutlierMethod::ZScore { threshold },
            columns,
        }
    }

    /// IQR policy over the given columns.
    pub fn iqr(multiplier: f64, columns: Vec<String>) -> Self {
        Self {
            method: OutlierMethod::Iqr { multiplier },
            columns,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        match self.method {
            OutlierMethod::ZScore { threshold } if !(threshold.is_finite() && threshold > 0.0) => {
                Err(ConfigValidationError::InvalidPositive {
                    field: "z_threshold".to_string(),
                    value: threshold,
                })
            }
            OutlierMethod::Iqr { multiplier } if !(multiplier.is_finite() && multiplier > 0.0) => {
                Err(ConfigValidationError::InvalidPositive {
                    field: "iqr_multiplier".to_string(),
                    value: multiplier,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Train/test split parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of rows assigned to the training set, in (0, 1).
    /// Default: 0.8
    pub train_ratio: f64,
    /// Seed for the row shuffle.
    /// Default: 42
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_ratio: DEFAULT_TRAIN_RATIO,
            seed: DEFAULT_SEED,
        }
    }
}

impl SplitConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
            return Err(ConfigValidationError::InvalidRatio(self.train_ratio));
        }
        Ok(())
    }
}

/// A feature transformation applied after missing value handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureStrategy {
    /// Replace values with `ln(1 + x)`.
    Log { columns: Vec<String> },
    /// Standardize to mean 0 and standard deviation 1.
    StandardScale { columns: Vec<String> },
    /// Rescale linearly into `[min, max]`.
    MinMaxScale {
        columns: Vec<String>,
        min: f64,
        max: f64,
    },
    /// Replace categorical columns with drop-first indicator columns.
    OneHot { columns: Vec<String> },
}

impl FeatureStrategy {
    /// Columns this strategy touches.
    pub fn columns(&self) -> &[String] {
        match self {
            Self::Log { columns }
            | Self::StandardScale { columns }
            | Self::MinMaxScale { columns, .. }
            | Self::OneHot { columns } => columns,
        }
    }

    /// Short name used in logs and step records.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Log { .. } => "log",
            Self::StandardScale { .. } => "standard_scale",
            Self::MinMaxScale { .. } => "min_max_scale",
            Self::OneHot { .. } => "one_hot",
        }
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if let Self::MinMaxScale { min, max, .. } = self
            && !(min.is_finite() && max.is_finite() && min < max)
        {
            return Err(ConfigValidationError::InvalidRange {
                min: *min,
                max: *max,
            });
        }
        Ok(())
    }
}

/// Configuration for the data preparation pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use estate_processing::config::{PipelineConfig, OutlierPolicy};
///
/// let config = PipelineConfig::builder()
///     .log_transform(["SalePrice", "Gr Liv Area"])
///     .outliers(OutlierPolicy::z_score(3.0, vec!["SalePrice".into()]))
///     .train_ratio(0.8)
///     .seed(42)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Missing value strategies.
    #[serde(default)]
    pub missing_values: MissingValueConfig,

    /// Columns replaced by their log1p transform.
    /// Default: none
    #[serde(default)]
    pub log_transform_columns: Vec<String>,

    /// Additional feature strategies, applied in order after the log transform.
    /// Default: none
    #[serde(default)]
    pub feature_steps: Vec<FeatureStrategy>,

    /// Outlier removal policy. `None` skips the step.
    /// Default: z-score 3.0 over all numeric columns
    #[serde(default = "default_outliers")]
    pub outliers: Option<OutlierPolicy>,

    /// Train/test split parameters.
    #[serde(default)]
    pub split: SplitConfig,
}

fn default_outliers() -> Option<OutlierPolicy> {
    Some(OutlierPolicy::default())
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            missing_values: MissingValueConfig::default(),
            log_transform_columns: Vec::new(),
            feature_steps: Vec::new(),
            outliers: default_outliers(),
            split: SplitConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    ///
    /// Only data-independent checks happen here; column existence and
    /// dtypes are checked by each step against the actual dataset.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.missing_values.validate()?;
        for step in &self.feature_steps {
            step.validate()?;
        }
        if let Some(policy) = &self.outliers {
            policy.validate()?;
        }
        self.split.validate()
    }

    /// Feature strategies in application order, log transform first.
    pub fn feature_strategies(&self) -> Vec<FeatureStrategy> {
        let mut strategies = Vec::with_capacity(self.feature_steps.len() + 1);
        if !self.log_transform_columns.is_empty() {
            strategies.push(FeatureStrategy::Log {
                columns: self.log_transform_columns.clone(),
            });
        }
        strategies.extend(self.feature_steps.iter().cloned());
        strategies
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid train ratio: {0} (must be strictly between 0.0 and 1.0)")]
    InvalidRatio(f64),

    #[error("Invalid value for '{field}': {value} (must be a positive number)")]
    InvalidPositive { field: String, value: f64 },

    #[error("Invalid scaling range [{min}, {max}] (min must be below max)")]
    InvalidRange { min: f64, max: f64 },

    #[error("Strategy {strategy} cannot be used for {target}")]
    InvalidStrategy { target: String, strategy: String },
}

impl From<ConfigValidationError> for ProcessingError {
    fn from(err: ConfigValidationError) -> Self {
        ProcessingError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    missing_values: Option<MissingValueConfig>,
    log_transform_columns: Vec<String>,
    feature_steps: Vec<FeatureStrategy>,
    outliers: Option<Option<OutlierPolicy>>,
    train_ratio: Option<f64>,
    seed: Option<u64>,
}

impl PipelineConfigBuilder {
    /// Set the missing value configuration.
    pub fn missing_values(mut self, config: MissingValueConfig) -> Self {
        self.missing_values = Some(config);
        self
    }

    /// Set the columns to log-transform.
    pub fn log_transform<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.log_transform_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Append a feature strategy.
    pub fn feature_step(mut self, step: FeatureStrategy) -> Self {
        self.feature_steps.push(step);
        self
    }

    /// Set the outlier policy.
    pub fn outliers(mut self, policy: OutlierPolicy) -> Self {
        self.outliers = Some(Some(policy));
        self
    }

    /// Skip outlier removal entirely.
    pub fn without_outlier_removal(mut self) -> Self {
        self.outliers = Some(None);
        self
    }

    /// Set the z-score threshold, keeping any configured columns.
    pub fn z_threshold(mut self, threshold: f64) -> Self {
        let columns = match &self.outliers {
            Some(Some(policy)) => policy.columns.clone(),
            _ => Vec::new(),
        };
        self.outliers = Some(Some(OutlierPolicy::z_score(threshold, columns)));
        self
    }

    /// Set the training fraction.
    pub fn train_ratio(mut self, ratio: f64) -> Self {
        self.train_ratio = Some(ratio);
        self
    }

    /// Set the shuffle seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let config = PipelineConfig {
            missing_values: self.missing_values.unwrap_or_default(),
            log_transform_columns: self.log_transform_columns,
            feature_steps: self.feature_steps,
            outliers: self.outliers.unwrap_or_else(default_outliers),
            split: SplitConfig {
                train_ratio: self.train_ratio.unwrap_or(DEFAULT_TRAIN_RATIO),
                seed: self.seed.unwrap_or(DEFAULT_SEED),
            },
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.split.train_ratio, 0.8);
        assert_eq!(config.split.seed, 42);
        assert_eq!(config.missing_values.numeric_default, MissingStrategy::Mean);
        assert_eq!(config.missing_values.categorical_default, MissingStrategy::Mode);
        assert_eq!(
            config.outliers.as_ref().map(|p| p.method),
            Some(OutlierMethod::ZScore { threshold: 3.0 })
        );
    }

    #[test]
    fn test_builder_custom_values() {
        let config = PipelineConfig::builder()
            .log_transform(["SalePrice", "Gr Liv Area"])
            .z_threshold(2.5)
            .train_ratio(0.7)
            .seed(7)
            .build()
            .unwrap();

        assert_eq!(config.log_transform_columns, vec!["SalePrice", "Gr Liv Area"]);
        assert_eq!(config.split.train_ratio, 0.7);
        assert_eq!(config.split.seed, 7);
        assert_eq!(
            config.outliers.unwrap().method,
            OutlierMethod::ZScore { threshold: 2.5 }
        );
    }

    #[test]
    fn test_validation_invalid_ratio() {
        for ratio in [0.0, 1.0, -0.2, 1.5, f64::NAN] {
            let result = PipelineConfig::builder().train_ratio(ratio).build();
            assert!(matches!(
                result,
                Err(ConfigValidationError::InvalidRatio(_))
            ));
        }
    }

    #[test]
    fn test_validation_invalid_threshold() {
        let result = PipelineConfig::builder().z_threshold(0.0).build();
        assert!(matches!(
            result,
            Err(ConfigValidationError::InvalidPositive { .. })
        ));

        let result = PipelineConfig::builder()
            .outliers(OutlierPolicy::iqr(-1.0, vec![]))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_categorical_mean_rejected() {
        let missing = MissingValueConfig {
            categorical_default: MissingStrategy::Median,
            ..MissingValueConfig::default()
        };
        let result = PipelineConfig::builder().missing_values(missing).build();
        assert!(matches!(
            result,
            Err(ConfigValidationError::InvalidStrategy { .. })
        ));
    }

    #[test]
    fn test_validation_min_max_range() {
        let result = PipelineConfig::builder()
            .feature_step(FeatureStrategy::MinMaxScale {
                columns: vec!["a".into()],
                min: 1.0,
                max: 1.0,
            })
            .build();
        assert!(matches!(
            result,
            Err(ConfigValidationError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_feature_strategies_order() {
        let config = PipelineConfig::builder()
            .log_transform(["SalePrice"])
            .feature_step(FeatureStrategy::OneHot {
                columns: vec!["Neighborhood".into()],
            })
            .build()
            .unwrap();

        let names: Vec<_> = config.feature_strategies().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["log", "one_hot"]);
    }

    #[test]
    fn test_pipeline_config_from_json() {
        let json = r#"{
            "missing_values": {
                "columns": {
                    "Lot Frontage": "Median",
                    "Alley": { "Constant": "None" },
                    "Pool QC": "DropColumn"
                }
            },
            "log_transform_columns": ["SalePrice"],
            "outliers": { "method": { "ZScore": { "threshold": 3.5 } }, "columns": ["SalePrice"] },
            "split": { "train_ratio": 0.75, "seed": 1 }
        }"#;

        let config: PipelineConfig =
            serde_json::from_str(json).expect("Should deserialize from JSON");

        assert_eq!(
            config.missing_values.columns.get("Lot Frontage"),
            Some(&MissingStrategy::Median)
        );
        assert_eq!(
            config.missing_values.columns.get("Alley"),
            Some(&MissingStrategy::Constant("None".to_string()))
        );
        assert_eq!(config.missing_values.numeric_default, MissingStrategy::Mean);
        assert_eq!(
            config.outliers.as_ref().unwrap().method,
            OutlierMethod::ZScore { threshold: 3.5 }
        );
        assert_eq!(config.split.seed, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = PipelineConfig::builder()
            .missing_values(
                MissingValueConfig::default().with_column("Garage Yr Blt", MissingStrategy::Median),
            )
            .build()
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
