//! Common types used throughout the estate-learning crate.
//!
//! This module defines result types, metrics, and other data structures
//! returned by the training pipeline and model.
//!
//! # Overview
//!
//! - [`TrainingResult`]: Complete result from [`Pipeline::train()`](crate::Pipeline::train)
//! - [`EvaluationReport`]: Regression metrics on the held-out set
//! - [`ModelInfo`]: Metadata about a fitted model
//! - [`Params`] / [`Metrics`]: key/value maps handed to an experiment tracker
//!
//! # Example
//!
//! ```ignore
//! let result = pipeline.train_file("data/ames.csv")?;
//!
//! println!("R²: {:.3}", result.report.r2);
//! for (name, value) in result.report.metrics() {
//!     println!("{name} = {value}");
//! }
//! ```

use crate::model::FittedModel;
use estate_processing::ProcessingSummary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters logged to a tracker, keyed by name.
pub type Params = BTreeMap<String, serde_json::Value>;

/// Metrics logged to a tracker, keyed by name.
pub type Metrics = BTreeMap<String, f64>;

/// Metrics from evaluating a model on a held-out set.
///
/// All errors are measured in the units of the target column as it
/// reaches the model, so a log-transformed target yields log-space errors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Mean Squared Error. Lower is better.
    pub mse: f64,

    /// Root Mean Squared Error, in the same units as the target.
    pub rmse: f64,

    /// Mean Absolute Error.
    pub mae: f64,

    /// R-squared (coefficient of determination).
    ///
    /// 1.0 is a perfect fit; negative values are worse than predicting the mean.
    pub r2: f64,

    /// Number of rows the metrics were computed on.
    pub n_samples: usize,
}

impl EvaluationReport {
    /// The metrics as a key/value map for an experiment tracker.
    pub fn metrics(&self) -> Metrics {
        Metrics::from([
            ("mse".to_string(), self.mse),
            ("rmse".to_string(), self.rmse),
            ("mae".to_string(), self.mae),
            ("r2".to_string(), self.r2),
            ("n_samples".to_string(), self.n_samples as f64),
        ])
    }
}

/// Information about a fitted model.
///
/// Returned by [`FittedModel::info()`](crate::FittedModel::info).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Name of the target column used during training.
    pub target_column: String,

    /// Names of the encoded features, in coefficient order.
    pub feature_names: Vec<String>,

    /// Source columns the encoded features were built from.
    pub source_columns: Vec<String>,

    /// Columns present at training time that the model ignores.
    pub ignored_columns: Vec<String>,

    /// Number of rows the model was fitted on.
    pub n_train_samples: usize,

    /// Fitted intercept.
    pub intercept: f64,
}

/// Result of a training pipeline run.
///
/// Returned by [`Pipeline::train()`](crate::Pipeline::train) and
/// [`Pipeline::train_file()`](crate::Pipeline::train_file).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingResult {
    /// The fitted model.
    pub model: FittedModel,

    /// Metrics on the test set.
    pub report: EvaluationReport,

    /// What the preparation steps did to the dataset.
    pub summary: ProcessingSummary,

    /// Run identifier assigned by the tracker, if one was configured.
    pub run_id: Option<String>,

    /// Wall-clock time of the whole run in milliseconds.
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_metrics_map() {
        let report = EvaluationReport {
            mse: 4.0,
            rmse: 2.0,
            mae: 1.5,
            r2: 0.75,
            n_samples: 10,
        };
        let metrics = report.metrics();
        assert_eq!(metrics.len(), 5);
        assert_eq!(metrics["rmse"], 2.0);
        assert_eq!(metrics["n_samples"], 10.0);
        let keys: Vec<&str> = metrics.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["mae", "mse", "n_samples", "r2", "rmse"]);
    }
}
