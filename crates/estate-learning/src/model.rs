//! Model building, prediction and persistence.
//!
//! [`ModelBuilder`] fits a [`FeaturePreprocessor`] and a least-squares
//! linear regression on a training table. The resulting [`FittedModel`] is
//! read-only: it predicts, exposes its parameters for tracking, and can be
//! saved to and loaded from JSON.
//!
//! # Example
//!
//! ```rust,ignore
//! use estate_learning::{FittedModel, ModelBuilder};
//!
//! let model = ModelBuilder::new("SalePrice").fit(&train)?;
//! let predictions = model.predict(&test)?;
//!
//! model.save("model.json")?;
//! let restored = FittedModel::load("model.json")?;
//! ```

use crate::error::{LearningError, Result};
use crate::preprocess::FeaturePreprocessor;
use crate::regression::{LinearFit, fit_least_squares};
use crate::types::{ModelInfo, Params};
use chrono::{DateTime, Utc};
use estate_processing::is_numeric_dtype;
use estate_processing::utils::numeric_values;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// Fits a preprocessing + linear regression model on a training table.
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    target_column: String,
}

impl ModelBuilder {
    pub fn new(target_column: impl Into<String>) -> Self {
        Self {
            target_column: target_column.into(),
        }
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Fit on `train`, using every non-target column as a feature.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::TrainingFailed`] if the target column is
    /// absent, non-numeric or contains nulls, the training set is empty,
    /// there are no usable feature columns, or the solution is not finite.
    pub fn fit(&self, train: &DataFrame) -> Result<FittedModel> {
        let target = &self.target_column;
        if train.height() == 0 {
            return Err(LearningError::training("Training set is empty"));
        }
        let y = target_values(train, target).map_err(|e| match e {
            LearningError::ColumnNotFound(_) | LearningError::InvalidData(_) => {
                LearningError::training(e.to_string())
            }
            other => other,
        })?;

        let preprocessor = FeaturePreprocessor::fit(train, target)?;
        let x = preprocessor.transform(train)?;
        let LinearFit {
            intercept,
            coefficients,
        } = fit_least_squares(&x, &y)?;

        info!(
            "Fitted linear model on {} rows x {} features (intercept {:.4})",
            train.height(),
            coefficients.len(),
            intercept
        );

        Ok(FittedModel {
            target_column: target.clone(),
            preprocessor,
            intercept,
            coefficients,
            n_train_samples: train.height(),
            trained_at: Utc::now(),
        })
    }
}

/// Target values of `df` as `f64`.
///
/// Fails with a config error if the column is absent, and with an invalid
/// data error if it is non-numeric or holds nulls.
pub(crate) fn target_values(df: &DataFrame, target: &str) -> Result<Vec<f64>> {
    let column = df
        .column(target)
        .map_err(|_| LearningError::ColumnNotFound(target.to_string()))?;
    if !is_numeric_dtype(column.dtype()) {
        return Err(LearningError::InvalidData(format!(
            "Target column '{}' is not numeric (dtype {})",
            target,
            column.dtype()
        )));
    }
    numeric_values(column.as_materialized_series())?
        .into_iter()
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| {
            LearningError::InvalidData(format!("Target column '{}' contains nulls", target))
        })
}

/// A fitted preprocessing + linear regression model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    target_column: String,
    preprocessor: FeaturePreprocessor,
    intercept: f64,
    coefficients: Vec<f64>,
    n_train_samples: usize,
    trained_at: DateTime<Utc>,
}

// Ensure FittedModel can be shared across threads
static_assertions::assert_impl_all!(FittedModel: Send, Sync);

impl FittedModel {
    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn preprocessor(&self) -> &FeaturePreprocessor {
        &self.preprocessor
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// Predict one value per row of `df`.
    ///
    /// The target column, if present, is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::ColumnNotFound`] if a feature column is missing.
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<f64>> {
        let x = self.preprocessor.transform(df)?;
        let fit = LinearFit {
            intercept: self.intercept,
            coefficients: self.coefficients.clone(),
        };
        Ok(fit.predict(&x))
    }

    /// Coefficient per encoded feature name, in feature order.
    pub fn coefficient_map(&self) -> Vec<(String, f64)> {
        self.preprocessor
            .feature_names()
            .into_iter()
            .zip(self.coefficients.iter().copied())
            .collect()
    }

    /// Parameters as a key/value map for an experiment tracker.
    ///
    /// Keys: `target_column`, `intercept`, `n_features`, `n_train_samples`
    /// and one `coef.<feature>` entry per encoded feature.
    pub fn params(&self) -> Params {
        let mut params = Params::new();
        params.insert("target_column".into(), self.target_column.clone().into());
        params.insert("intercept".into(), self.intercept.into());
        params.insert("n_features".into(), self.coefficients.len().into());
        params.insert("n_train_samples".into(), self.n_train_samples.into());
        for (name, coef) in self.coefficient_map() {
            params.insert(format!("coef.{}", name), coef.into());
        }
        params
    }

    /// Metadata about the model.
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            target_column: self.target_column.clone(),
            feature_names: self.preprocessor.feature_names(),
            source_columns: self.preprocessor.source_columns(),
            ignored_columns: self.preprocessor.ignored_columns().to_vec(),
            n_train_samples: self.n_train_samples,
            intercept: self.intercept,
        }
    }

    /// Save the model as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        info!("Saved model to {}", path.display());
        Ok(())
    }

    /// Load a model saved with [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::ModelNotFound`] if the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LearningError::ModelNotFound {
                path: path.display().to_string(),
            });
        }
        let reader = BufReader::new(File::open(path)?);
        let model: FittedModel = serde_json::from_reader(reader)?;
        if model.coefficients.len() != model.preprocessor.n_features() {
            return Err(LearningError::InvalidData(format!(
                "Model file '{}' has {} coefficients for {} features",
                path.display(),
                model.coefficients.len(),
                model.preprocessor.n_features()
            )));
        }
        Ok(model)
    }
}
