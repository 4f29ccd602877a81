//! Preparation executor module.
//!
//! Holds one configured component per step and runs each step, recording
//! the table shape before and after it.

use crate::cleaner::MissingValueHandler;
use crate::config::PipelineConfig;
use crate::error::{Result, ResultExt};
use crate::features::FeatureEngineer;
use crate::pipeline::outliers::OutlierDetector;
use crate::pipeline::split::DataSplitter;
use crate::types::{SplitResult, StepKind, StepRecord};
use crate::utils::column_names;
use polars::prelude::*;
use tracing::{debug, info};

/// Executes the preparation steps on a DataFrame.
#[derive(Debug, Clone)]
pub struct PreparationExecutor {
    missing: MissingValueHandler,
    features: FeatureEngineer,
    outliers: Option<OutlierDetector>,
    splitter: DataSplitter,
}

impl PreparationExecutor {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            missing: MissingValueHandler::new(config.missing_values.clone()),
            features: FeatureEngineer::new(config.feature_strategies()),
            outliers: config.outliers.clone().map(OutlierDetector::new),
            splitter: DataSplitter::new(config.split),
        }
    }

    /// Fill or drop missing values.
    pub fn handle_missing_values(&self, df: &DataFrame) -> Result<(DataFrame, StepRecord)> {
        info!("Step 1: Handling missing values...");
        let (out, actions) = self
            .missing
            .apply(df)
            .context("Missing value handling failed")?;

        for action in &actions {
            debug!("{}", action);
        }
        let description = if actions.is_empty() {
            "No missing values to handle".to_string()
        } else {
            actions.join("; ")
        };
        let record = StepRecord::new(StepKind::MissingValuesHandled, description, df, &out);
        Ok((out, record))
    }

    /// Apply the configured feature strategies.
    pub fn engineer_features(&self, df: &DataFrame) -> Result<(DataFrame, StepRecord)> {
        info!("Step 2: Engineering features...");
        let out = self.features.apply(df)?;

        let columns: Vec<String> = self
            .features
            .strategies()
            .iter()
            .flat_map(|s| s.columns().iter().cloned())
            .collect();
        let names: Vec<&str> = self.features.strategies().iter().map(|s| s.name()).collect();
        let description = if names.is_empty() {
            "No feature strategies configured".to_string()
        } else {
            format!("Applied {}", names.join(", "))
        };
        let record = StepRecord::new(StepKind::FeatureTransformed, description, df, &out)
            .with_columns(columns);
        Ok((out, record))
    }

    /// Remove outlier rows, if a policy is configured.
    ///
    /// `source_columns` are the columns that existed before feature
    /// engineering. Columns added since then are not part of the default
    /// column set.
    pub fn remove_outliers(
        &self,
        df: &DataFrame,
        source_columns: &[String],
    ) -> Result<(DataFrame, StepRecord)> {
        info!("Step 3: Removing outliers...");
        let Some(detector) = &self.outliers else {
            let record =
                StepRecord::new(StepKind::OutliersRemoved, "Outlier removal disabled", df, df);
            return Ok((df.clone(), record));
        };

        let added: Vec<String> = column_names(df)
            .into_iter()
            .filter(|name| !source_columns.contains(name))
            .collect();
        if !added.is_empty() {
            debug!("Not scoring engineered columns: {:?}", added);
        }
        let detector = detector.clone().excluding(added);

        let columns = detector.resolve_columns(df)?;
        let (out, removed) = detector.remove(df).context("Outlier removal failed")?;
        let record = StepRecord::new(
            StepKind::OutliersRemoved,
            format!("Removed {} rows ({:?})", removed, detector.policy().method),
            df,
            &out,
        )
        .with_columns(columns);
        Ok((out, record))
    }

    /// Split into train and test.
    pub fn split(&self, df: &DataFrame) -> Result<(SplitResult, StepRecord)> {
        info!("Step 4: Splitting dataset...");
        let split = self.splitter.split(df)?;
        let record = StepRecord::new(
            StepKind::Split,
            format!(
                "{} train rows, {} test rows",
                split.train.height(),
                split.test.height()
            ),
            df,
            df,
        );
        Ok((split, record))
    }
}
