//! Training pipeline implementation.
//!
//! This module provides the [`Pipeline`] struct and its builder for running
//! the complete chain: the preparation steps from `estate-processing`,
//! followed by model building, evaluation and experiment tracking.
//!
//! # Overview
//!
//! The training pipeline executes these stages in order:
//!
//! 1. **Preparation** - Ingest, missing values, features, outliers, split
//! 2. **Training** - Fit the preprocessing + linear regression model on train
//! 3. **Evaluation** - Compute MSE, RMSE, MAE and R² on test
//! 4. **Tracking** - Hand parameters and metrics to the tracker (optional)
//!
//! The first failing stage halts the run. The tracker is only called after
//! evaluation succeeded, so a run that fails earlier records nothing. If
//! logging fails once a tracked run has started, that run is ended before
//! the error is returned.
//!
//! # Example
//!
//! ```rust,ignore
//! use estate_learning::{JsonFileTracker, Pipeline, TrainingConfig};
//! use std::sync::Arc;
//!
//! let result = Pipeline::builder()
//!     .config(TrainingConfig::builder().target_column("SalePrice").build()?)
//!     .tracker(Arc::new(JsonFileTracker::new("mlruns")?))
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .train_file("data/ames.csv")?;
//!
//! println!("R²: {:.3} (run {:?})", result.report.r2, result.run_id);
//! ```

use crate::config::TrainingConfig;
use crate::error::Result;
use crate::evaluate::Evaluator;
use crate::model::{FittedModel, ModelBuilder};
use crate::tracking::ExperimentTracker;
use crate::types::{EvaluationReport, Params, TrainingResult};
use estate_processing::{
    ClosureProgressReporter, OutlierMethod, PipelineStage, PreparedData, ProgressReporter,
    ProgressUpdate,
};
use polars::prelude::DataFrame;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// The house-price training pipeline.
///
/// Use [`Pipeline::builder()`] to construct a pipeline with the builder pattern.
pub struct Pipeline {
    config: TrainingConfig,
    preparation: estate_processing::Pipeline,
    model_builder: ModelBuilder,
    tracker: Option<Arc<dyn ExperimentTracker>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// Ensure Pipeline is Send (can be moved to another thread)
static_assertions::assert_impl_all!(Pipeline: Send);

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("tracker", &self.tracker.as_ref().map(|_| "<tracker>"))
            .field(
                "progress_reporter",
                &self.progress_reporter.as_ref().map(|_| "<reporter>"),
            )
            .finish()
    }
}

impl Pipeline {
    /// Create a new builder for `Pipeline`.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Load a dataset and run the complete chain on it.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing stage.
    pub fn train_file(&self, path: impl AsRef<Path>) -> Result<TrainingResult> {
        let start_time = Instant::now();
        let result = self
            .preparation
            .load(path)
            .map_err(Into::into)
            .and_then(|df| self.run(&df, start_time));
        self.finish(result)
    }

    /// Run the complete chain on an in-memory dataset.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing stage.
    pub fn train(&self, df: &DataFrame) -> Result<TrainingResult> {
        let result = self.run(df, Instant::now());
        self.finish(result)
    }

    fn finish(&self, result: Result<TrainingResult>) -> Result<TrainingResult> {
        match result {
            Ok(training) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Training completed: R² {:.4}",
                    training.report.r2
                )));
                Ok(training)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Training pipeline error: {}", e);
                Err(e)
            }
        }
    }

    fn run(&self, df: &DataFrame, start_time: Instant) -> Result<TrainingResult> {
        info!("Starting training pipeline...");
        let PreparedData { split, summary } = self.preparation.prepare(df)?;

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Training,
            0.0,
            format!("Fitting on {} rows...", split.train.height()),
        ));
        let model = self.model_builder.fit(&split.train)?;
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Training,
            1.0,
            format!("Fitted {} coefficients", model.coefficients().len()),
        ));

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Evaluating,
            0.0,
            format!("Scoring {} rows...", split.test.height()),
        ));
        let report = Evaluator::evaluate(&model, &split.test)?;
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Evaluating,
            1.0,
            format!("MSE {:.6}, R² {:.4}", report.mse, report.r2),
        ));

        let run_id = self.track(&model, &report)?;

        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!("Training pipeline finished in {}ms", duration_ms);
        Ok(TrainingResult {
            model,
            report,
            summary,
            run_id,
            duration_ms,
        })
    }

    /// Log the run to the tracker, if one is configured.
    fn track(&self, model: &FittedModel, report: &EvaluationReport) -> Result<Option<String>> {
        let Some(tracker) = &self.tracker else {
            return Ok(None);
        };
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Tracking,
            0.0,
            format!("Logging run to experiment '{}'...", self.config.experiment),
        ));

        let run_id = tracker.start_run(&self.config.experiment)?;
        let mut params = self.config_params();
        params.extend(model.params());
        let logged = tracker
            .log_params(&run_id, &params)
            .and_then(|()| tracker.log_metrics(&run_id, &report.metrics()));
        if let Err(e) = logged {
            // Close the run so the tracker holds no dangling open run
            if let Err(end_err) = tracker.end_run(&run_id) {
                warn!("Could not end run {} after tracking error: {}", run_id, end_err);
            }
            return Err(e);
        }
        tracker.end_run(&run_id)?;

        info!("Logged run {} to experiment '{}'", run_id, self.config.experiment);
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Tracking,
            1.0,
            format!("Logged run {}", run_id),
        ));
        Ok(Some(run_id))
    }

    /// Preparation settings worth recording next to the model parameters.
    fn config_params(&self) -> Params {
        let processing = &self.config.processing;
        let mut params = Params::new();
        params.insert(
            "log_transform_columns".into(),
            processing.log_transform_columns.clone().into(),
        );
        params.insert("train_ratio".into(), processing.split.train_ratio.into());
        params.insert("seed".into(), processing.split.seed.into());
        match processing.outliers.as_ref().map(|p| p.method) {
            Some(OutlierMethod::ZScore { threshold }) => {
                params.insert("z_threshold".into(), threshold.into());
            }
            Some(OutlierMethod::Iqr { multiplier }) => {
                params.insert("iqr_multiplier".into(), multiplier.into());
            }
            None => {
                params.insert("outlier_removal".into(), false.into());
            }
        }
        params
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }
}

/// Builder for creating a [`Pipeline`] instance.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<TrainingConfig>,
    tracker: Option<Arc<dyn ExperimentTracker>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// Ensure PipelineBuilder is Send (can be moved to another thread during construction)
static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the training configuration.
    #[must_use]
    pub fn config(mut self, config: TrainingConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the experiment tracker. Without one, runs are not tracked.
    #[must_use]
    pub fn tracker(mut self, tracker: Arc<dyn ExperimentTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Set a progress reporter for receiving updates during training.
    #[must_use]
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    #[must_use]
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`](crate::LearningError::InvalidConfig)
    /// if the configuration is invalid.
    pub fn build(self) -> Result<Pipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let mut preparation = estate_processing::Pipeline::builder().config(config.processing.clone());
        if let Some(reporter) = &self.progress_reporter {
            preparation = preparation.progress_reporter(reporter.clone());
        }
        let preparation = preparation
            .build()
            .map_err(|e| crate::LearningError::InvalidConfig(e.to_string()))?;

        Ok(Pipeline {
            model_builder: ModelBuilder::new(config.target_column.clone()),
            config,
            preparation,
            tracker: self.tracker,
            progress_reporter: self.progress_reporter,
        })
    }
}
