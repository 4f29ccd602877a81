//! Main preparation pipeline module.
//!
//! This module provides the `Pipeline` struct and builder that chain
//! ingestion, missing value handling, feature engineering, outlier removal
//! and splitting.

use crate::config::{ConfigValidationError, PipelineConfig};
use crate::error::Result;
use crate::ingest::DataIngestor;
use crate::pipeline::PreparationExecutor;
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::types::{PreparedData, ProcessingSummary, StepKind, StepRecord};
use crate::utils::column_names;
use polars::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// The data preparation pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use estate_processing::{Pipeline, PipelineConfig};
///
/// let prepared = Pipeline::builder()
///     .config(PipelineConfig::builder().log_transform(["SalePrice"]).build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .process_file("data/ames.csv")?;
///
/// println!("{} train rows", prepared.split.train.height());
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    ingestor: DataIngestor,
    executor: PreparationExecutor,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// Ensure Pipeline is Send (can be moved to another thread)
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load a dataset and run every preparation step on it.
    ///
    /// Reports a terminal `Complete` or `Failed` update.
    pub fn process_file(&self, path: impl AsRef<Path>) -> Result<PreparedData> {
        let result = self.load(path).and_then(|df| self.prepare(&df));
        self.finish(result)
    }

    /// Run every preparation step on an in-memory dataset.
    ///
    /// Reports a terminal `Complete` or `Failed` update.
    pub fn process(&self, df: &DataFrame) -> Result<PreparedData> {
        let result = self.prepare(df);
        self.finish(result)
    }

    fn finish(&self, result: Result<PreparedData>) -> Result<PreparedData> {
        match result {
            Ok(prepared) => {
                self.report_progress(ProgressUpdate::complete("Preparation completed"));
                Ok(prepared)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Load a dataset with the configured ingestor.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Ingesting,
            0.0,
            format!("Loading {}...", path.display()),
        ));
        let df = self.ingestor.load(path)?;
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Ingesting,
            1.0,
            format!("Loaded {} rows", df.height()),
        ));
        Ok(df)
    }

    /// Run the preparation steps without terminal progress updates.
    ///
    /// Used by callers that continue the chain after splitting.
    pub fn prepare(&self, df: &DataFrame) -> Result<PreparedData> {
        let start_time = Instant::now();
        info!("Starting preparation pipeline...");

        let mut summary = ProcessingSummary::new();
        summary.rows_before = df.height();
        summary.columns_before = df.width();
        summary.add_step(StepRecord::new(
            StepKind::Ingested,
            format!("{} rows x {} columns", df.height(), df.width()),
            df,
            df,
        ));

        let df = self.stage(PipelineStage::MissingValues, &mut summary, || {
            self.executor.handle_missing_values(df)
        })?;
        let source_columns = column_names(&df);
        let df = self.stage(PipelineStage::FeatureEngineering, &mut summary, || {
            self.executor.engineer_features(&df)
        })?;
        let df = self.stage(PipelineStage::OutlierRemoval, &mut summary, || {
            self.executor.remove_outliers(&df, &source_columns)
        })?;

        summary.rows_after = df.height();
        summary.columns_after = df.width();

        let split = self.stage(PipelineStage::Splitting, &mut summary, || {
            self.executor.split(&df)
        })?;
        summary.train_rows = split.train.height();
        summary.test_rows = split.test.height();
        summary.duration_ms = start_time.elapsed().as_millis() as u64;

        info!(
            "Preparation finished in {}ms: {} -> {} rows, {} train / {} test",
            summary.duration_ms,
            summary.rows_before,
            summary.rows_after,
            summary.train_rows,
            summary.test_rows
        );
        Ok(PreparedData { split, summary })
    }

    /// Run one step between a start and end progress update, recording it.
    fn stage<T, F>(&self, stage: PipelineStage, summary: &mut ProcessingSummary, step: F) -> Result<T>
    where
        F: FnOnce() -> Result<(T, StepRecord)>,
    {
        self.report_progress(ProgressUpdate::new(
            stage,
            0.0,
            format!("{}...", stage.display_name()),
        ));
        let (value, record) = step()?;
        self.report_progress(ProgressUpdate::new(stage, 1.0, record.description.clone()));
        summary.add_step(record);
        Ok(value)
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }
}

/// Builder for creating a [`Pipeline`] instance.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    ingestor: Option<DataIngestor>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// Ensure PipelineBuilder is Send (can be moved to another thread during construction)
static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the ingestor used by [`Pipeline::process_file`].
    pub fn ingestor(mut self, ingestor: DataIngestor) -> Self {
        self.ingestor = Some(ingestor);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// This is a convenience method for simple progress handling.
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let executor = PreparationExecutor::from_config(&config);
        Ok(Pipeline {
            config,
            ingestor: self.ingestor.unwrap_or_default(),
            executor,
            progress_reporter: self.progress_reporter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Collects every update it receives.
    #[derive(Default)]
    struct Recorder(Mutex<Vec<ProgressUpdate>>);

    impl ProgressReporter for Recorder {
        fn report(&self, update: ProgressUpdate) {
            self.0.lock().unwrap().push(update);
        }
    }

    fn housing() -> DataFrame {
        let n = 20;
        let area: Vec<Option<f64>> = (0..n)
            .map(|i| if i == 3 { None } else { Some(1000.0 + 50.0 * i as f64) })
            .collect();
        let price: Vec<f64> = (0..n).map(|i| 100_000.0 + 5_000.0 * i as f64).collect();
        let street: Vec<Option<&str>> = (0..n)
            .map(|i| match i % 3 {
                0 => Some("Pave"),
                1 => None,
                _ => Some("Grvl"),
            })
            .collect();
        df!["Gr Liv Area" => area, "Street" => street, "SalePrice" => price].unwrap()
    }

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(pipeline.config().split.seed, 42);
        assert!(pipeline.progress_reporter.is_none());
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let mut config = PipelineConfig::default();
        config.split.train_ratio = 1.0;
        assert!(Pipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_process_produces_summary() {
        let config = PipelineConfig::builder()
            .log_transform(["SalePrice"])
            .build()
            .unwrap();
        let prepared = Pipeline::builder()
            .config(config)
            .build()
            .unwrap()
            .process(&housing())
            .unwrap();

        let summary = &prepared.summary;
        assert_eq!(summary.rows_before, 20);
        assert_eq!(summary.train_rows, 16);
        assert_eq!(summary.test_rows, 4);
        assert_eq!(summary.steps.len(), 5);
        assert_eq!(summary.steps[0].kind, StepKind::Ingested);
        assert_eq!(summary.steps[4].kind, StepKind::Split);

        for col in prepared.split.train.get_columns() {
            assert_eq!(col.null_count(), 0, "column {}", col.name());
        }
    }

    #[test]
    fn test_progress_reported_per_stage() {
        let recorder = Arc::new(Recorder::default());
        let pipeline = Pipeline::builder()
            .progress_reporter(recorder.clone())
            .build()
            .unwrap();
        pipeline.process(&housing()).unwrap();

        let updates = recorder.0.lock().unwrap();
        // start + end for four stages, then Complete
        assert_eq!(updates.len(), 9);
        assert_eq!(updates[0].stage, PipelineStage::MissingValues);
        assert_eq!(updates[8].stage, PipelineStage::Complete);
        assert!(updates.windows(2).all(|w| w[0].progress <= w[1].progress));
    }

    #[test]
    fn test_failure_reports_failed_stage() {
        let calls = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        let (calls_clone, failed_clone) = (calls.clone(), failed.clone());

        let config = PipelineConfig::builder()
            .log_transform(["Missing Column"])
            .build()
            .unwrap();
        let result = Pipeline::builder()
            .config(config)
            .on_progress(move |update| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                if update.stage == PipelineStage::Failed {
                    failed_clone.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build()
            .unwrap()
            .process(&housing());

        let err = result.unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(failed.load(Ordering::SeqCst), 1);
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }
}
