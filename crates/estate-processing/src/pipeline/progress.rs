//! Progress reporting for the preparation and training pipelines.
//!
//! Both pipelines report stage-level [`ProgressUpdate`]s through the same
//! [`ProgressReporter`] trait. Reporting is purely observational: a reporter
//! cannot influence the run.
//!
//! # Example
//!
//! ```rust,ignore
//! use estate_processing::Pipeline;
//!
//! let prepared = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process_file("data/ames.csv")?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the training chain, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Loading the dataset from disk
    Ingesting,
    /// Filling or dropping missing values
    MissingValues,
    /// Applying feature strategies
    FeatureEngineering,
    /// Removing outlier rows
    OutlierRemoval,
    /// Splitting into train and test
    Splitting,
    /// Fitting the model on the training set
    Training,
    /// Scoring the model on the test set
    Evaluating,
    /// Handing parameters and metrics to the tracker
    Tracking,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl PipelineStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Ingesting => "Loading Data",
            Self::MissingValues => "Handling Missing Values",
            Self::FeatureEngineering => "Engineering Features",
            Self::OutlierRemoval => "Removing Outliers",
            Self::Splitting => "Splitting Data",
            Self::Training => "Training Model",
            Self::Evaluating => "Evaluating Model",
            Self::Tracking => "Tracking Run",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Returns the typical weight of this stage in the overall chain (0.0 - 1.0).
    pub fn weight(&self) -> f32 {
        match self {
            Self::Ingesting => 0.15,
            Self::MissingValues => 0.15,
            Self::FeatureEngineering => 0.10,
            Self::OutlierRemoval => 0.10,
            Self::Splitting => 0.05,
            Self::Training => 0.30,
            Self::Evaluating => 0.10,
            Self::Tracking => 0.05,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Returns the cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Ingesting => 0.0,
            Self::MissingValues => 0.15,
            Self::FeatureEngineering => 0.30,
            Self::OutlierRemoval => 0.40,
            Self::Splitting => 0.50,
            Self::Training => 0.55,
            Self::Evaluating => 0.85,
            Self::Tracking => 0.95,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// A single progress update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current pipeline stage
    pub stage: PipelineStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    /// Human-readable message describing current activity
    pub message: String,
}

impl ProgressUpdate {
    /// Creates a new progress update for a stage.
    pub fn new(stage: PipelineStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    /// Creates a completion progress update.
    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Complete,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
        }
    }

    /// Creates a failed progress update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Failed,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
        }
    }
}

/// Trait for receiving progress updates.
///
/// Implementations must be `Send + Sync` so a pipeline holding one can be
/// moved to a worker thread.
pub trait ProgressReporter: Send + Sync {
    /// Called at the start and end of every stage.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WORK_STAGES: [PipelineStage; 8] = [
        PipelineStage::Ingesting,
        PipelineStage::MissingValues,
        PipelineStage::FeatureEngineering,
        PipelineStage::OutlierRemoval,
        PipelineStage::Splitting,
        PipelineStage::Training,
        PipelineStage::Evaluating,
        PipelineStage::Tracking,
    ];

    #[test]
    fn test_stage_weights_sum_to_one() {
        let total: f32 = WORK_STAGES.iter().map(|s| s.weight()).sum();
        assert!((total - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_base_progress_is_cumulative() {
        let mut expected = 0.0;
        for stage in WORK_STAGES {
            assert!(
                (stage.base_progress() - expected).abs() < 0.001,
                "{:?}",
                stage
            );
            expected += stage.weight();
        }
    }

    #[test]
    fn test_progress_update_new() {
        let update = ProgressUpdate::new(PipelineStage::Training, 0.5, "Fitting");
        assert_eq!(update.stage, PipelineStage::Training);
        assert!((update.progress - 0.70).abs() < 0.001);
        assert_eq!(update.stage_progress, 0.5);
    }

    #[test]
    fn test_progress_update_clamps() {
        let update = ProgressUpdate::new(PipelineStage::Tracking, 5.0, "over");
        assert_eq!(update.progress, 1.0);
        assert_eq!(update.stage_progress, 1.0);
    }

    #[test]
    fn test_terminal_updates() {
        assert_eq!(ProgressUpdate::complete("done").progress, 1.0);
        let failed = ProgressUpdate::failed("boom");
        assert_eq!(failed.stage, PipelineStage::Failed);
        assert_eq!(failed.message, "boom");
    }

    #[test]
    fn test_closure_reporter() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let reporter = ClosureProgressReporter::new(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        reporter.report(ProgressUpdate::new(PipelineStage::Splitting, 0.0, "a"));
        reporter.report(ProgressUpdate::complete("b"));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_progress_update_serialization() {
        let update = ProgressUpdate::new(PipelineStage::OutlierRemoval, 1.0, "Removed 3 rows");
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("outlier_removal"));
    }
}
