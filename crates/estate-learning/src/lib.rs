//! # estate-learning
//!
//! Model building, evaluation and experiment tracking for house-price
//! prediction.
//!
//! The crate picks up where `estate-processing` stops: given a prepared
//! train/test split it fits a linear regression, scores it on the held-out
//! rows and hands parameters and metrics to an [`ExperimentTracker`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use estate_learning::{JsonFileTracker, Pipeline, TrainingConfig};
//! use estate_processing::PipelineConfig;
//! use std::sync::Arc;
//!
//! let config = TrainingConfig::builder()
//!     .target_column("SalePrice")
//!     .processing(
//!         PipelineConfig::builder()
//!             .log_transform(["SalePrice", "Gr Liv Area"])
//!             .z_threshold(3.0)
//!             .build()?,
//!     )
//!     .build()?;
//!
//! let pipeline = Pipeline::builder()
//!     .config(config)
//!     .tracker(Arc::new(JsonFileTracker::new("mlruns")?))
//!     .on_progress(|update| println!("{:.0}% {}", update.progress * 100.0, update.message))
//!     .build()?;
//!
//! let result = pipeline.train_file("data/ames.csv")?;
//! println!("R² = {:.4}", result.report.r2);
//! ```
//!
//! ## Modules
//!
//! - [`preprocess`]: fitted column encodings turning a table into a matrix
//! - [`regression`]: least-squares solver
//! - [`model`]: [`ModelBuilder`] and the persisted [`FittedModel`]
//! - [`evaluate`]: MSE, RMSE, MAE and R²
//! - [`tracking`]: the tracker trait and its in-memory and JSON-lines backends
//! - [`pipeline`]: end-to-end orchestration with progress reporting

pub mod config;
pub mod error;
pub mod evaluate;
pub mod model;
pub mod pipeline;
pub mod preprocess;
pub mod regression;
pub mod tracking;
pub mod types;

pub use config::{TrainingConfig, TrainingConfigBuilder};
pub use error::{LearningError, Result, Result as LearningResult};
pub use evaluate::{Evaluator, regression_report};
pub use model::{FittedModel, ModelBuilder};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use preprocess::{ColumnEncoding, FeaturePreprocessor};
pub use tracking::{ExperimentTracker, InMemoryTracker, JsonFileTracker, RunRecord, TrackerEvent};
pub use types::{EvaluationReport, Metrics, ModelInfo, Params, TrainingResult};

// Progress types are shared with the preparation pipeline
pub use estate_processing::{PipelineStage, ProgressReporter, ProgressUpdate};
