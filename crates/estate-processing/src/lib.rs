//! House-Price Data Preparation Library
//!
//! Turns a raw housing dataset into clean, model-ready train and test tables,
//! built on Polars.
//!
//! # Overview
//!
//! The preparation chain runs these steps in order:
//!
//! - **Ingestion**: CSV or Parquet loading with missing-marker and numeric normalization
//! - **Missing Values**: per-column fill or drop strategies with typed defaults
//! - **Feature Engineering**: log transform, scaling and one-hot encoding
//! - **Outlier Removal**: z-score (or IQR) row filtering
//! - **Splitting**: seeded, reproducible train/test partition
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use estate_processing::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .log_transform(["SalePrice", "Gr Liv Area"])
//!     .z_threshold(3.0)
//!     .train_ratio(0.8)
//!     .seed(42)
//!     .build()?;
//!
//! let prepared = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process_file("data/ames.csv")?;
//!
//! println!("Train rows: {}", prepared.split.train.height());
//! println!("Outliers removed: {}", prepared.summary.outliers_removed());
//! ```
//!
//! # Configuration
//!
//! Missing-value handling is configured per column, with defaults by column kind:
//!
//! ```rust,ignore
//! use estate_processing::config::*;
//!
//! let missing = MissingValueConfig::default()
//!     .with_column("Alley", MissingStrategy::DropColumn)
//!     .with_column("Garage Type", MissingStrategy::Constant("None".into()));
//!
//! let config = PipelineConfig::builder().missing_values(missing).build()?;
//! ```
//!
//! Every step is also usable on its own: see [`MissingValueHandler`],
//! [`FeatureEngineer`], [`OutlierDetector`] and [`DataSplitter`].

pub mod cleaner;
pub mod config;
pub mod error;
pub mod features;
pub mod imputers;
pub mod ingest;
pub mod pipeline;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{ColumnAction, ColumnPlan, MissingValueHandler};
pub use config::{
    ConfigValidationError, FeatureStrategy, MissingStrategy, MissingValueConfig, OutlierMethod,
    OutlierPolicy, PipelineConfig, PipelineConfigBuilder, SplitConfig,
};
pub use error::{ErrorKind, ProcessingError, Result, Result as ProcessingResult, ResultExt};
pub use features::FeatureEngineer;
pub use imputers::StatisticalImputer;
pub use ingest::{DataIngestor, DatasetFormat};
pub use pipeline::{
    ClosureProgressReporter, DataSplitter, OutlierDetector, Pipeline, PipelineBuilder,
    PipelineStage, PreparationExecutor, ProgressReporter, ProgressUpdate,
};
pub use types::{
    ColumnKind, PreparedData, ProcessingSummary, SplitResult, StepKind, StepRecord,
};
pub use utils::{clean_numeric_string, is_missing_marker, is_numeric_dtype, parse_numeric_string};
