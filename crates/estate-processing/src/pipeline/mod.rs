//! Pipeline module.
//!
//! This module provides the preparation pipeline and the steps it chains.

mod builder;
mod executor;
pub mod outliers;
pub mod progress;
pub mod split;

pub use builder::{Pipeline, PipelineBuilder};
pub use executor::PreparationExecutor;
pub use outliers::OutlierDetector;
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
pub use split::DataSplitter;
