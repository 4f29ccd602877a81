//! Imputation module for filling missing values.
//!
//! Statistical imputation (mean, median, mode) and constant fills. The
//! missing value handler decides which one applies to each column.

mod statistical;

pub use statistical::StatisticalImputer;
