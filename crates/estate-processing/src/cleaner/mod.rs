//! Data cleaning module.
//!
//! Currently holds the per-column missing value handler.

mod missing;

pub use missing::{ColumnAction, ColumnPlan, MissingValueHandler};
