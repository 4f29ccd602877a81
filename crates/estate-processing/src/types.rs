use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Kind of a column as seen by the preparation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Any integer or float dtype.
    Numeric,
    /// String, categorical or boolean.
    Categorical,
    /// Dates and everything else.
    Other,
}

/// The two halves of a dataset after splitting.
///
/// Train and test are disjoint and together hold every input row.
#[derive(Debug, Clone)]
pub struct SplitResult {
    pub train: DataFrame,
    pub test: DataFrame,
}

impl SplitResult {
    /// Total number of rows over both halves.
    pub fn total_rows(&self) -> usize {
        self.train.height() + self.test.height()
    }
}

/// Output of the preparation pipeline: the split dataset plus what was done to it.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub split: SplitResult,
    pub summary: ProcessingSummary,
}

// ============================================================================
// Processing Summary Types
// ============================================================================

/// Types of steps recorded in a [`ProcessingSummary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// The raw dataset was loaded.
    Ingested,
    /// Missing values were filled, or rows/columns with them dropped.
    MissingValuesHandled,
    /// A feature strategy was applied.
    FeatureTransformed,
    /// Outlier rows were removed.
    OutliersRemoved,
    /// The dataset was split into train and test.
    Split,
}

impl StepKind {
    /// Get a human-readable display name for the step kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Ingested => "Ingested",
            Self::MissingValuesHandled => "Missing Values Handled",
            Self::FeatureTransformed => "Feature Transformed",
            Self::OutliersRemoved => "Outliers Removed",
            Self::Split => "Split",
        }
    }
}

/// A single recorded step with the table shape before and after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub kind: StepKind,
    pub description: String,
    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,
    /// Columns touched by the step, if it targets specific columns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
}

impl StepRecord {
    /// Record a step from the shapes of the frames before and after it.
    pub fn new(
        kind: StepKind,
        description: impl Into<String>,
        before: &DataFrame,
        after: &DataFrame,
    ) -> Self {
        Self {
            kind,
            description: description.into(),
            rows_before: before.height(),
            rows_after: after.height(),
            columns_before: before.width(),
            columns_after: after.width(),
            columns: Vec::new(),
        }
    }

    /// Attach the affected columns.
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    /// Rows removed by this step.
    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }
}

/// Summary of what the preparation pipeline did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingSummary {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,

    pub train_rows: usize,
    pub test_rows: usize,

    /// Steps in execution order.
    pub steps: Vec<StepRecord>,

    /// Warnings and notes generated along the way.
    pub warnings: Vec<String>,
}

impl ProcessingSummary {
    /// Create a new empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, step: StepRecord) {
        self.steps.push(step);
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Rows removed over the whole run.
    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }

    /// Calculate the percentage of rows removed.
    pub fn rows_removed_percentage(&self) -> f32 {
        if self.rows_before == 0 {
            0.0
        } else {
            (self.rows_removed() as f32 / self.rows_before as f32) * 100.0
        }
    }

    /// Rows removed by outlier steps only.
    pub fn outliers_removed(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.kind == StepKind::OutliersRemoved)
            .map(StepRecord::rows_removed)
            .sum()
    }
}

// ============================================================================
// Tests
// ============================================================================
