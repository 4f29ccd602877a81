//! Feature engineering.
//!
//! The [`FeatureEngineer`] holds an ordered list of [`FeatureStrategy`]
//! values and applies them one after another. Each strategy is a pure
//! function from the transforms module, so strategies can also be applied
//! individually.

mod transforms;

pub use transforms::{
    categories, indicator_columns, inverse_log_transform, log_transform, min_max_scale,
    one_hot_encode, standard_scale,
};

use crate::config::FeatureStrategy;
use crate::error::{Result, ResultExt};
use polars::prelude::DataFrame;
use tracing::{debug, info};

/// Applies feature strategies in order.
#[derive(Debug, Clone, Default)]
pub struct FeatureEngineer {
    strategies: Vec<FeatureStrategy>,
}

impl FeatureEngineer {
    pub fn new(strategies: Vec<FeatureStrategy>) -> Self {
        Self { strategies }
    }

    /// Engineer that only log-transforms the given columns.
    pub fn log(columns: Vec<String>) -> Self {
        Self::new(vec![FeatureStrategy::Log { columns }])
    }

    pub fn strategies(&self) -> &[FeatureStrategy] {
        &self.strategies
    }

    /// Replace the strategy list.
    pub fn set_strategies(&mut self, strategies: Vec<FeatureStrategy>) {
        self.strategies = strategies;
    }

    /// Apply every strategy in order. Row count is preserved.
    pub fn apply(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut current = df.clone();
        for strategy in &self.strategies {
            current = Self::apply_strategy(&current, strategy)
                .context(format!("Feature step '{}' failed", strategy.name()))?;
        }
        if !self.strategies.is_empty() {
            info!(
                "Applied {} feature strategies ({} columns now)",
                self.strategies.len(),
                current.width()
            );
        }
        Ok(current)
    }

    /// Apply a single strategy.
    pub fn apply_strategy(df: &DataFrame, strategy: &FeatureStrategy) -> Result<DataFrame> {
        debug!("Applying {} to {:?}", strategy.name(), strategy.columns());
        match strategy {
            FeatureStrategy::Log { columns } => log_transform(df, columns),
            FeatureStrategy::StandardScale { columns } => standard_scale(df, columns),
            FeatureStrategy::MinMaxScale { columns, min, max } => {
                min_max_scale(df, columns, *min, *max)
            }
            FeatureStrategy::OneHot { columns } => one_hot_encode(df, columns),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessingError;
    use polars::prelude::*;

    #[test]
    fn test_engineer_applies_in_order() {
        let df = df![
            "SalePrice" => [100000.0, 200000.0, 300000.0],
            "Street" => ["Grvl", "Pave", "Pave"],
        ]
        .unwrap();

        let engineer = FeatureEngineer::new(vec![
            FeatureStrategy::Log {
                columns: vec!["SalePrice".into()],
            },
            FeatureStrategy::OneHot {
                columns: vec!["Street".into()],
            },
        ]);
        let out = engineer.apply(&df).unwrap();

        assert_eq!(out.height(), 3);
        assert_eq!(out.width(), 2);
        assert!(out.column("Street_Pave").is_ok());
        let first = out
            .column("SalePrice")
            .unwrap()
            .get(0)
            .unwrap()
            .try_extract::<f64>()
            .unwrap();
        assert!((first - 100001f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn test_engineer_error_keeps_code() {
        let df = df!["a" => [1.0]].unwrap();
        let err = FeatureEngineer::log(vec!["b".into()]).apply(&df).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        assert!(err.is_config_error());
        assert!(matches!(err, ProcessingError::WithContext { .. }));
    }

    #[test]
    fn test_empty_engineer_is_identity() {
        let df = df!["a" => [1.0, 2.0]].unwrap();
        let out = FeatureEngineer::default().apply(&df).unwrap();
        assert!(out.equals(&df));
    }
}
