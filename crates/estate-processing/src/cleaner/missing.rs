//! Missing value handling.
//!
//! A [`MissingValueHandler`] resolves one [`ColumnAction`] per column before
//! touching any data, then applies the plan: column drops first, row drops
//! second, fills last so fill statistics describe the rows that survive.

use crate::config::{MissingStrategy, MissingValueConfig};
use crate::error::{ProcessingError, Result};
use crate::imputers::StatisticalImputer;
use crate::types::ColumnKind;
use crate::utils::{column_kind, parse_numeric_string};
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

/// The resolved action for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ColumnAction {
    FillMean,
    FillMedian,
    FillMode,
    FillNumber { value: f64 },
    FillText { value: String },
    DropRows,
    DropColumn,
    Keep,
}

/// Plan entry for a single column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnPlan {
    pub column: String,
    pub kind: ColumnKind,
    /// Null count at planning time.
    pub missing: usize,
    pub action: ColumnAction,
}

impl ColumnPlan {
    /// Whether applying this entry changes the dataset.
    pub fn is_active(&self) -> bool {
        self.missing > 0 && self.action != ColumnAction::Keep
    }
}

/// Fills or drops missing entries per column.
#[derive(Debug, Clone, Default)]
pub struct MissingValueHandler {
    config: MissingValueConfig,
}

impl MissingValueHandler {
    pub fn new(config: MissingValueConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MissingValueConfig {
        &self.config
    }

    /// Resolve and validate the action for every column of `df`.
    ///
    /// Fails if a configured column does not exist, a numeric statistic is
    /// configured for a non-numeric column, a numeric constant does not
    /// parse, or a fill is requested for a column with no values at all.
    /// A `DropColumn` entry for an absent column is already satisfied.
    pub fn plan(&self, df: &DataFrame) -> Result<Vec<ColumnPlan>> {
        for (name, strategy) in &self.config.columns {
            if df.column(name).is_ok() {
                continue;
            }
            if matches!(strategy, MissingStrategy::DropColumn) {
                debug!("Column '{}' already dropped", name);
                continue;
            }
            return Err(ProcessingError::ColumnNotFound(name.clone()));
        }

        let height = df.height();
        let mut plan = Vec::with_capacity(df.width());

        for col in df.get_columns() {
            let name = col.name().to_string();
            let kind = column_kind(col.dtype());
            let missing = col.null_count();

            let strategy = match (self.config.columns.get(&name), kind) {
                (Some(explicit), _) => explicit.clone(),
                (None, ColumnKind::Numeric) => self.config.numeric_default.clone(),
                (None, ColumnKind::Categorical) => self.config.categorical_default.clone(),
                (None, ColumnKind::Other) => MissingStrategy::Keep,
            };

            let action = Self::resolve(&name, col.dtype(), kind, &strategy)?;

            let needs_statistic = matches!(
                action,
                ColumnAction::FillMean | ColumnAction::FillMedian | ColumnAction::FillMode
            );
            if needs_statistic && missing > 0 && missing == height {
                return Err(ProcessingError::NoValidValues(name));
            }

            debug!("Column '{}' ({:?}, {} missing): {:?}", name, kind, missing, action);
            plan.push(ColumnPlan {
                column: name,
                kind,
                missing,
                action,
            });
        }

        Ok(plan)
    }

    fn resolve(
        name: &str,
        dtype: &DataType,
        kind: ColumnKind,
        strategy: &MissingStrategy,
    ) -> Result<ColumnAction> {
        if strategy.requires_numeric() && kind != ColumnKind::Numeric {
            return Err(ProcessingError::non_numeric(name, dtype));
        }

        let action = match (strategy, kind) {
            (MissingStrategy::Mean, _) => ColumnAction::FillMean,
            (MissingStrategy::Median, _) => ColumnAction::FillMedian,
            (MissingStrategy::Mode | MissingStrategy::Constant(_), ColumnKind::Other) => {
                return Err(ProcessingError::InvalidConfig(format!(
                    "Strategy {:?} is not supported for column '{}' of dtype {}",
                    strategy, name, dtype
                )));
            }
            (MissingStrategy::Mode, _) => ColumnAction::FillMode,
            (MissingStrategy::Constant(raw), ColumnKind::Numeric) => {
                let value = parse_numeric_string(raw).ok_or_else(|| {
                    ProcessingError::InvalidConfig(format!(
                        "Constant '{}' for numeric column '{}' is not a number",
                        raw, name
                    ))
                })?;
                ColumnAction::FillNumber { value }
            }
            (MissingStrategy::Constant(raw), _) => ColumnAction::FillText { value: raw.clone() },
            (MissingStrategy::DropRows, _) => ColumnAction::DropRows,
            (MissingStrategy::DropColumn, _) => ColumnAction::DropColumn,
            (MissingStrategy::Keep, _) => ColumnAction::Keep,
        };
        Ok(action)
    }

    /// Apply the handler and return the new dataset with a log of actions.
    ///
    /// Columns without missing values are returned unchanged, so applying
    /// the handler to its own output is a no-op.
    pub fn apply(&self, df: &DataFrame) -> Result<(DataFrame, Vec<String>)> {
        let plan = self.plan(df)?;
        let mut actions = Vec::new();
        let mut df = df.clone();

        let active: Vec<&ColumnPlan> = plan.iter().filter(|p| p.is_active()).collect();
        if active.is_empty() {
            debug!("No missing values to handle");
            return Ok((df, actions));
        }

        // 1. Drop columns
        let dropped: Vec<&str> = active
            .iter()
            .filter(|p| p.action == ColumnAction::DropColumn)
            .map(|p| p.column.as_str())
            .collect();
        if !dropped.is_empty() {
            df = df.drop_many(dropped.iter().copied());
            actions.push(format!(
                "Dropped {} columns with missing values: {:?}",
                dropped.len(),
                dropped
            ));
        }

        // 2. Drop rows
        let row_columns: Vec<&str> = active
            .iter()
            .filter(|p| p.action == ColumnAction::DropRows)
            .map(|p| p.column.as_str())
            .collect();
        if !row_columns.is_empty() {
            let mut mask = BooleanChunked::full("mask".into(), true, df.height());
            for name in &row_columns {
                mask = &mask & &df.column(name)?.is_not_null();
            }
            let before = df.height();
            df = df.filter(&mask)?;
            actions.push(format!(
                "Dropped {} rows with missing values in {:?}",
                before - df.height(),
                row_columns
            ));
        }

        // 3. Fill
        for entry in &active {
            if matches!(
                entry.action,
                ColumnAction::DropRows | ColumnAction::DropColumn | ColumnAction::Keep
            ) {
                continue;
            }
            // Row drops above may already have removed every null
            if df.column(&entry.column)?.null_count() == 0 {
                continue;
            }
            let name = entry.column.as_str();
            match &entry.action {
                ColumnAction::FillMean => {
                    StatisticalImputer::fill_mean(&mut df, name, &mut actions)?;
                }
                ColumnAction::FillMedian => {
                    StatisticalImputer::fill_median(&mut df, name, &mut actions)?;
                }
                ColumnAction::FillMode => {
                    StatisticalImputer::fill_mode(&mut df, name, &mut actions)?;
                }
                ColumnAction::FillNumber { value } => {
                    StatisticalImputer::fill_constant_number(&mut df, name, *value, &mut actions)?;
                }
                ColumnAction::FillText { value } => {
                    StatisticalImputer::fill_constant_text(&mut df, name, value, &mut actions)?;
                }
                ColumnAction::DropRows | ColumnAction::DropColumn | ColumnAction::Keep => {}
            }
        }

        info!(
            "Handled missing values in {} columns ({} actions)",
            active.len(),
            actions.len()
        );
        Ok((df, actions))
    }

    /// Apply the handler, discarding the action log.
    pub fn handle(&self, df: &DataFrame) -> Result<DataFrame> {
        self.apply(df).map(|(df, _)| df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df![
            "Lot Frontage" => [Some(60.0), None, Some(80.0), Some(70.0)],
            "Garage Cars" => [Some(1i64), Some(2), None, Some(2)],
            "Alley" => [None, Some("Pave"), Some("Grvl"), Some("Pave")],
            "SalePrice" => [200000.0, 180000.0, 240000.0, 210000.0],
        ]
        .unwrap()
    }

    fn handler(config: MissingValueConfig) -> MissingValueHandler {
        MissingValueHandler::new(config)
    }

    // ========================================================================
    // plan() tests
    // ========================================================================

    #[test]
    fn test_plan_defaults_by_kind() {
        let plan = handler(MissingValueConfig::default()).plan(&sample()).unwrap();

        assert_eq!(plan.len(), 4);
        assert_eq!(plan[0].action, ColumnAction::FillMean);
        assert_eq!(plan[0].missing, 1);
        assert_eq!(plan[2].kind, ColumnKind::Categorical);
        assert_eq!(plan[2].action, ColumnAction::FillMode);
        assert!(!plan[3].is_active());
    }

    #[test]
    fn test_plan_unknown_column() {
        let config = MissingValueConfig::default().with_column("Pool QC", MissingStrategy::Mode);
        let err = handler(config).plan(&sample()).unwrap_err();
        assert!(matches!(err, ProcessingError::ColumnNotFound(ref c) if c == "Pool QC"));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_plan_mean_on_categorical() {
        let config = MissingValueConfig::default().with_column("Alley", MissingStrategy::Mean);
        let err = handler(config).plan(&sample()).unwrap_err();
        assert!(matches!(err, ProcessingError::NonNumericColumn { .. }));
    }

    #[test]
    fn test_plan_unparseable_numeric_constant() {
        let config = MissingValueConfig::default()
            .with_column("Lot Frontage", MissingStrategy::Constant("wide".into()));
        let err = handler(config).plan(&sample()).unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidConfig(_)));
    }

    #[test]
    fn test_plan_all_null_column_with_fill() {
        let df = df![
            "a" => [Option::<f64>::None, None],
            "b" => [1.0, 2.0],
        ]
        .unwrap();
        let err = handler(MissingValueConfig::default()).plan(&df).unwrap_err();
        assert!(matches!(err, ProcessingError::NoValidValues(ref c) if c == "a"));

        // Constant fills and drops do not need any existing values
        let config = MissingValueConfig::default()
            .with_column("a", MissingStrategy::Constant("0".into()));
        assert!(handler(config).plan(&df).is_ok());
    }

    // ========================================================================
    // apply() tests
    // ========================================================================

    #[test]
    fn test_apply_defaults_fill_everything() {
        let df = sample();
        let out = handler(MissingValueConfig::default()).handle(&df).unwrap();

        assert_eq!(out.height(), 4);
        for col in out.get_columns() {
            assert_eq!(col.null_count(), 0, "column {}", col.name());
        }
        // Mean of [60, 80, 70]
        let frontage = out.column("Lot Frontage").unwrap();
        assert_eq!(frontage.get(1).unwrap().try_extract::<f64>().unwrap(), 70.0);
        assert_eq!(
            out.column("Alley").unwrap().get(0).unwrap().get_str(),
            Some("Pave")
        );
        // Input untouched
        assert_eq!(df.column("Lot Frontage").unwrap().null_count(), 1);
    }

    #[test]
    fn test_apply_drop_rows_and_columns() {
        let config = MissingValueConfig::default()
            .with_column("Garage Cars", MissingStrategy::DropRows)
            .with_column("Alley", MissingStrategy::DropColumn);
        let (out, actions) = handler(config).apply(&sample()).unwrap();

        assert_eq!(out.height(), 3);
        assert!(out.column("Alley").is_err());
        assert_eq!(out.column("Garage Cars").unwrap().dtype(), &DataType::Int64);
        assert_eq!(out.column("Lot Frontage").unwrap().null_count(), 0);
        assert!(actions.iter().any(|a| a.contains("Dropped 1 rows")));
    }

    #[test]
    fn test_apply_keep_leaves_nulls() {
        let config = MissingValueConfig {
            numeric_default: MissingStrategy::Keep,
            categorical_default: MissingStrategy::Keep,
            ..MissingValueConfig::default()
        };
        let df = sample();
        let out = handler(config).handle(&df).unwrap();
        assert!(out.equals_missing(&df));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let config = MissingValueConfig::default()
            .with_column("Garage Cars", MissingStrategy::DropRows)
            .with_column("Alley", MissingStrategy::Constant("None".into()));
        let h = handler(config);

        let once = h.handle(&sample()).unwrap();
        let twice = h.handle(&once).unwrap();
        assert!(once.equals_missing(&twice));
    }

    #[test]
    fn test_apply_drop_column_is_idempotent() {
        let config = MissingValueConfig::default()
            .with_column("Alley", MissingStrategy::DropColumn)
            .with_column("Garage Cars", MissingStrategy::DropRows);
        let h = handler(config);

        let once = h.handle(&sample()).unwrap();
        assert!(once.column("Alley").is_err());
        let (twice, actions) = h.apply(&once).unwrap();
        assert!(once.equals_missing(&twice));
        assert!(actions.is_empty());
    }

    #[test]
    fn test_plan_skips_already_dropped_column() {
        let df = sample().drop("Alley").unwrap();
        let config = MissingValueConfig::default().with_column("Alley", MissingStrategy::DropColumn);
        let plan = handler(config).plan(&df).unwrap();
        assert_eq!(plan.len(), 3);
        assert!(plan.iter().all(|p| p.column != "Alley"));

        // Strategies that read the column still need it
        let config = MissingValueConfig::default().with_column("Alley", MissingStrategy::Mode);
        let err = handler(config).plan(&df).unwrap_err();
        assert!(matches!(err, ProcessingError::ColumnNotFound(ref c) if c == "Alley"));
    }

    #[test]
    fn test_apply_no_missing_values_keeps_dtypes() {
        let df = df!["n" => [1i64, 2, 3], "s" => ["a", "b", "c"]].unwrap();
        let out = handler(MissingValueConfig::default()).handle(&df).unwrap();
        assert_eq!(out.column("n").unwrap().dtype(), &DataType::Int64);
        assert!(out.equals(&df));
    }
}
