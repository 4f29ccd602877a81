//! Outlier removal.
//!
//! Statistics are computed once on the input table. A row is dropped when
//! any configured column flags it; nulls never flag a row.

use crate::config::{OutlierMethod, OutlierPolicy};
use crate::error::{ProcessingError, Result};
use crate::types::ColumnKind;
use crate::utils::{
    ensure_columns_exist, kind_of, mean, numeric_column_names, numeric_values, quantile, sample_std,
};
use polars::prelude::*;
use tracing::{debug, info};

/// Removes outlier rows according to an [`OutlierPolicy`].
#[derive(Debug, Clone, Default)]
pub struct OutlierDetector {
    policy: OutlierPolicy,
    /// Left out of the empty-list default; explicit columns are not affected.
    excluded: Vec<String>,
}

impl OutlierDetector {
    pub fn new(policy: OutlierPolicy) -> Self {
        Self {
            policy,
            excluded: Vec::new(),
        }
    }

    /// Keep `columns` out of the default column set.
    ///
    /// Used for indicator columns added by feature engineering, which would
    /// otherwise flag every row holding a rare category.
    #[must_use]
    pub fn excluding(mut self, columns: Vec<String>) -> Self {
        self.excluded = columns;
        self
    }

    /// Z-score detector over the given columns.
    pub fn z_score(threshold: f64, columns: Vec<String>) -> Self {
        Self::new(OutlierPolicy::z_score(threshold, columns))
    }

    pub fn policy(&self) -> &OutlierPolicy {
        &self.policy
    }

    /// Columns the policy applies to in `df`, validated.
    pub fn resolve_columns(&self, df: &DataFrame) -> Result<Vec<String>> {
        self.policy
            .validate()
            .map_err(|e| ProcessingError::InvalidConfig(e.to_string()))?;

        if self.policy.columns.is_empty() {
            return Ok(numeric_column_names(df)
                .into_iter()
                .filter(|name| !self.excluded.contains(name))
                .collect());
        }

        ensure_columns_exist(df, &self.policy.columns)?;
        for name in &self.policy.columns {
            if kind_of(df, name)? != ColumnKind::Numeric {
                let dtype = df.column(name)?.dtype().clone();
                return Err(ProcessingError::non_numeric(name.as_str(), dtype));
            }
        }
        Ok(self.policy.columns.clone())
    }

    /// Mask of rows to keep (`true`) over the whole table.
    pub fn keep_mask(&self, df: &DataFrame) -> Result<Vec<bool>> {
        let columns = self.resolve_columns(df)?;
        let mut keep = vec![true; df.height()];

        for name in &columns {
            let values = numeric_values(df.column(name)?.as_materialized_series())?;
            let flagged = match self.policy.method {
                OutlierMethod::ZScore { threshold } => flag_z_score(&values, threshold),
                OutlierMethod::Iqr { multiplier } => flag_iqr(&values, multiplier),
            };

            let count = flagged.iter().filter(|f| **f).count();
            if count > 0 {
                debug!("Column '{}': {} outliers", name, count);
            }
            for (k, f) in keep.iter_mut().zip(flagged) {
                *k &= !f;
            }
        }

        Ok(keep)
    }

    /// Remove flagged rows. Returns the new table and the number of rows removed.
    ///
    /// Row order of the kept rows is preserved.
    pub fn remove(&self, df: &DataFrame) -> Result<(DataFrame, usize)> {
        let keep = self.keep_mask(df)?;
        let mask = BooleanChunked::from_slice("mask".into(), &keep);
        let out = df.filter(&mask)?;
        let removed = df.height() - out.height();

        info!(
            "Removed {} outlier rows ({} -> {})",
            removed,
            df.height(),
            out.height()
        );
        Ok((out, removed))
    }
}

/// Z-scores using the sample standard deviation of the non-null values.
///
/// A column with zero or undefined spread scores every row 0.
pub fn z_scores(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let m = mean(&present).unwrap_or(0.0);
    let std = sample_std(&present).filter(|s| *s > 0.0 && s.is_finite());

    values
        .iter()
        .map(|v| {
            v.map(|x| match std {
                Some(s) => (x - m) / s,
                None => 0.0,
            })
        })
        .collect()
}

fn flag_z_score(values: &[Option<f64>], threshold: f64) -> Vec<bool> {
    z_scores(values)
        .into_iter()
        .map(|z| z.is_some_and(|z| z.abs() > threshold))
        .collect()
}

fn flag_iqr(values: &[Option<f64>], multiplier: f64) -> Vec<bool> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let (Some(q1), Some(q3)) = (quantile(&present, 0.25), quantile(&present, 0.75)) else {
        return vec![false; values.len()];
    };
    let iqr = q3 - q1;
    let lower = q1 - multiplier * iqr;
    let upper = q3 + multiplier * iqr;

    values
        .iter()
        .map(|v| v.is_some_and(|x| x < lower || x > upper))
        .collect()
}
