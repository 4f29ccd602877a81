//! Statistical imputation methods.
//!
//! Provides mean, median, mode and constant imputation. Every method fails
//! with `NoValidValues` when the column has nothing to compute a fill from.

use crate::error::{ProcessingError, Result};
use crate::utils::{
    fill_numeric_nulls, fill_string_nulls, is_numeric_dtype, mean, median, non_null_values,
    string_mode,
};
use polars::prelude::*;
use std::collections::HashMap;

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill a numeric column with the mean of its non-null values.
    pub fn fill_mean(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<f64> {
        let values = Self::numeric_input(df, col_name)?;
        let fill = mean(&values).ok_or_else(|| ProcessingError::NoValidValues(col_name.into()))?;
        Self::fill_with_value(df, col_name, fill, processing_steps, "mean")?;
        Ok(fill)
    }

    /// Fill a numeric column with the median of its non-null values.
    pub fn fill_median(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<f64> {
        let values = Self::numeric_input(df, col_name)?;
        let fill =
            median(&values).ok_or_else(|| ProcessingError::NoValidValues(col_name.into()))?;
        Self::fill_with_value(df, col_name, fill, processing_steps, "median")?;
        Ok(fill)
    }

    /// Fill a column with its most frequent value.
    ///
    /// Numeric columns keep a numeric fill; everything else is filled as text.
    /// Ties go to the smallest value.
    pub fn fill_mode(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<String> {
        let series = Self::series(df, col_name)?;

        if is_numeric_dtype(series.dtype()) {
            let values = non_null_values(&series)?;
            let fill = numeric_mode(&values)
                .ok_or_else(|| ProcessingError::NoValidValues(col_name.into()))?;
            Self::fill_with_value(df, col_name, fill, processing_steps, "mode")?;
            return Ok(fill.to_string());
        }

        let mode_val =
            string_mode(&series).ok_or_else(|| ProcessingError::NoValidValues(col_name.into()))?;
        let filled = fill_string_nulls(&series, &mode_val)?;
        df.replace(col_name, filled)?;

        processing_steps.push(format!("Filled '{}' with mode: '{}'", col_name, mode_val));
        Ok(mode_val)
    }

    /// Fill a numeric column with a fixed number.
    pub fn fill_constant_number(
        df: &mut DataFrame,
        col_name: &str,
        value: f64,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        Self::fill_with_value(df, col_name, value, processing_steps, "constant")
    }

    /// Fill a text column with a fixed string.
    pub fn fill_constant_text(
        df: &mut DataFrame,
        col_name: &str,
        value: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let series = Self::series(df, col_name)?;
        let filled = fill_string_nulls(&series, value)?;
        df.replace(col_name, filled)?;

        processing_steps.push(format!(
            "Filled '{}' with constant value: '{}'",
            col_name, value
        ));
        Ok(())
    }

    fn series(df: &DataFrame, col_name: &str) -> Result<Series> {
        df.column(col_name)
            .map(|c| c.as_materialized_series().clone())
            .map_err(|_| ProcessingError::ColumnNotFound(col_name.to_string()))
    }

    fn numeric_input(df: &DataFrame, col_name: &str) -> Result<Vec<f64>> {
        let series = Self::series(df, col_name)?;
        if !is_numeric_dtype(series.dtype()) {
            return Err(ProcessingError::non_numeric(col_name, series.dtype()));
        }
        Ok(non_null_values(&series)?)
    }

    /// Fill numeric column with a specific value.
    fn fill_with_value(
        df: &mut DataFrame,
        col_name: &str,
        fill_value: f64,
        processing_steps: &mut Vec<String>,
        method: &str,
    ) -> Result<()> {
        let series = Self::series(df, col_name)?;
        let filled = fill_numeric_nulls(&series, fill_value)?;
        df.replace(col_name, filled)?;

        processing_steps.push(format!(
            "Filled '{}' with {}: {:.2}",
            col_name, method, fill_value
        ));
        Ok(())
    }
}

/// Most frequent number, smallest value on ties.
fn numeric_mode(values: &[f64]) -> Option<f64> {
    let mut counts: HashMap<u64, (f64, usize)> = HashMap::new();
    for &v in values {
        // -0.0 and 0.0 count as the same value
        let key = if v == 0.0 { 0u64 } else { v.to_bits() };
        counts.entry(key).or_insert((v, 0)).1 += 1;
    }

    counts
        .into_values()
        .max_by(|(a_val, a_count), (b_val, b_count)| {
            a_count.cmp(b_count).then_with(|| b_val.total_cmp(a_val))
        })
        .map(|(v, _)| v)
}
