//! Shared utilities for the preparation steps.
//!
//! Dtype classification, marker/number parsing and the small set of
//! descriptive statistics every step relies on live here so the imputer,
//! the feature engineer and the outlier detector agree on them.

use crate::types::ColumnKind;
use polars::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a float type.
#[inline]
pub fn is_float_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Classify a DataType for the preparation steps.
pub fn column_kind(dtype: &DataType) -> ColumnKind {
    if is_numeric_dtype(dtype) {
        ColumnKind::Numeric
    } else if matches!(
        dtype,
        DataType::String | DataType::Categorical(_, _) | DataType::Boolean
    ) {
        ColumnKind::Categorical
    } else {
        ColumnKind::Other
    }
}

/// Kind of a named column, or `ColumnNotFound`.
pub fn kind_of(df: &DataFrame, column: &str) -> crate::Result<ColumnKind> {
    let col = df
        .column(column)
        .map_err(|_| crate::ProcessingError::ColumnNotFound(column.to_string()))?;
    Ok(column_kind(col.dtype()))
}

/// Names of all columns, in frame order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns().iter().map(|c| c.name().to_string()).collect()
}

/// Names of all numeric columns, in frame order.
pub fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| is_numeric_dtype(c.dtype()))
        .map(|c| c.name().to_string())
        .collect()
}

/// Fail with `ColumnNotFound` for the first missing name.
pub fn ensure_columns_exist<S: AsRef<str>>(df: &DataFrame, columns: &[S]) -> crate::Result<()> {
    for name in columns {
        let name = name.as_ref();
        if df.column(name).is_err() {
            return Err(crate::ProcessingError::ColumnNotFound(name.to_string()));
        }
    }
    Ok(())
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Characters commonly used in numeric formatting that should be stripped.
pub const NUMERIC_FORMAT_CHARS: [char; 5] = [',', '$', '€', '£', ' '];

/// Textual markers that mean "no value" in raw exports.
pub const MISSING_MARKERS: [&str; 8] = [
    "", "na", "n/a", "nan", "null", "none", "missing", "#n/a",
];

/// Clean a string for numeric parsing by removing formatting characters.
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// Check if a string is a missing value marker.
///
/// # Example
///
/// ```rust,ignore
/// use estate_processing::utils::is_missing_marker;
///
/// assert!(is_missing_marker("NA"));
/// assert!(is_missing_marker("  "));
/// assert!(!is_missing_marker("Pave"));
/// ```
pub fn is_missing_marker(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    MISSING_MARKERS.iter().any(|&marker| lower == marker)
}

/// Try to parse a string as a numeric value (f64).
///
/// Handles currency symbols and thousands separators.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Ratio of non-marker values in a string Series that parse as numbers.
pub fn numeric_ratio(series: &Series) -> f64 {
    let Ok(ca) = series.str() else {
        return 0.0;
    };

    let mut numeric_count = 0usize;
    let mut total_count = 0usize;
    for val in ca.into_iter().flatten() {
        if is_missing_marker(val) {
            continue;
        }
        total_count += 1;
        if parse_numeric_string(val).is_some() {
            numeric_count += 1;
        }
    }

    if total_count == 0 {
        0.0
    } else {
        numeric_count as f64 / total_count as f64
    }
}

// =============================================================================
// Series Access Utilities
// =============================================================================

/// Values of a numeric Series as `Option<f64>`, nulls and NaN as `None`.
pub fn numeric_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let floats = series.cast(&DataType::Float64)?;
    Ok(floats
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Non-null values of a numeric Series.
pub fn non_null_values(series: &Series) -> PolarsResult<Vec<f64>> {
    Ok(numeric_values(series)?.into_iter().flatten().collect())
}

/// Calculate the mode (most frequent value) of a Series as a string.
///
/// Ties resolve to the lexicographically smallest value so the result does
/// not depend on hash iteration order.
pub fn string_mode(series: &Series) -> Option<String> {
    let non_null = series.drop_nulls();
    if non_null.is_empty() {
        return None;
    }

    let str_series = non_null.cast(&DataType::String).ok()?;
    let str_chunked = str_series.str().ok()?;

    let mut value_counts: HashMap<&str, usize> = HashMap::new();
    for val in str_chunked.into_iter().flatten() {
        *value_counts.entry(val).or_insert(0) += 1;
    }

    value_counts
        .into_iter()
        .max_by(|(a_val, a_count), (b_val, b_count)| {
            a_count.cmp(b_count).then_with(|| b_val.cmp(a_val))
        })
        .map(|(val, _)| val.to_string())
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill null values in a numeric Series with a specific value.
///
/// The result is always Float64.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let values: Vec<Option<f64>> = numeric_values(series)?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Fill null values in a string Series with a specific value.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let as_str = series.cast(&DataType::String)?;
    let values: Vec<Option<String>> = as_str
        .str()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value).to_string()))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

// =============================================================================
// Statistics
// =============================================================================

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median of the values, `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Sample standard deviation (n - 1 denominator).
///
/// `None` when fewer than two values are present.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Quantile with linear interpolation between closest ranks.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

// =============================================================================
// Tests
// =============================================================================
