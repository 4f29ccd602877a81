//! Column transforms used by the feature engineer.
//!
//! Every function takes the dataset by reference and returns a new one.
//! Numeric transforms fail with a config error on a missing or non-numeric
//! column; one-hot encoding fails on a missing or non-categorical column.

use crate::error::{ProcessingError, Result};
use crate::types::ColumnKind;
use crate::utils::{column_names, ensure_columns_exist, kind_of, mean, numeric_values};
use polars::prelude::*;
use std::collections::{BTreeSet, HashSet};

fn require_numeric(df: &DataFrame, columns: &[String]) -> Result<()> {
    ensure_columns_exist(df, columns)?;
    for name in columns {
        if kind_of(df, name)? != ColumnKind::Numeric {
            let dtype = df.column(name)?.dtype().clone();
            return Err(ProcessingError::non_numeric(name.as_str(), dtype));
        }
    }
    Ok(())
}

/// Replace each column's values with `f(value)`, keeping nulls.
fn map_columns<F>(df: &DataFrame, columns: &[String], f: F) -> Result<DataFrame>
where
    F: Fn(&[Option<f64>]) -> Vec<Option<f64>>,
{
    let mut out = df.clone();
    for name in columns {
        let values = numeric_values(df.column(name)?.as_materialized_series())?;
        let mapped = f(&values);
        out.replace(name, Series::new(name.as_str().into(), mapped))?;
    }
    Ok(out)
}

/// Replace each column with `ln(1 + x)`.
///
/// Values at or below -1 have no log1p and become null.
pub fn log_transform(df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
    require_numeric(df, columns)?;
    map_columns(df, columns, |values| {
        values
            .iter()
            .map(|v| v.and_then(|x| if x > -1.0 { Some(x.ln_1p()) } else { None }))
            .collect()
    })
}

/// Inverse of [`log_transform`]: `exp(x) - 1`.
pub fn inverse_log_transform(df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
    require_numeric(df, columns)?;
    map_columns(df, columns, |values| {
        values.iter().map(|v| v.map(f64::exp_m1)).collect()
    })
}

/// Standardize to zero mean and unit (population) standard deviation.
///
/// A constant column becomes all zeros.
pub fn standard_scale(df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
    require_numeric(df, columns)?;
    map_columns(df, columns, |values| {
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let Some(m) = mean(&present) else {
            return values.to_vec();
        };
        let var = present.iter().map(|x| (x - m).powi(2)).sum::<f64>() / present.len() as f64;
        let std = var.sqrt();
        let scale = if std > 0.0 { std } else { 1.0 };
        values.iter().map(|v| v.map(|x| (x - m) / scale)).collect()
    })
}

/// Rescale linearly so the observed range maps onto `[min, max]`.
///
/// A constant column maps to `min`.
pub fn min_max_scale(df: &DataFrame, columns: &[String], min: f64, max: f64) -> Result<DataFrame> {
    if !(min.is_finite() && max.is_finite() && min < max) {
        return Err(ProcessingError::InvalidConfig(format!(
            "Invalid scaling range [{}, {}]",
            min, max
        )));
    }
    require_numeric(df, columns)?;
    map_columns(df, columns, |values| {
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let lo = present.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = hi - lo;
        values
            .iter()
            .map(|v| {
                v.map(|x| {
                    if range > 0.0 {
                        min + (x - lo) / range * (max - min)
                    } else {
                        min
                    }
                })
            })
            .collect()
    })
}

/// Sorted distinct non-null values of a column, as strings.
pub fn categories(series: &Series) -> PolarsResult<Vec<String>> {
    let as_str = series.cast(&DataType::String)?;
    let set: BTreeSet<String> = as_str
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
    Ok(set.into_iter().collect())
}

/// Indicator columns for `categories`, one per category, named `<column>_<value>`.
///
/// Values outside `categories` and nulls produce all zeros.
pub fn indicator_columns(series: &Series, categories: &[String]) -> PolarsResult<Vec<Column>> {
    let as_str = series.cast(&DataType::String)?;
    let ca = as_str.str()?;
    let name = series.name();

    Ok(categories
        .iter()
        .map(|category| {
            let values: Vec<f64> = ca
                .into_iter()
                .map(|v| if v == Some(category.as_str()) { 1.0 } else { 0.0 })
                .collect();
            Column::from(Series::new(format!("{}_{}", name, category).into(), values))
        })
        .collect())
}

/// Replace categorical columns with drop-first indicator columns.
///
/// The first category in sorted order is the baseline and gets no column.
/// New columns are Float64 and appended after the remaining columns. A
/// generated name that is already taken is a config error.
pub fn one_hot_encode(df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
    ensure_columns_exist(df, columns)?;
    for name in columns {
        if kind_of(df, name)? != ColumnKind::Categorical {
            return Err(ProcessingError::InvalidConfig(format!(
                "Column '{}' is not categorical and cannot be one-hot encoded",
                name
            )));
        }
    }

    let mut encoded = Vec::new();
    for name in columns {
        let series = df.column(name)?.as_materialized_series();
        let cats = categories(series)?;
        let kept = cats.get(1..).unwrap_or(&[]);
        encoded.extend(indicator_columns(series, kept)?);
    }

    let mut out = df.drop_many(columns.iter().map(String::as_str));
    let mut taken: HashSet<String> = column_names(&out).into_iter().collect();
    for col in &encoded {
        if !taken.insert(col.name().to_string()) {
            return Err(ProcessingError::InvalidConfig(format!(
                "One-hot column '{}' already exists",
                col.name()
            )));
        }
    }
    for col in encoded {
        out.with_column(col)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    // ========================================================================
    // log transform
    // ========================================================================

    #[test]
    fn test_log_transform_values() {
        let df = df!["SalePrice" => [0.0, 1.0, 99.0], "Id" => [1, 2, 3]].unwrap();
        let out = log_transform(&df, &cols(&["SalePrice"])).unwrap();

        let v = values(&out, "SalePrice");
        assert_eq!(v[0], Some(0.0));
        assert!((v[1].unwrap() - 2f64.ln()).abs() < 1e-12);
        assert!((v[2].unwrap() - 100f64.ln()).abs() < 1e-12);
        // Other columns untouched, input untouched
        assert_eq!(out.column("Id").unwrap().dtype(), &DataType::Int32);
        assert_eq!(values(&df, "SalePrice")[2], Some(99.0));
    }

    #[test]
    fn test_log_transform_undefined_becomes_null() {
        let df = df!["x" => [Some(-1.0), Some(-5.0), None, Some(3.0)]].unwrap();
        let out = log_transform(&df, &cols(&["x"])).unwrap();
        let v = values(&out, "x");
        assert_eq!(&v[..3], &[None, None, None]);
        assert!(v[3].is_some());
        assert_eq!(out.height(), 4);
    }

    #[test]
    fn test_log_round_trip() {
        let original = [0.5, 1.0, 1234.5, 215000.0, 1e-9];
        let df = df!["x" => original].unwrap();
        let back = inverse_log_transform(&log_transform(&df, &cols(&["x"])).unwrap(), &cols(&["x"]))
            .unwrap();

        for (a, b) in original.iter().zip(values(&back, "x")) {
            let b = b.unwrap();
            assert!((a - b).abs() <= 1e-9 * a.abs().max(1.0), "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_log_transform_errors() {
        let df = df!["x" => [1.0], "s" => ["a"]].unwrap();
        assert!(matches!(
            log_transform(&df, &cols(&["missing"])),
            Err(ProcessingError::ColumnNotFound(_))
        ));
        assert!(matches!(
            log_transform(&df, &cols(&["s"])),
            Err(ProcessingError::NonNumericColumn { .. })
        ));
    }

    // ========================================================================
    // scaling
    // ========================================================================

    #[test]
    fn test_standard_scale() {
        let df = df!["x" => [1.0, 2.0, 3.0], "c" => [5.0, 5.0, 5.0]].unwrap();
        let out = standard_scale(&df, &cols(&["x", "c"])).unwrap();

        let x = values(&out, "x");
        let sd = (2.0f64 / 3.0).sqrt();
        assert!((x[0].unwrap() + 1.0 / sd).abs() < 1e-12);
        assert_eq!(x[1], Some(0.0));
        assert_eq!(values(&out, "c"), vec![Some(0.0); 3]);
    }

    #[test]
    fn test_min_max_scale() {
        let df = df!["x" => [Some(10.0), None, Some(20.0), Some(15.0)]].unwrap();
        let out = min_max_scale(&df, &cols(&["x"]), 0.0, 1.0).unwrap();
        assert_eq!(values(&out, "x"), vec![Some(0.0), None, Some(1.0), Some(0.5)]);

        let constant = df!["x" => [3.0, 3.0]].unwrap();
        let out = min_max_scale(&constant, &cols(&["x"]), -1.0, 1.0).unwrap();
        assert_eq!(values(&out, "x"), vec![Some(-1.0), Some(-1.0)]);

        assert!(min_max_scale(&df, &cols(&["x"]), 1.0, 0.0).is_err());
    }

    // ========================================================================
    // one-hot encoding
    // ========================================================================

    #[test]
    fn test_one_hot_drop_first() {
        let df = df![
            "Neighborhood" => [Some("NAmes"), Some("CollgCr"), None, Some("OldTown"), Some("NAmes")],
            "SalePrice" => [1.0, 2.0, 3.0, 4.0, 5.0],
        ]
        .unwrap();
        let out = one_hot_encode(&df, &cols(&["Neighborhood"])).unwrap();

        assert_eq!(
            out.get_column_names()
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>(),
            vec!["SalePrice", "Neighborhood_NAmes", "Neighborhood_OldTown"]
        );
        assert_eq!(
            values(&out, "Neighborhood_NAmes"),
            vec![Some(1.0), Some(0.0), Some(0.0), Some(0.0), Some(1.0)]
        );
        assert_eq!(
            values(&out, "Neighborhood_OldTown"),
            vec![Some(0.0), Some(0.0), Some(0.0), Some(1.0), Some(0.0)]
        );
    }

    #[test]
    fn test_one_hot_rejects_numeric() {
        let df = df!["x" => [1.0, 2.0]].unwrap();
        assert!(matches!(
            one_hot_encode(&df, &cols(&["x"])),
            Err(ProcessingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_one_hot_rejects_name_collision() {
        let df = df![
            "Street" => ["Grvl", "Pave", "Pave"],
            "Street_Pave" => [0.0, 5.0, 5.0],
        ]
        .unwrap();
        let err = one_hot_encode(&df, &cols(&["Street"])).unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidConfig(ref m) if m.contains("Street_Pave")));

        // Two encoded columns producing the same indicator name
        let df = df![
            "A" => ["a", "b_c"],
            "A_b" => ["a", "c"],
        ]
        .unwrap();
        let err = one_hot_encode(&df, &cols(&["A", "A_b"])).unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidConfig(ref m) if m.contains("A_b_c")));
    }

    #[test]
    fn test_indicator_columns_unknown_values_are_zero() {
        let series = Series::new("Street".into(), &["Grvl", "Pave", "Dirt"]);
        let cols = indicator_columns(&series, &["Pave".to_string()]).unwrap();
        assert_eq!(cols.len(), 1);
        assert_eq!(cols[0].name().as_str(), "Street_Pave");
        let v: Vec<_> = cols[0]
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(v, vec![Some(0.0), Some(1.0), Some(0.0)]);
    }
}
