//! Feature preprocessing for the regression model.
//!
//! A [`FeaturePreprocessor`] is fitted on the training table and turns any
//! table with the same columns into a dense design matrix:
//!
//! - numeric columns: nulls replaced by the training mean
//! - categorical columns: nulls replaced by the training mode, then one
//!   indicator per training category; unseen categories encode as all zeros
//!
//! Columns of any other kind are ignored with a warning.

use crate::error::{LearningError, Result};
use estate_processing::features::{categories, indicator_columns};
use estate_processing::utils::{column_kind, fill_string_nulls, mean, numeric_values, string_mode};
use estate_processing::ColumnKind;
use nalgebra::DMatrix;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How a single source column is encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnEncoding {
    /// One feature; nulls become `fill`.
    Numeric { column: String, fill: f64 },
    /// One indicator feature per category; nulls become `fill` first.
    OneHot {
        column: String,
        fill: String,
        categories: Vec<String>,
    },
}

impl ColumnEncoding {
    pub fn column(&self) -> &str {
        match self {
            Self::Numeric { column, .. } | Self::OneHot { column, .. } => column,
        }
    }

    /// Number of features this column expands to.
    pub fn width(&self) -> usize {
        match self {
            Self::Numeric { .. } => 1,
            Self::OneHot { categories, .. } => categories.len(),
        }
    }

    fn feature_names(&self) -> Vec<String> {
        match self {
            Self::Numeric { column, .. } => vec![column.clone()],
            Self::OneHot {
                column, categories, ..
            } => categories
                .iter()
                .map(|c| format!("{}_{}", column, c))
                .collect(),
        }
    }

    /// Encoded values of this column, one `Vec` per feature.
    fn encode(&self, series: &Series) -> Result<Vec<Vec<f64>>> {
        match self {
            Self::Numeric { fill, .. } => {
                let values = numeric_values(series)?
                    .into_iter()
                    .map(|v| v.unwrap_or(*fill))
                    .collect();
                Ok(vec![values])
            }
            Self::OneHot {
                fill, categories, ..
            } => {
                let filled = fill_string_nulls(series, fill)?;
                let mut features = Vec::with_capacity(categories.len());
                for col in indicator_columns(&filled, categories)? {
                    let values = numeric_values(col.as_materialized_series())?;
                    features.push(values.into_iter().map(|v| v.unwrap_or(0.0)).collect());
                }
                Ok(features)
            }
        }
    }
}

/// Fitted imputation and encoding for every feature column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePreprocessor {
    encodings: Vec<ColumnEncoding>,
    ignored: Vec<String>,
}

impl FeaturePreprocessor {
    /// Fit on every column of `df` except `target`.
    ///
    /// Fails with a training error if no usable feature column remains.
    pub fn fit(df: &DataFrame, target: &str) -> Result<Self> {
        let mut encodings = Vec::new();
        let mut ignored = Vec::new();

        for col in df.get_columns() {
            let name = col.name().to_string();
            if name == target {
                continue;
            }
            let series = col.as_materialized_series();

            let encoding = match column_kind(col.dtype()) {
                ColumnKind::Numeric => {
                    let present: Vec<f64> = numeric_values(series)?.into_iter().flatten().collect();
                    mean(&present).map(|fill| ColumnEncoding::Numeric {
                        column: name.clone(),
                        fill,
                    })
                }
                ColumnKind::Categorical => string_mode(series)
                    .map(|fill| {
                        let filled = fill_string_nulls(series, &fill)?;
                        Ok::<_, LearningError>(ColumnEncoding::OneHot {
                            column: name.clone(),
                            fill,
                            categories: categories(&filled)?,
                        })
                    })
                    .transpose()?,
                ColumnKind::Other => None,
            };

            match encoding {
                Some(encoding) => {
                    debug!("Feature '{}' -> {} columns", name, encoding.width());
                    encodings.push(encoding);
                }
                None => {
                    warn!(
                        "Ignoring column '{}' (dtype {}, {} nulls): no usable values",
                        name,
                        col.dtype(),
                        col.null_count()
                    );
                    ignored.push(name);
                }
            }
        }

        if encodings.is_empty() {
            return Err(LearningError::training(format!(
                "No usable feature columns besides target '{}'",
                target
            )));
        }

        Ok(Self { encodings, ignored })
    }

    pub fn encodings(&self) -> &[ColumnEncoding] {
        &self.encodings
    }

    /// Columns seen at fit time but not used as features.
    pub fn ignored_columns(&self) -> &[String] {
        &self.ignored
    }

    /// Source columns, in encoding order.
    pub fn source_columns(&self) -> Vec<String> {
        self.encodings.iter().map(|e| e.column().to_string()).collect()
    }

    /// Names of the encoded features, in matrix column order.
    pub fn feature_names(&self) -> Vec<String> {
        self.encodings
            .iter()
            .flat_map(ColumnEncoding::feature_names)
            .collect()
    }

    /// Total number of encoded features.
    pub fn n_features(&self) -> usize {
        self.encodings.iter().map(ColumnEncoding::width).sum()
    }

    /// Encode `df` into a `height x n_features` matrix.
    ///
    /// Extra columns are ignored. A missing source column is a config error.
    pub fn transform(&self, df: &DataFrame) -> Result<DMatrix<f64>> {
        let n_rows = df.height();
        let mut features: Vec<Vec<f64>> = Vec::with_capacity(self.n_features());

        for encoding in &self.encodings {
            let column = df
                .column(encoding.column())
                .map_err(|_| LearningError::ColumnNotFound(encoding.column().to_string()))?;
            features.extend(encoding.encode(column.as_materialized_series())?);
        }

        Ok(DMatrix::from_fn(n_rows, features.len(), |row, col| {
            features[col][row]
        }))
    }
}
