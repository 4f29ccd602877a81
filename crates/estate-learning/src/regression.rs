//! Ordinary least squares with intercept.
//!
//! Features and target are centred, the centred system is solved with an
//! SVD (minimum-norm solution, so collinear one-hot blocks are fine) and the
//! intercept is recovered from the column means.

use crate::error::{LearningError, Result};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

/// Intercept and coefficients of a fitted linear model.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearFit {
    /// Predict one value per row of `x`.
    ///
    /// `x` must have one column per coefficient.
    pub fn predict(&self, x: &DMatrix<f64>) -> Vec<f64> {
        let beta = DVector::from_column_slice(&self.coefficients);
        (x * beta).iter().map(|v| v + self.intercept).collect()
    }
}

/// Fit `y ≈ intercept + x · coefficients` by least squares.
pub fn fit_least_squares(x: &DMatrix<f64>, y: &[f64]) -> Result<LinearFit> {
    let (n_rows, n_cols) = x.shape();
    if n_rows == 0 {
        return Err(LearningError::training("Training set is empty"));
    }
    if n_rows != y.len() {
        return Err(LearningError::training(format!(
            "Feature matrix has {} rows but target has {}",
            n_rows,
            y.len()
        )));
    }
    if n_cols == 0 {
        return Err(LearningError::training("No feature columns"));
    }

    let x_means: Vec<f64> = x.column_iter().map(|c| c.mean()).collect();
    let y_mean = y.iter().sum::<f64>() / n_rows as f64;

    let centred_x = DMatrix::from_fn(n_rows, n_cols, |r, c| x[(r, c)] - x_means[c]);
    let centred_y = DVector::from_iterator(n_rows, y.iter().map(|v| v - y_mean));

    let svd = centred_x.svd(true, true);
    let max_singular = svd.singular_values.max();
    // Cut-off for treating singular values as zero, as in LAPACK gelsd
    let tolerance = f64::EPSILON * n_rows.max(n_cols) as f64 * max_singular;
    debug!(
        "SVD: {} x {}, largest singular value {:.3e}, tolerance {:.3e}",
        n_rows, n_cols, max_singular, tolerance
    );

    let beta = svd
        .solve(&centred_y, tolerance)
        .map_err(|e| LearningError::training(format!("Least squares solve failed: {}", e)))?;

    let coefficients: Vec<f64> = beta.iter().copied().collect();
    let intercept = y_mean
        - coefficients
            .iter()
            .zip(&x_means)
            .map(|(b, m)| b * m)
            .sum::<f64>();

    if !intercept.is_finite() || coefficients.iter().any(|b| !b.is_finite()) {
        return Err(LearningError::training(
            "Least squares solution is not finite",
        ));
    }

    Ok(LinearFit {
        intercept,
        coefficients,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-8, "{} != {}", a, b);
    }

    #[test]
    fn test_recovers_exact_coefficients() {
        // y = 3 + 2 a - 0.5 b
        let rows = [(1.0, 4.0), (2.0, 1.0), (3.0, 7.0), (4.0, 2.0), (5.0, 9.0)];
        let x = DMatrix::from_fn(rows.len(), 2, |r, c| if c == 0 { rows[r].0 } else { rows[r].1 });
        let y: Vec<f64> = rows.iter().map(|(a, b)| 3.0 + 2.0 * a - 0.5 * b).collect();

        let fit = fit_least_squares(&x, &y).unwrap();
        assert_close(fit.intercept, 3.0);
        assert_close(fit.coefficients[0], 2.0);
        assert_close(fit.coefficients[1], -0.5);

        for (p, t) in fit.predict(&x).iter().zip(&y) {
            assert_close(*p, *t);
        }
    }

    #[test]
    fn test_collinear_columns_use_minimum_norm() {
        // Second column duplicates the first, so the weight is split evenly
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0]);
        let y = [2.0, 4.0, 6.0, 8.0];

        let fit = fit_least_squares(&x, &y).unwrap();
        assert_close(fit.coefficients[0], 1.0);
        assert_close(fit.coefficients[1], 1.0);
        assert_close(fit.intercept, 0.0);
    }

    #[test]
    fn test_constant_feature_predicts_mean() {
        let x = DMatrix::from_element(3, 1, 7.0);
        let fit = fit_least_squares(&x, &[1.0, 2.0, 3.0]).unwrap();
        assert_close(fit.coefficients[0], 0.0);
        assert_close(fit.intercept, 2.0);
    }

    #[test]
    fn test_empty_training_set() {
        let x = DMatrix::<f64>::zeros(0, 2);
        let err = fit_least_squares(&x, &[]).unwrap_err();
        assert!(matches!(err, LearningError::TrainingFailed(_)));
    }

    #[test]
    fn test_non_finite_target() {
        let x = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
        let err = fit_least_squares(&x, &[1.0, f64::INFINITY]).unwrap_err();
        assert!(matches!(err, LearningError::TrainingFailed(_)));
    }
}
