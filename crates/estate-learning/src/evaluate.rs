//! Model evaluation on a held-out set.

use crate::error::{LearningError, Result};
use crate::model::{FittedModel, target_values};
use crate::types::EvaluationReport;
use polars::prelude::DataFrame;
use tracing::info;

/// Scores a fitted model on an evaluation table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    /// Predict on `test` and compute MSE, RMSE, MAE and R².
    ///
    /// # Errors
    ///
    /// Config errors if `test` is empty, the target column is missing or
    /// unusable, or a feature column is missing.
    pub fn evaluate(model: &FittedModel, test: &DataFrame) -> Result<EvaluationReport> {
        if test.height() == 0 {
            return Err(LearningError::InvalidData(
                "Evaluation set is empty".to_string(),
            ));
        }
        let actual = target_values(test, model.target_column())?;
        let predicted = model.predict(test)?;
        let report = regression_report(&actual, &predicted);

        info!(
            "Evaluated on {} rows: MSE {:.6}, RMSE {:.6}, MAE {:.6}, R² {:.4}",
            report.n_samples, report.mse, report.rmse, report.mae, report.r2
        );
        Ok(report)
    }
}

/// Regression metrics for paired actual and predicted values.
///
/// With zero variance in `actual`, R² is 1.0 for a perfect prediction and
/// 0.0 otherwise.
pub fn regression_report(actual: &[f64], predicted: &[f64]) -> EvaluationReport {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return EvaluationReport {
            mse: 0.0,
            rmse: 0.0,
            mae: 0.0,
            r2: 0.0,
            n_samples: 0,
        };
    }
    let actual = &actual[..n];
    let predicted = &predicted[..n];
    let count = n as f64;

    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    let abs_err: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()).sum();

    let mean = actual.iter().sum::<f64>() / count;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();

    let mse = ss_res / count;
    let r2 = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    };

    EvaluationReport {
        mse,
        rmse: mse.sqrt(),
        mae: abs_err / count,
        r2,
        n_samples: n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelBuilder;
    use polars::prelude::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_regression_report_values() {
        let report = regression_report(&[3.0, -0.5, 2.0, 7.0], &[2.5, 0.0, 2.0, 8.0]);
        assert_close(report.mse, 0.375);
        assert_close(report.rmse, 0.375f64.sqrt());
        assert_close(report.mae, 0.5);
        assert_close(report.r2, 0.948_608_137_044_967_9);
        assert_eq!(report.n_samples, 4);
    }

    #[test]
    fn test_zero_variance_target() {
        assert_eq!(regression_report(&[5.0, 5.0], &[5.0, 5.0]).r2, 1.0);
        assert_eq!(regression_report(&[5.0, 5.0], &[4.0, 6.0]).r2, 0.0);
    }

    #[test]
    fn test_evaluate_perfect_fit() {
        let train = df![
            "Lot Area" => [1.0, 2.0, 3.0, 4.0],
            "SalePrice" => [3.0, 5.0, 7.0, 9.0],
        ]
        .unwrap();
        let test = df![
            "Lot Area" => [5.0, 6.0],
            "SalePrice" => [11.0, 13.0],
        ]
        .unwrap();
        let model = ModelBuilder::new("SalePrice").fit(&train).unwrap();
        let report = Evaluator::evaluate(&model, &test).unwrap();
        assert!(report.mse < 1e-12);
        assert!((report.r2 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_evaluate_errors_are_config_errors() {
        let train = df!["Lot Area" => [1.0, 2.0, 3.0], "SalePrice" => [1.0, 2.0, 3.0]].unwrap();
        let model = ModelBuilder::new("SalePrice").fit(&train).unwrap();

        let empty = train.head(Some(0));
        let err = Evaluator::evaluate(&model, &empty).unwrap_err();
        assert!(matches!(err, LearningError::InvalidData(_)));

        let no_target = df!["Lot Area" => [1.0]].unwrap();
        let err = Evaluator::evaluate(&model, &no_target).unwrap_err();
        assert!(matches!(err, LearningError::ColumnNotFound(ref c) if c == "SalePrice"));

        let no_feature = df!["SalePrice" => [1.0]].unwrap();
        let err = Evaluator::evaluate(&model, &no_feature).unwrap_err();
        assert!(matches!(err, LearningError::ColumnNotFound(ref c) if c == "Lot Area"));
        assert!(err.is_config_error());
    }
}
