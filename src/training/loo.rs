//! Leave-one-out evaluation of the boosted regressor

use super::config::HyperparameterConfig;
use super::cross_validation::{CVResults, LeaveOneOut};
use super::dataset::Dataset;
use super::lightgbm::LightGBMRegressor;
use super::metrics::RegressionMetrics;
use crate::error::{LooError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Output of one leave-one-out run. Every per-fold vector is indexed by the held-out row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// RMSE of each single-row prediction
    pub fold_errors: Vec<f64>,
    /// Importance vector of each fold's model
    pub feature_importances: Vec<Array1<f64>>,
    pub predicted: Array1<f64>,
    pub actual: Array1<f64>,
    pub feature_names: Vec<String>,
    /// Arithmetic mean of `fold_errors`
    pub mean_rmse: f64,
}

impl EvaluationResult {
    pub fn n_folds(&self) -> usize {
        self.fold_errors.len()
    }

    /// Feature importances averaged over folds
    pub fn mean_feature_importances(&self) -> Array1<f64> {
        let n_features = self.feature_names.len();
        if self.feature_importances.is_empty() {
            return Array1::zeros(n_features);
        }
        let mut sum = Array1::zeros(n_features);
        for fi in &self.feature_importances {
            sum += fi;
        }
        sum / self.feature_importances.len() as f64
    }

    /// `(actual - predicted) / n` per sample, as drawn on the residual plot
    pub fn normalized_residuals(&self) -> Vec<f64> {
        normalized_residuals(&self.actual, &self.predicted)
    }

    pub fn metrics(&self) -> RegressionMetrics {
        RegressionMetrics::compute(&self.actual, &self.predicted)
    }

    pub fn cv_results(&self) -> CVResults {
        CVResults::from_scores(self.fold_errors.clone())
    }
}

/// Residuals divided by the sample count, not by their standard deviation
pub fn normalized_residuals(actual: &Array1<f64>, predicted: &Array1<f64>) -> Vec<f64> {
    let n = actual.len() as f64;
    actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p) / n)
        .collect()
}

/// Fits one fresh model per held-out row
#[derive(Debug, Clone)]
pub struct LooEvaluator {
    config: HyperparameterConfig,
    progress: bool,
}

impl LooEvaluator {
    pub fn new(config: HyperparameterConfig) -> Self {
        Self { config, progress: false }
    }

    /// Print the fold index to stdout as each fold is trained
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &HyperparameterConfig {
        &self.config
    }

    /// Run every fold, printing progress to stdout when enabled
    pub fn evaluate(&self, dataset: &Dataset) -> Result<EvaluationResult> {
        self.evaluate_with_output(dataset, &mut std::io::stdout())
    }

    /// Run every fold, writing progress to `out` when enabled
    pub fn evaluate_with_output<W: Write>(&self, dataset: &Dataset, out: &mut W) -> Result<EvaluationResult> {
        self.config.validate()?;
        let splits = LeaveOneOut::new().split(dataset.n_samples())?;
        let model_config = self.config.to_lightgbm_config();

        let n = splits.len();
        let mut fold_errors = Vec::with_capacity(n);
        let mut feature_importances = Vec::with_capacity(n);
        let mut predicted = Array1::zeros(n);

        if self.progress {
            writeln!(out, "Training Fold: ")?;
        }

        for split in &splits {
            if self.progress {
                write!(out, "{} ", split.fold_idx)?;
                out.flush()?;
            }

            let (x_train, y_train) = dataset.select(&split.train_indices);
            let (x_test, y_test) = dataset.select(&split.test_indices);

            let mut model = LightGBMRegressor::new(model_config.clone());
            model.fit(&x_train, &y_train)?;
            let y_pred = model.predict(&x_test)?;

            let error = self.config.metric.compute(
                y_test.as_slice().unwrap_or(&[]),
                y_pred.as_slice().unwrap_or(&[]),
            );
            let importances = model
                .feature_importances()
                .cloned()
                .ok_or(LooError::ModelNotFitted)?;

            tracing::debug!(fold = split.fold_idx, error, "Fold evaluated");

            fold_errors.push(error);
            feature_importances.push(importances);
            predicted[split.fold_idx] = y_pred[0];
        }

        if self.progress {
            writeln!(out)?;
        }

        let mean_rmse = fold_errors.iter().sum::<f64>() / n as f64;

        Ok(EvaluationResult {
            fold_errors,
            feature_importances,
            predicted,
            actual: dataset.target().clone(),
            feature_names: dataset.feature_names().to_vec(),
            mean_rmse,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    fn small_dataset(n: usize) -> Dataset {
        let x = Array2::from_shape_fn((n, 2), |(r, c)| (r * (c + 1)) as f64 + 0.5 * c as f64);
        let y = Array1::from_shape_fn(n, |r| 1.5 * r as f64 + 1.0);
        Dataset::new(vec!["a".into(), "b".into()], "y", x, y).unwrap()
    }

    fn quick_config() -> HyperparameterConfig {
        HyperparameterConfig::new()
            .with_n_estimators(20)
            .with_num_leaves(4)
            .with_min_child_samples(2)
    }

    #[test]
    fn test_progress_lists_every_fold() {
        let ds = small_dataset(3);
        let mut out = Vec::new();
        LooEvaluator::new(quick_config())
            .with_progress(true)
            .evaluate_with_output(&ds, &mut out)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Training Fold: \n0 1 2 \n");
    }

    #[test]
    fn test_progress_disabled_writes_nothing() {
        let ds = small_dataset(3);
        let mut out = Vec::new();
        LooEvaluator::new(quick_config()).evaluate_with_output(&ds, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_one_result_per_row() {
        let ds = small_dataset(8);
        let result = LooEvaluator::new(quick_config()).evaluate(&ds).unwrap();
        assert_eq!(result.n_folds(), 8);
        assert_eq!(result.fold_errors.len(), 8);
        assert_eq!(result.feature_importances.len(), 8);
        assert!(result.feature_importances.iter().all(|fi| fi.len() == 2));
        assert_eq!(result.predicted.len(), 8);
    }

    #[test]
    fn test_mean_rmse_is_mean_of_folds() {
        let ds = small_dataset(6);
        let result = LooEvaluator::new(quick_config()).evaluate(&ds).unwrap();
        let mean = result.fold_errors.iter().sum::<f64>() / 6.0;
        assert_abs_diff_eq!(result.mean_rmse, mean, epsilon = 1e-12);
        assert_abs_diff_eq!(result.cv_results().mean_score, mean, epsilon = 1e-12);
    }

    #[test]
    fn test_fold_error_is_absolute_error() {
        let ds = small_dataset(6);
        let result = LooEvaluator::new(quick_config()).evaluate(&ds).unwrap();
        for i in 0..6 {
            assert_abs_diff_eq!(
                result.fold_errors[i],
                (result.actual[i] - result.predicted[i]).abs(),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_held_out_row_is_unseen() {
        // Three rows and min_child_samples 2: every fold's model is a single leaf equal
        // to the mean of the two training rows, so each prediction reveals its training set.
        let x = Array2::from_shape_vec((3, 2), vec![0.0, 1.0, 1.0, 0.0, 2.0, 2.0]).unwrap();
        let y = Array1::from_vec(vec![3.0, 6.0, 12.0]);
        let ds = Dataset::new(vec!["f1".into(), "f2".into()], "y", x, y).unwrap();

        let result = LooEvaluator::new(quick_config()).evaluate(&ds).unwrap();
        assert_abs_diff_eq!(result.predicted[0], 9.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.predicted[1], 7.5, epsilon = 1e-9);
        assert_abs_diff_eq!(result.predicted[2], 4.5, epsilon = 1e-9);
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let ds = small_dataset(7);
        let evaluator = LooEvaluator::new(quick_config());
        let a = evaluator.evaluate(&ds).unwrap();
        let b = evaluator.evaluate(&ds).unwrap();
        assert_eq!(a.mean_rmse, b.mean_rmse);
        assert_eq!(a.predicted, b.predicted);
    }

    #[test]
    fn test_single_row_is_rejected() {
        let ds = small_dataset(1);
        let err = LooEvaluator::new(quick_config()).evaluate(&ds);
        assert!(matches!(err, Err(LooError::ValidationError(_))));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let ds = small_dataset(4);
        let err = LooEvaluator::new(quick_config().with_num_leaves(1)).evaluate(&ds);
        assert!(matches!(err, Err(LooError::InvalidParameter { .. })));
    }

    #[test]
    fn test_normalized_residuals_divide_by_n() {
        let actual = Array1::from_vec(vec![1.0, 2.0, 3.0]);
        let predicted = Array1::from_vec(vec![1.2, 1.8, 3.1]);
        let residuals = normalized_residuals(&actual, &predicted);
        assert_abs_diff_eq!(residuals[0], -0.0667, epsilon = 1e-4);
        assert_abs_diff_eq!(residuals[1], 0.0667, epsilon = 1e-4);
        assert_abs_diff_eq!(residuals[2], -0.0333, epsilon = 1e-4);
    }

    #[test]
    fn test_mean_feature_importances() {
        let result = EvaluationResult {
            fold_errors: vec![0.0, 0.0],
            feature_importances: vec![Array1::from_vec(vec![2.0, 0.0]), Array1::from_vec(vec![4.0, 1.0])],
            predicted: Array1::zeros(2),
            actual: Array1::zeros(2),
            feature_names: vec!["a".into(), "b".into()],
            mean_rmse: 0.0,
        };
        assert_eq!(result.mean_feature_importances().to_vec(), vec![3.0, 0.5]);
    }
}
