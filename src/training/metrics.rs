//! Regression metrics over held-out predictions

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Summary of prediction quality
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// R-squared, `None` when the target is constant
    pub r2: Option<f64>,
    pub n_samples: usize,
}

impl RegressionMetrics {
    /// Compute regression metrics
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let n_samples = y_true.len();
        if n_samples == 0 {
            return Self::default();
        }
        let n = n_samples as f64;

        let errors: Vec<f64> = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| t - p)
            .collect();

        let mse = errors.iter().map(|e| e * e).sum::<f64>() / n;
        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        let mean = y_true.sum() / n;
        let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
        let ss_res: f64 = errors.iter().map(|e| e * e).sum();
        let r2 = if ss_tot > 0.0 { Some(1.0 - ss_res / ss_tot) } else { None };

        Self {
            mse,
            rmse: mse.sqrt(),
            mae,
            r2,
            n_samples,
        }
    }
}
