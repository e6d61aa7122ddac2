//! Leave-one-out cross-validation splits

use crate::error::{LooError, Result};
use serde::{Deserialize, Serialize};

/// A single train/test split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Leave-one-out splitter: fold `i` holds out row `i` and trains on the rest
#[derive(Debug, Clone, Copy, Default)]
pub struct LeaveOneOut;

impl LeaveOneOut {
    pub fn new() -> Self {
        Self
    }

    /// Number of folds for `n_samples` rows
    pub fn n_splits(&self, n_samples: usize) -> usize {
        n_samples
    }

    /// Generate train/test splits
    pub fn split(&self, n_samples: usize) -> Result<Vec<CVSplit>> {
        if n_samples < 2 {
            return Err(LooError::ValidationError(format!(
                "leave-one-out needs at least 2 samples, got {}",
                n_samples
            )));
        }

        Ok((0..n_samples)
            .map(|i| CVSplit {
                train_indices: (0..n_samples).filter(|&j| j != i).collect(),
                test_indices: vec![i],
                fold_idx: i,
            })
            .collect())
    }
}

/// Cross-validation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Standard deviation of scores
    pub std_score: f64,
    /// Number of folds
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        if n_folds == 0 {
            return Self { scores, mean_score: f64::NAN, std_score: f64::NAN, n_folds };
        }
        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds as f64;

        Self {
            scores,
            mean_score,
            std_score: variance.sqrt(),
            n_folds,
        }
    }
}
