//! Hyperparameter configuration for the boosted regressor

use crate::error::{LooError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::lightgbm::{ImportanceType, LightGBMConfig};

/// Training objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Squared-error regression
    #[default]
    Regression,
}

/// Metric used to score held-out predictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Rmse,
    Mae,
}

impl Metric {
    /// Score predictions against targets
    pub fn compute(&self, y_true: &[f64], y_pred: &[f64]) -> f64 {
        let n = y_true.len().max(1) as f64;
        match self {
            Metric::Rmse => {
                let mse: f64 = y_true
                    .iter()
                    .zip(y_pred)
                    .map(|(t, p)| (t - p).powi(2))
                    .sum::<f64>()
                    / n;
                mse.sqrt()
            }
            Metric::Mae => {
                y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()).sum::<f64>() / n
            }
        }
    }
}

/// Boosting algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoostingType {
    /// Plain gradient boosting over all rows
    #[default]
    Gbdt,
    /// Gradient-based one-side sampling
    Goss,
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("regression")
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Rmse => f.write_str("rmse"),
            Metric::Mae => f.write_str("mae"),
        }
    }
}

impl fmt::Display for BoostingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoostingType::Gbdt => f.write_str("gbdt"),
            BoostingType::Goss => f.write_str("goss"),
        }
    }
}

/// Hyperparameters of one leave-one-out run.
///
/// Tuning bounds (inclusive):
/// - `n_estimators`: 50..=500
/// - `num_leaves`: 2..=256
/// - `learning_rate`: 0.005..=2.0
/// - `max_depth`: -1..=30, values `<= 0` disable the depth limit
/// - `min_child_samples`: 2..=6
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterConfig {
    pub n_estimators: usize,
    pub num_leaves: usize,
    pub learning_rate: f64,
    pub max_depth: i32,
    pub min_child_samples: usize,
    pub objective: Objective,
    pub metric: Metric,
    pub boosting_type: BoostingType,
    pub random_state: u64,
}

impl Default for HyperparameterConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            num_leaves: 31,
            learning_rate: 0.1,
            max_depth: -1,
            min_child_samples: 20,
            objective: Objective::Regression,
            metric: Metric::Rmse,
            boosting_type: BoostingType::Gbdt,
            random_state: 42,
        }
    }
}

impl HyperparameterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_num_leaves(mut self, n: usize) -> Self {
        self.num_leaves = n;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_max_depth(mut self, depth: i32) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_child_samples(mut self, n: usize) -> Self {
        self.min_child_samples = n;
        self
    }

    pub fn with_boosting_type(mut self, boosting_type: BoostingType) -> Self {
        self.boosting_type = boosting_type;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Reject values the regressor cannot train with
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(invalid("n_estimators", self.n_estimators, "must be positive"));
        }
        if self.num_leaves < 2 {
            return Err(invalid("num_leaves", self.num_leaves, "must be at least 2"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(invalid("learning_rate", self.learning_rate, "must be a positive finite number"));
        }
        if self.min_child_samples == 0 {
            return Err(invalid("min_child_samples", self.min_child_samples, "must be positive"));
        }
        Ok(())
    }

    /// Translate into the regressor's own configuration
    pub fn to_lightgbm_config(&self) -> LightGBMConfig {
        LightGBMConfig {
            n_estimators: self.n_estimators,
            learning_rate: self.learning_rate,
            max_leaves: self.num_leaves,
            max_depth: usize::try_from(self.max_depth).ok().filter(|&d| d > 0),
            min_child_samples: self.min_child_samples,
            boosting_type: self.boosting_type,
            importance_type: ImportanceType::Split,
            random_state: Some(self.random_state),
            ..LightGBMConfig::default()
        }
    }
}

fn invalid(name: &str, value: impl fmt::Display, reason: &str) -> LooError {
    LooError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = HyperparameterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.objective, Objective::Regression);
        assert_eq!(config.metric, Metric::Rmse);
        assert_eq!(config.boosting_type, BoostingType::Gbdt);
    }

    #[test]
    fn test_negative_depth_disables_limit() {
        let config = HyperparameterConfig::new().with_max_depth(-1);
        assert_eq!(config.to_lightgbm_config().max_depth, None);

        let config = HyperparameterConfig::new().with_max_depth(0);
        assert_eq!(config.to_lightgbm_config().max_depth, None);

        let config = HyperparameterConfig::new().with_max_depth(7);
        assert_eq!(config.to_lightgbm_config().max_depth, Some(7));
    }

    #[test]
    fn test_boosting_type_reaches_regressor() {
        let config = HyperparameterConfig::new().with_boosting_type(BoostingType::Goss);
        assert_eq!(config.boosting_type, BoostingType::Goss);
        assert_eq!(config.to_lightgbm_config().boosting_type, BoostingType::Goss);
        assert_eq!(HyperparameterConfig::new().to_lightgbm_config().boosting_type, BoostingType::Gbdt);
    }

    #[test]
    fn test_validate_rejects_single_leaf() {
        let config = HyperparameterConfig::new().with_num_leaves(1);
        assert!(matches!(
            config.validate(),
            Err(LooError::InvalidParameter { ref name, .. }) if name == "num_leaves"
        ));
    }

    #[test]
    fn test_metric_on_single_sample_is_absolute_error() {
        assert!((Metric::Rmse.compute(&[1.0], &[1.25]) - 0.25).abs() < 1e-12);
        assert!((Metric::Mae.compute(&[1.0], &[1.25]) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_serialized_names() {
        let json = serde_json::to_string(&HyperparameterConfig::default()).unwrap();
        assert!(json.contains("\"objective\":\"regression\""));
        assert!(json.contains("\"metric\":\"rmse\""));
        assert!(json.contains("\"boosting_type\":\"gbdt\""));
    }
}
