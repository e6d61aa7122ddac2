//! Mean leave-one-out RMSE as an optimization objective

use crate::error::{LooError, Result};
use crate::optimizer::{Objective, Trial, TrialParams};
use crate::training::{BoostingType, Dataset, HyperparameterConfig, LooEvaluator, Metric, Objective as TrainObjective};
use crate::utils::DataLoader;
use std::borrow::Cow;
use std::path::PathBuf;

pub const N_ESTIMATORS_RANGE: (i64, i64) = (50, 500);
pub const NUM_LEAVES_RANGE: (i64, i64) = (2, 256);
pub const LEARNING_RATE_RANGE: (f64, f64) = (0.005, 2.0);
pub const MAX_DEPTH_RANGE: (i64, i64) = (-1, 30);
pub const MIN_CHILD_SAMPLES_RANGE: (i64, i64) = (2, 6);

/// Declare and sample every tuned hyperparameter on `trial`
pub fn suggest_config(trial: &mut Trial<'_>, random_state: u64) -> Result<HyperparameterConfig> {
    let n_estimators = trial.suggest_int("n_estimators", N_ESTIMATORS_RANGE.0, N_ESTIMATORS_RANGE.1)?;
    let num_leaves = trial.suggest_int("num_leaves", NUM_LEAVES_RANGE.0, NUM_LEAVES_RANGE.1)?;
    let learning_rate = trial.suggest_float("learning_rate", LEARNING_RATE_RANGE.0, LEARNING_RATE_RANGE.1)?;
    let max_depth = trial.suggest_int("max_depth", MAX_DEPTH_RANGE.0, MAX_DEPTH_RANGE.1)?;
    let min_child_samples =
        trial.suggest_int("min_child_samples", MIN_CHILD_SAMPLES_RANGE.0, MIN_CHILD_SAMPLES_RANGE.1)?;

    Ok(HyperparameterConfig {
        n_estimators: n_estimators as usize,
        num_leaves: num_leaves as usize,
        learning_rate,
        max_depth: max_depth as i32,
        min_child_samples: min_child_samples as usize,
        objective: TrainObjective::Regression,
        metric: Metric::Rmse,
        boosting_type: BoostingType::Gbdt,
        random_state,
    })
}

/// Rebuild a configuration from a finished trial's parameters
pub fn config_from_params(params: &TrialParams, random_state: u64) -> Result<HyperparameterConfig> {
    let int = |name: &str| -> Result<i64> {
        params
            .get(name)
            .and_then(|v| v.as_int())
            .ok_or_else(|| LooError::ConfigError(format!("missing integer parameter '{}'", name)))
    };
    let float = |name: &str| -> Result<f64> {
        params
            .get(name)
            .and_then(|v| v.as_float())
            .ok_or_else(|| LooError::ConfigError(format!("missing float parameter '{}'", name)))
    };

    let config = HyperparameterConfig::new()
        .with_n_estimators(non_negative(int("n_estimators")?, "n_estimators")?)
        .with_num_leaves(non_negative(int("num_leaves")?, "num_leaves")?)
        .with_learning_rate(float("learning_rate")?)
        .with_max_depth(i32::try_from(int("max_depth")?).map_err(|e| LooError::ConfigError(e.to_string()))?)
        .with_min_child_samples(non_negative(int("min_child_samples")?, "min_child_samples")?)
        .with_random_state(random_state);
    config.validate()?;
    Ok(config)
}

fn non_negative(v: i64, name: &str) -> Result<usize> {
    usize::try_from(v).map_err(|_| LooError::InvalidParameter {
        name: name.to_string(),
        value: v.to_string(),
        reason: "must not be negative".to_string(),
    })
}

/// Where the objective gets its data on each call
#[derive(Debug, Clone)]
pub enum DatasetSource {
    /// Loaded once and reused by every trial
    Cached(Dataset),
    /// Re-read from disk on every trial
    Reload { path: PathBuf, loader: DataLoader },
}

impl DatasetSource {
    fn dataset(&self) -> Result<Cow<'_, Dataset>> {
        match self {
            DatasetSource::Cached(ds) => Ok(Cow::Borrowed(ds)),
            DatasetSource::Reload { path, loader } => Ok(Cow::Owned(loader.load_dataset(path)?)),
        }
    }
}

/// Objective returning the mean leave-one-out RMSE of a sampled configuration
#[derive(Debug, Clone)]
pub struct LooObjective {
    source: DatasetSource,
    random_state: u64,
}

impl LooObjective {
    pub fn new(source: DatasetSource) -> Self {
        Self { source, random_state: 42 }
    }

    pub fn cached(dataset: Dataset) -> Self {
        Self::new(DatasetSource::Cached(dataset))
    }

    pub fn reloading(path: impl Into<PathBuf>, loader: DataLoader) -> Self {
        Self::new(DatasetSource::Reload { path: path.into(), loader })
    }

    /// Seed handed to every model the objective trains
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }
}

impl Objective for LooObjective {
    fn evaluate(&mut self, trial: &mut Trial<'_>) -> Result<f64> {
        let config = suggest_config(trial, self.random_state)?;
        let dataset = self.source.dataset()?;
        let result = LooEvaluator::new(config).evaluate(&dataset)?;
        tracing::debug!(trial = trial.number(), mean_rmse = result.mean_rmse, "Objective evaluated");
        Ok(result.mean_rmse)
    }
}
