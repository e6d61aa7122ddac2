//! Tuning driver: study, best configuration, final evaluation

use super::objective::{config_from_params, LooObjective};
use crate::error::Result;
use crate::optimizer::{Objective, OptimizationConfig, OptimizeDirection, Study, TrialParams, TrialResult};
use crate::training::{Dataset, EvaluationResult, HyperparameterConfig, LooEvaluator};
use serde::{Deserialize, Serialize};

/// Everything a tuning session produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningOutcome {
    pub best_config: HyperparameterConfig,
    pub best_params: TrialParams,
    /// Mean LOO RMSE of the best trial
    pub best_value: f64,
    pub trials: Vec<TrialResult>,
    /// LOO run repeated with `best_config`
    pub evaluation: EvaluationResult,
}

#[derive(Debug, Clone)]
pub struct TuningDriver {
    config: OptimizationConfig,
    model_seed: u64,
}

impl TuningDriver {
    /// The study always minimizes, whatever direction `config` carries
    pub fn new(config: OptimizationConfig) -> Self {
        Self {
            config: config.with_direction(OptimizeDirection::Minimize),
            model_seed: 42,
        }
    }

    /// Seed of every boosted model trained during and after the search
    pub fn with_model_seed(mut self, seed: u64) -> Self {
        self.model_seed = seed;
        self
    }

    pub fn config(&self) -> &OptimizationConfig {
        &self.config
    }

    /// Tune on a dataset that is reused by every trial
    pub fn run(&self, dataset: &Dataset) -> Result<TuningOutcome> {
        let mut objective = LooObjective::cached(dataset.clone()).with_random_state(self.model_seed);
        self.run_with_objective(dataset, &mut objective)
    }

    /// Tune with a caller-provided objective, then evaluate the winner on `dataset`
    pub fn run_with_objective<O>(&self, dataset: &Dataset, objective: &mut O) -> Result<TuningOutcome>
    where
        O: Objective + ?Sized,
    {
        tracing::info!(
            n_trials = self.config.n_trials,
            sampler = ?self.config.sampler,
            samples = dataset.n_samples(),
            features = dataset.n_features(),
            "Starting hyperparameter search"
        );

        let mut study = Study::create(self.config.clone());
        study.optimize(objective)?;

        let best = study.best_trial()?;
        let best_config = config_from_params(&best.params, self.model_seed)?;
        let best_value = best.value;
        let best_params = best.params.clone();

        if self.config.verbose {
            println!("Best Parameters: {}", serde_json::to_string(&best_params)?);
            println!("Best Score: {}", best_value);
        }
        tracing::info!(
            best_trial = best.trial_id,
            best_value,
            elapsed_secs = study.total_duration_secs(),
            "Search finished"
        );

        let evaluation = LooEvaluator::new(best_config.clone())
            .with_progress(self.config.verbose)
            .evaluate(dataset)?;

        Ok(TuningOutcome {
            best_config,
            best_params,
            best_value,
            trials: study.trials().to_vec(),
            evaluation,
        })
    }
}
