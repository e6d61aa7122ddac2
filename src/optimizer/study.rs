//! Study: a scoped optimization session
//!
//! Lifecycle is create -> optimize -> read the best trial -> drop. The trial
//! history lives only inside the study.

use super::config::{OptimizationConfig, OptimizeDirection};
use super::samplers::{create_sampler, Sampler};
use super::search_space::TrialParams;
use super::trial::Trial;
use crate::error::{LooError, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Something a study can optimize
pub trait Objective {
    /// Evaluate one trial, sampling hyperparameters through `trial`
    fn evaluate(&mut self, trial: &mut Trial<'_>) -> Result<f64>;
}

impl<F> Objective for F
where
    F: FnMut(&mut Trial<'_>) -> Result<f64>,
{
    fn evaluate(&mut self, trial: &mut Trial<'_>) -> Result<f64> {
        self(trial)
    }
}

/// Result of a single trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    /// Trial number
    pub trial_id: usize,
    /// Parameters used
    pub params: TrialParams,
    /// Objective value
    pub value: f64,
    /// Trial duration in seconds
    pub duration_secs: f64,
}

pub struct Study {
    config: OptimizationConfig,
    sampler: Box<dyn Sampler>,
    trials: Vec<TrialResult>,
    /// `(params, loss)` per finished trial, loss oriented so lower is better
    history: Vec<(TrialParams, f64)>,
    best_trial_idx: Option<usize>,
    total_duration_secs: f64,
}

impl Study {
    /// Create a new study
    pub fn create(config: OptimizationConfig) -> Self {
        let sampler = create_sampler(config.sampler.clone(), config.random_state, config.n_startup_trials);
        Self::with_sampler(config, sampler)
    }

    /// Create a study around a caller-provided sampler
    pub fn with_sampler(config: OptimizationConfig, sampler: Box<dyn Sampler>) -> Self {
        Self {
            config,
            sampler,
            trials: Vec::new(),
            history: Vec::new(),
            best_trial_idx: None,
            total_duration_secs: 0.0,
        }
    }

    pub fn direction(&self) -> OptimizeDirection {
        self.config.direction
    }

    /// Run exactly `n_trials` trials. The first objective error aborts the study and is returned.
    pub fn optimize<O>(&mut self, objective: &mut O) -> Result<()>
    where
        O: Objective + ?Sized,
    {
        let start = Instant::now();

        for _ in 0..self.config.n_trials {
            let trial_id = self.trials.len();
            let trial_start = Instant::now();

            let mut trial = Trial::new(trial_id, self.sampler.as_mut(), &self.history);
            let value = objective.evaluate(&mut trial)?;
            let params = trial.into_params();

            if !value.is_finite() {
                return Err(LooError::OptimizationError(format!(
                    "trial {} returned a non-finite value ({})",
                    trial_id, value
                )));
            }

            let loss = match self.config.direction {
                OptimizeDirection::Minimize => value,
                OptimizeDirection::Maximize => -value,
            };
            self.history.push((params.clone(), loss));
            self.add_trial(TrialResult {
                trial_id,
                params,
                value,
                duration_secs: trial_start.elapsed().as_secs_f64(),
            });

            if let Some(best) = self.best_trial_idx.map(|idx| &self.trials[idx]) {
                tracing::info!(
                    trial = trial_id,
                    value,
                    best_trial = best.trial_id,
                    best_value = best.value,
                    "Trial finished"
                );
            }
        }

        self.total_duration_secs += start.elapsed().as_secs_f64();
        Ok(())
    }

    fn add_trial(&mut self, result: TrialResult) {
        let idx = self.trials.len();

        // Ties keep the earlier trial
        let is_better = match self.best_trial_idx {
            None => true,
            Some(best_idx) => {
                let best_val = self.trials[best_idx].value;
                match self.config.direction {
                    OptimizeDirection::Minimize => result.value < best_val,
                    OptimizeDirection::Maximize => result.value > best_val,
                }
            }
        };

        if is_better {
            self.best_trial_idx = Some(idx);
        }
        self.trials.push(result);
    }

    /// All finished trials in order
    pub fn trials(&self) -> &[TrialResult] {
        &self.trials
    }

    /// Get the best trial
    pub fn best_trial(&self) -> Result<&TrialResult> {
        self.best_trial_idx
            .map(|idx| &self.trials[idx])
            .ok_or_else(|| LooError::OptimizationError("study has no completed trials".to_string()))
    }

    /// Get the best value
    pub fn best_value(&self) -> Result<f64> {
        self.best_trial().map(|t| t.value)
    }

    /// Get the best parameters
    pub fn best_params(&self) -> Result<&TrialParams> {
        self.best_trial().map(|t| &t.params)
    }

    pub fn total_duration_secs(&self) -> f64 {
        self.total_duration_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::SamplerType;

    fn quadratic_objective(trial: &mut Trial<'_>) -> Result<f64> {
        let x = trial.suggest_float("x", -5.0, 5.0)?;
        let y = trial.suggest_float("y", -5.0, 5.0)?;
        Ok(x * x + y * y)
    }

    #[test]
    fn test_study_creation() {
        let study = Study::create(OptimizationConfig::new());
        assert!(study.trials().is_empty());
        assert!(study.best_trial().is_err());
    }

    #[test]
    fn test_optimization() {
        let config = OptimizationConfig::new().with_n_trials(20);
        let mut study = Study::create(config);
        study.optimize(&mut quadratic_objective).unwrap();

        assert_eq!(study.trials().len(), 20);
        let best = study.best_value().unwrap();
        assert!(best < 25.0);
        let min = study.trials().iter().map(|t| t.value).fold(f64::INFINITY, f64::min);
        assert_eq!(best, min);
    }

    #[test]
    fn test_objective_called_exactly_n_times() {
        let mut calls = 0usize;
        let mut objective = |trial: &mut Trial<'_>| -> Result<f64> {
            calls += 1;
            let v = trial.suggest_int("k", 0, 100)?;
            Ok(v as f64)
        };
        let mut study = Study::create(OptimizationConfig::new().with_n_trials(5).with_sampler(SamplerType::Random));
        study.optimize(&mut objective).unwrap();
        assert_eq!(calls, 5);
        assert_eq!(study.trials().len(), 5);
    }

    #[test]
    fn test_maximize() {
        let mut objective = |trial: &mut Trial<'_>| -> Result<f64> { trial.suggest_float("x", 0.0, 1.0) };
        let config = OptimizationConfig::new()
            .with_n_trials(10)
            .with_direction(OptimizeDirection::Maximize);
        let mut study = Study::create(config);
        study.optimize(&mut objective).unwrap();
        let max = study.trials().iter().map(|t| t.value).fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(study.best_value().unwrap(), max);
    }

    #[test]
    fn test_ties_keep_first_trial() {
        let mut objective = |trial: &mut Trial<'_>| -> Result<f64> {
            trial.suggest_int("k", 0, 10)?;
            Ok(1.0)
        };
        let mut study = Study::create(OptimizationConfig::new().with_n_trials(4));
        study.optimize(&mut objective).unwrap();
        assert_eq!(study.best_trial().unwrap().trial_id, 0);
    }

    #[test]
    fn test_objective_error_aborts() {
        let mut objective = |trial: &mut Trial<'_>| -> Result<f64> {
            if trial.number() == 2 {
                return Err(LooError::TrainingError("boom".to_string()));
            }
            Ok(trial.number() as f64)
        };
        let mut study = Study::create(OptimizationConfig::new().with_n_trials(5));
        assert!(matches!(study.optimize(&mut objective), Err(LooError::TrainingError(_))));
        assert_eq!(study.trials().len(), 2);
    }

    #[test]
    fn test_non_finite_value_is_rejected() {
        let mut objective = |_: &mut Trial<'_>| -> Result<f64> { Ok(f64::NAN) };
        let mut study = Study::create(OptimizationConfig::new().with_n_trials(1));
        assert!(matches!(study.optimize(&mut objective), Err(LooError::OptimizationError(_))));
    }
}
