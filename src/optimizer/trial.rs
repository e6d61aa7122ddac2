//! Trial-suggestion handle passed to objectives

use super::samplers::Sampler;
use super::search_space::{Parameter, ParameterValue, TrialParams};
use crate::error::{LooError, Result};
use std::collections::BTreeMap;

/// One evaluation in progress. Objectives declare each hyperparameter through the
/// `suggest_*` methods; the study's sampler picks the value.
pub struct Trial<'a> {
    number: usize,
    sampler: &'a mut dyn Sampler,
    history: &'a [(TrialParams, f64)],
    params: TrialParams,
    distributions: BTreeMap<String, Parameter>,
}

impl<'a> Trial<'a> {
    pub(crate) fn new(number: usize, sampler: &'a mut dyn Sampler, history: &'a [(TrialParams, f64)]) -> Self {
        Self {
            number,
            sampler,
            history,
            params: TrialParams::new(),
            distributions: BTreeMap::new(),
        }
    }

    /// Zero-based index of this trial within its study
    pub fn number(&self) -> usize {
        self.number
    }

    /// Integer in `[low, high]`
    pub fn suggest_int(&mut self, name: &str, low: i64, high: i64) -> Result<i64> {
        let value = self.suggest(Parameter::int(name, low, high))?;
        value.as_int().ok_or_else(|| type_mismatch(name, &value))
    }

    /// Float in `[low, high]`
    pub fn suggest_float(&mut self, name: &str, low: f64, high: f64) -> Result<f64> {
        let value = self.suggest(Parameter::float(name, low, high))?;
        value.as_float().ok_or_else(|| type_mismatch(name, &value))
    }

    /// Float in `[low, high]`, sampled on a log scale
    pub fn suggest_log_float(&mut self, name: &str, low: f64, high: f64) -> Result<f64> {
        let value = self.suggest(Parameter::log_float(name, low, high))?;
        value.as_float().ok_or_else(|| type_mismatch(name, &value))
    }

    /// One of `choices`
    pub fn suggest_categorical(&mut self, name: &str, choices: &[&str]) -> Result<String> {
        let value = self.suggest(Parameter::categorical(name, choices))?;
        value
            .as_string()
            .map(str::to_string)
            .ok_or_else(|| type_mismatch(name, &value))
    }

    /// Sample a declared parameter. Suggesting the same name twice returns the first value.
    pub fn suggest(&mut self, param: Parameter) -> Result<ParameterValue> {
        param.validate()?;

        if let Some(existing) = self.distributions.get(&param.name) {
            if existing != &param {
                return Err(LooError::InvalidParameter {
                    name: param.name.clone(),
                    value: format!("{:?}", param.param_type),
                    reason: format!("already declared as {:?} in this trial", existing.param_type),
                });
            }
            if let Some(v) = self.params.get(&param.name) {
                return Ok(v.clone());
            }
        }

        let value = self.sampler.sample(&param, self.history);
        if !param.contains(&value) {
            return Err(LooError::OptimizationError(format!(
                "sampler produced {} for '{}' outside its declared range",
                value, param.name
            )));
        }

        self.params.insert(param.name.clone(), value.clone());
        self.distributions.insert(param.name.clone(), param);
        Ok(value)
    }

    /// Parameters suggested so far
    pub fn params(&self) -> &TrialParams {
        &self.params
    }

    pub(crate) fn into_params(self) -> TrialParams {
        self.params
    }
}

fn type_mismatch(name: &str, value: &ParameterValue) -> LooError {
    LooError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: "sampled value has an unexpected type".to_string(),
    }
}
