//! Hyperparameter distributions and sampled values

use crate::error::{LooError, Result};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Type of parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterType {
    /// Continuous float parameter, bounds inclusive
    Float {
        low: f64,
        high: f64,
        log_scale: bool,
    },
    /// Integer parameter, bounds inclusive
    Int {
        low: i64,
        high: i64,
        log_scale: bool,
    },
    /// Categorical parameter
    Categorical {
        choices: Vec<String>,
    },
}

/// A single hyperparameter declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub param_type: ParameterType,
}

impl Parameter {
    /// Create a float parameter
    pub fn float(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Float { low, high, log_scale: false },
        }
    }

    /// Create a log-scale float parameter
    pub fn log_float(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Float { low, high, log_scale: true },
        }
    }

    /// Create an integer parameter
    pub fn int(name: impl Into<String>, low: i64, high: i64) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Int { low, high, log_scale: false },
        }
    }

    /// Create a categorical parameter
    pub fn categorical(name: impl Into<String>, choices: &[&str]) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Categorical {
                choices: choices.iter().map(|c| c.to_string()).collect(),
            },
        }
    }

    /// Check that the declared range can be sampled from
    pub fn validate(&self) -> Result<()> {
        let bad = |value: String, reason: &str| LooError::InvalidParameter {
            name: self.name.clone(),
            value,
            reason: reason.to_string(),
        };
        match &self.param_type {
            ParameterType::Float { low, high, log_scale } => {
                if !(low.is_finite() && high.is_finite()) {
                    return Err(bad(format!("[{}, {}]", low, high), "bounds must be finite"));
                }
                if low > high {
                    return Err(bad(format!("[{}, {}]", low, high), "low must not exceed high"));
                }
                if *log_scale && *low <= 0.0 {
                    return Err(bad(format!("[{}, {}]", low, high), "log scale needs positive bounds"));
                }
            }
            ParameterType::Int { low, high, log_scale } => {
                if low > high {
                    return Err(bad(format!("[{}, {}]", low, high), "low must not exceed high"));
                }
                if *log_scale && *low <= 0 {
                    return Err(bad(format!("[{}, {}]", low, high), "log scale needs positive bounds"));
                }
            }
            ParameterType::Categorical { choices } => {
                if choices.is_empty() {
                    return Err(bad("[]".to_string(), "needs at least one choice"));
                }
            }
        }
        Ok(())
    }

    /// Whether `value` lies inside this parameter's domain
    pub fn contains(&self, value: &ParameterValue) -> bool {
        match (&self.param_type, value) {
            (ParameterType::Float { low, high, .. }, ParameterValue::Float(v)) => v >= low && v <= high,
            (ParameterType::Int { low, high, .. }, ParameterValue::Int(v)) => v >= low && v <= high,
            (ParameterType::Categorical { choices }, ParameterValue::String(s)) => choices.contains(s),
            _ => false,
        }
    }

    /// Sample a value uniformly (log-uniformly for log-scale parameters)
    pub fn sample(&self, rng: &mut impl Rng) -> ParameterValue {
        match &self.param_type {
            ParameterType::Float { low, high, log_scale } => {
                if low >= high {
                    return ParameterValue::Float(*low);
                }
                let val = if *log_scale {
                    rng.gen_range(low.ln()..=high.ln()).exp().clamp(*low, *high)
                } else {
                    rng.gen_range(*low..=*high)
                };
                ParameterValue::Float(val)
            }
            ParameterType::Int { low, high, log_scale } => {
                let val = if *log_scale && low < high {
                    let log_low = (*low as f64 - 0.5).max(0.5).ln();
                    let log_high = (*high as f64 + 0.5).ln();
                    (rng.gen_range(log_low..log_high).exp().round() as i64).clamp(*low, *high)
                } else {
                    rng.gen_range(*low..=*high)
                };
                ParameterValue::Int(val)
            }
            ParameterType::Categorical { choices } => {
                let idx = rng.gen_range(0..choices.len());
                ParameterValue::String(choices[idx].clone())
            }
        }
    }
}

/// Sampled parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i64),
    Float(f64),
    String(String),
}

impl ParameterValue {
    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            ParameterValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::String(v) => write!(f, "{}", v),
        }
    }
}

/// Parameters sampled for one trial, keyed by name
pub type TrialParams = BTreeMap<String, ParameterValue>;
