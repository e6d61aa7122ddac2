//! Hyperparameter optimization module
//!
//! Provides a define-by-run study in the style of black-box optimizers:
//! - [`Study`] owns the trial history for one optimization session
//! - [`Trial`] is the handle objectives use to declare and sample parameters
//! - Samplers: Tree-structured Parzen Estimator (default) and random search

mod config;
mod search_space;
mod samplers;
mod study;
mod trial;

pub use config::{OptimizationConfig, OptimizeDirection};
pub use search_space::{Parameter, ParameterType, ParameterValue, TrialParams};
pub use samplers::{create_sampler, RandomSampler, Sampler, SamplerType, TPESampler};
pub use study::{Objective, Study, TrialResult};
pub use trial::Trial;
