//! Model training module
//!
//! Provides:
//! - Dataset splitting into features and target
//! - LightGBM-style gradient-boosted regression trees
//! - Leave-one-out cross-validation and its evaluator
//! - Regression metrics

mod config;
pub mod cross_validation;
pub mod dataset;
pub mod lightgbm;
pub mod loo;
pub mod metrics;

pub use config::{BoostingType, HyperparameterConfig, Metric, Objective};
pub use cross_validation::{CVResults, CVSplit, LeaveOneOut};
pub use dataset::Dataset;
pub use lightgbm::{ImportanceType, LightGBMConfig, LightGBMRegressor};
pub use loo::{normalized_residuals, EvaluationResult, LooEvaluator};
pub use metrics::RegressionMetrics;
