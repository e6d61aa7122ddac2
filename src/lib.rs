//! loo-boost - leave-one-out evaluation and tuning of gradient-boosted trees
//!
//! Reads a small tabular dataset, scores LightGBM-style regression trees by
//! leave-one-out RMSE, searches hyperparameters against that score and
//! reports the best configuration on the console and as SVG charts.
//!
//! # Modules
//!
//! - [`training`] - Dataset, boosted regressor, leave-one-out evaluator
//! - [`optimizer`] - Define-by-run study with TPE and random samplers
//! - [`tuning`] - The LOO objective and the tuning driver
//! - [`visualization`] - Importance, residual and prediction charts
//! - [`utils`] - CSV loading
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core ML modules
pub mod training;
pub mod optimizer;
pub mod tuning;

// Output
pub mod visualization;

// Utilities
pub mod utils;

// Services
pub mod cli;

pub use error::{LooError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{LooError, Result};

    pub use crate::training::{
        Dataset, EvaluationResult, HyperparameterConfig, LightGBMConfig, LightGBMRegressor, LooEvaluator,
    };

    pub use crate::optimizer::{Objective, OptimizationConfig, SamplerType, Study, Trial};

    pub use crate::tuning::{LooObjective, TuningDriver, TuningOutcome};

    pub use crate::visualization::{render_charts, ReportConfig};

    pub use crate::utils::DataLoader;
}
