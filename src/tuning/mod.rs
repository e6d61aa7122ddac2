//! Hyperparameter tuning of the boosted regressor against leave-one-out RMSE

mod driver;
mod objective;

pub use driver::{TuningDriver, TuningOutcome};
pub use objective::{
    config_from_params, suggest_config, DatasetSource, LooObjective, LEARNING_RATE_RANGE,
    MAX_DEPTH_RANGE, MIN_CHILD_SAMPLES_RANGE, NUM_LEAVES_RANGE, N_ESTIMATORS_RANGE,
};
