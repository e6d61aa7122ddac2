//! Error types for loo-boost

use thiserror::Error;

/// Result type alias for loo-boost operations
pub type Result<T> = std::result::Result<T, LooError>;

/// Main error type
#[derive(Error, Debug)]
pub enum LooError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Optimization error: {0}")]
    OptimizationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Plot error: {0}")]
    PlotError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<polars::error::PolarsError> for LooError {
    fn from(err: polars::error::PolarsError) -> Self {
        LooError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for LooError {
    fn from(err: serde_json::Error) -> Self {
        LooError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for LooError {
    fn from(err: ndarray::ShapeError) -> Self {
        LooError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
