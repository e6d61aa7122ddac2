//! Tabular dataset split into features and target by column position

use crate::error::{LooError, Result};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;

/// Feature matrix and target vector of one table.
///
/// The source table's first column is an identifier and is dropped, the last
/// column is the target and everything in between is a feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    feature_names: Vec<String>,
    target_name: String,
    features: Array2<f64>,
    target: Array1<f64>,
}

impl Dataset {
    /// Build a dataset directly from arrays
    pub fn new(
        feature_names: Vec<String>,
        target_name: impl Into<String>,
        features: Array2<f64>,
        target: Array1<f64>,
    ) -> Result<Self> {
        if features.nrows() != target.len() {
            return Err(LooError::ShapeError {
                expected: format!("{} target values", features.nrows()),
                actual: format!("{} target values", target.len()),
            });
        }
        if features.ncols() != feature_names.len() {
            return Err(LooError::ShapeError {
                expected: format!("{} feature names", features.ncols()),
                actual: format!("{} feature names", feature_names.len()),
            });
        }
        Ok(Self {
            feature_names,
            target_name: target_name.into(),
            features,
            target,
        })
    }

    /// Split a table into `(features, target)` by position
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        if names.len() < 3 {
            return Err(LooError::DataError(format!(
                "expected an identifier, at least one feature and a target column, found {} column(s)",
                names.len()
            )));
        }

        let feature_names = names[1..names.len() - 1].to_vec();
        let target_name = names[names.len() - 1].clone();

        let target = Array1::from_vec(column_to_f64(df, &target_name)?);
        let columns: Vec<Vec<f64>> = feature_names
            .iter()
            .map(|name| column_to_f64(df, name))
            .collect::<Result<_>>()?;

        let features = Array2::from_shape_fn((df.height(), columns.len()), |(r, c)| columns[c][r]);

        if target.len() > 1 && target.iter().all(|&v| v == target[0]) {
            tracing::warn!(column = %target_name, "Target column is constant");
        }

        Self::new(feature_names, target_name, features, target)
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn target(&self) -> &Array1<f64> {
        &self.target
    }

    /// Rows at `indices`, in the given order
    pub fn select(&self, indices: &[usize]) -> (Array2<f64>, Array1<f64>) {
        (
            self.features.select(Axis(0), indices),
            self.target.select(Axis(0), indices),
        )
    }
}

fn column_to_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = df
        .column(name)
        .map_err(|e| LooError::DataError(e.to_string()))?
        .strict_cast(&DataType::Float64)
        .map_err(|e| LooError::DataError(format!("column '{}' is not numeric: {}", name, e)))?;

    series
        .f64()
        .map_err(|e| LooError::DataError(e.to_string()))?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| LooError::DataError(format!("missing value in column '{}' at row {}", name, row)))
        })
        .collect()
}
