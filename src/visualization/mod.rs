//! Charts of leave-one-out evaluation results

mod charts;

pub use charts::{render_actual_vs_predicted, render_importance_and_residuals};

use crate::error::Result;
use crate::training::EvaluationResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const IMPORTANCE_RESIDUALS_FILE: &str = "importance_residuals.svg";
pub const ACTUAL_VS_PREDICTED_FILE: &str = "actual_vs_predicted.svg";

/// Where and whether charts are written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    pub render_charts: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("plots"),
            render_charts: true,
        }
    }
}

impl ReportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_render_charts(mut self, render: bool) -> Self {
        self.render_charts = render;
        self
    }
}

/// Render both charts of `result`, returning the written paths
pub fn render_charts(result: &EvaluationResult, config: &ReportConfig) -> Result<Vec<PathBuf>> {
    if !config.render_charts {
        return Ok(Vec::new());
    }
    std::fs::create_dir_all(&config.output_dir)?;

    let importances = result.mean_feature_importances().to_vec();
    let residuals = result.normalized_residuals();
    let first = config.output_dir.join(IMPORTANCE_RESIDUALS_FILE);
    render_importance_and_residuals(&first, &result.feature_names, &importances, &residuals)?;

    let second = config.output_dir.join(ACTUAL_VS_PREDICTED_FILE);
    render_actual_vs_predicted(&second, &result.actual.to_vec(), &result.predicted.to_vec())?;

    tracing::info!(dir = %config.output_dir.display(), "Charts written");
    Ok(vec![first, second])
}
