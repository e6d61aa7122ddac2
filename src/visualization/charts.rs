//! SVG charts of a leave-one-out evaluation

use crate::error::{LooError, Result};
use plotters::prelude::*;
use std::error::Error;
use std::path::Path;

type DrawResult = std::result::Result<(), Box<dyn Error>>;

const DEEP_SKY_BLUE: RGBColor = RGBColor(0, 191, 255);
const STEEL_BLUE: RGBColor = RGBColor(70, 130, 180);
const MARKER_BLUE: RGBColor = RGBColor(31, 119, 180);

const BAR_WIDTH: f64 = 0.4;
const BAR_OFFSET: f64 = 0.2;

/// Two panels: mean feature importance bars, then residuals divided by n per sample
pub fn render_importance_and_residuals(
    path: &Path,
    feature_names: &[String],
    importances: &[f64],
    residuals: &[f64],
) -> Result<()> {
    if feature_names.len() != importances.len() {
        return Err(LooError::ShapeError {
            expected: format!("{} importances", feature_names.len()),
            actual: format!("{} importances", importances.len()),
        });
    }
    if feature_names.is_empty() || residuals.is_empty() {
        return Err(LooError::PlotError("nothing to plot".to_string()));
    }
    draw_importance_and_residuals(path, feature_names, importances, residuals)
        .map_err(|e| LooError::PlotError(e.to_string()))?;
    tracing::debug!(path = %path.display(), "Wrote importance and residual chart");
    Ok(())
}

/// Grouped bars of actual and predicted values per sample
pub fn render_actual_vs_predicted(path: &Path, actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.len() != predicted.len() {
        return Err(LooError::ShapeError {
            expected: format!("{} predictions", actual.len()),
            actual: format!("{} predictions", predicted.len()),
        });
    }
    if actual.is_empty() {
        return Err(LooError::PlotError("nothing to plot".to_string()));
    }
    draw_actual_vs_predicted(path, actual, predicted).map_err(|e| LooError::PlotError(e.to_string()))?;
    tracing::debug!(path = %path.display(), "Wrote actual vs predicted chart");
    Ok(())
}

fn draw_importance_and_residuals(
    path: &Path,
    feature_names: &[String],
    importances: &[f64],
    residuals: &[f64],
) -> DrawResult {
    let root = SVGBackend::new(path, (1400, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((1, 2));

    let k = feature_names.len() as i32;
    let max_importance = importances.iter().copied().fold(0.0, f64::max);
    let y_max = if max_importance > 0.0 { max_importance * 1.1 } else { 1.0 };

    let mut bars = ChartBuilder::on(&panels[0])
        .caption("Feature Importances", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(120)
        .y_label_area_size(60)
        .build_cartesian_2d((0..k).into_segmented(), 0.0..y_max)?;

    bars.configure_mesh()
        .disable_x_mesh()
        .x_desc("Feature")
        .y_desc("Importance")
        .x_labels(feature_names.len() + 1)
        .x_label_style(("sans-serif", 12).into_font().transform(FontTransform::Rotate90))
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => usize::try_from(*i)
                .ok()
                .and_then(|i| feature_names.get(i))
                .cloned()
                .unwrap_or_default(),
            _ => String::new(),
        })
        .draw()?;

    bars.draw_series(
        Histogram::vertical(&bars)
            .style(STEEL_BLUE.filled())
            .margin(8)
            .data(importances.iter().enumerate().map(|(i, v)| (i as i32, *v))),
    )?;

    let n = residuals.len() as f64;
    let (lo, hi) = padded_range(residuals);
    let mut scatter = ChartBuilder::on(&panels[1])
        .caption("Residual Plot", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(-0.5..(n - 0.5), lo..hi)?;

    scatter
        .configure_mesh()
        .x_desc("Patient")
        .y_desc("Actual-Pred / n")
        .x_label_formatter(&|x| format!("{:.0}", x))
        .draw()?;

    scatter.draw_series(
        residuals
            .iter()
            .enumerate()
            .map(|(i, r)| Circle::new((i as f64, *r), 4, MARKER_BLUE.filled())),
    )?;
    scatter.draw_series(std::iter::once(PathElement::new(
        vec![(-0.5, 0.0), (n - 0.5, 0.0)],
        BLUE,
    )))?;

    root.present()?;
    Ok(())
}

fn draw_actual_vs_predicted(path: &Path, actual: &[f64], predicted: &[f64]) -> DrawResult {
    let root = SVGBackend::new(path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let n = actual.len() as f64;
    let (lo, hi) = padded_range(actual.iter().chain(predicted));
    let mut chart = ChartBuilder::on(&root)
        .caption("Actual vs Predicted", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5..(n - 0.5), lo..hi)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Patient")
        .y_desc("Value")
        .x_label_formatter(&|x| format!("{:.0}", x))
        .draw()?;

    chart
        .draw_series(actual.iter().enumerate().map(|(i, v)| bar(i as f64 - BAR_OFFSET, *v, DEEP_SKY_BLUE)))?
        .label("Actual")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], DEEP_SKY_BLUE.filled()));
    chart
        .draw_series(predicted.iter().enumerate().map(|(i, v)| bar(i as f64 + BAR_OFFSET, *v, STEEL_BLUE)))?
        .label("Predicted")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], STEEL_BLUE.filled()));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn bar(center: f64, value: f64, color: RGBColor) -> Rectangle<(f64, f64)> {
    let half = BAR_WIDTH / 2.0;
    Rectangle::new([(center - half, 0.0), (center + half, value)], color.filled())
}

/// Value range spanning zero, padded by a tenth of its width
fn padded_range<'a>(values: impl IntoIterator<Item = &'a f64>) -> (f64, f64) {
    let (lo, hi) = values
        .into_iter()
        .fold((0.0f64, 0.0f64), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let width = hi - lo;
    if width <= f64::EPSILON {
        (lo - 1.0, hi + 1.0)
    } else {
        (lo - 0.1 * width, hi + 0.1 * width)
    }
}
