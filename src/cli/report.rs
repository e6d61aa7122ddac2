//! Console report of a leave-one-out evaluation

use crate::training::EvaluationResult;
use colored::*;
use std::io::Write;

pub const HEADER: &str = "------------ LightGBM ------------";

/// Shortest round-trip form, keeping a `.0` on integral values
pub fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

pub fn round4(v: f64) -> f64 {
    (v * 1e4).round() / 1e4
}

fn value_line<I>(label: &str, values: I) -> String
where
    I: IntoIterator<Item = f64>,
{
    let mut line = format!("{} ", label);
    for v in values {
        line.push_str(", ");
        line.push_str(&format_float(v));
    }
    line
}

/// Report lines in print order, without styling
pub fn report_lines(result: &EvaluationResult) -> Vec<String> {
    vec![
        HEADER.to_string(),
        format!("RMSE:  {}", format_float(result.mean_rmse)),
        value_line("Feature Importance Values:", result.mean_feature_importances().iter().copied()),
        value_line("Actual:", result.actual.iter().map(|v| round4(*v))),
        value_line("Predct:", result.predicted.iter().map(|v| round4(*v))),
    ]
}

pub fn print_report(result: &EvaluationResult) -> std::io::Result<()> {
    write_report(result, &mut std::io::stdout().lock())
}

/// Report lines followed by the styled MAE and R² summary
pub fn write_report<W: Write>(result: &EvaluationResult, out: &mut W) -> std::io::Result<()> {
    for line in report_lines(result) {
        writeln!(out, "{}", line)?;
    }

    let metrics = result.metrics();
    writeln!(out)?;
    writeln!(out, "  {:<8} {}", "MAE".truecolor(140, 140, 140), format!("{:.4}", metrics.mae).white().bold())?;
    match metrics.r2 {
        Some(r2) => writeln!(out, "  {:<8} {}", "R²".truecolor(140, 140, 140), format!("{:.4}", r2).white().bold())?,
        None => writeln!(out, "  {:<8} {}", "R²".truecolor(140, 140, 140), "undefined".yellow())?,
    }
    writeln!(out)
}
