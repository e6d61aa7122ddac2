//! Command-line interface: tune or evaluate on a CSV file, then report.

pub mod report;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::optimizer::{OptimizationConfig, SamplerType};
use crate::training::{Dataset, EvaluationResult, HyperparameterConfig, LooEvaluator};
use crate::tuning::{LooObjective, TuningDriver};
use crate::utils::DataLoader;
use crate::visualization::{render_charts, ReportConfig};

pub const DEFAULT_DATA: &str = "selected_features.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "plots";

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) {
    println!("  {:<14} {}", muted(key), val.white());
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "loo-boost")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Leave-one-out evaluation and tuning of gradient-boosted regression trees")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search hyperparameters, then evaluate and report the best configuration
    Tune(TuneArgs),

    /// Evaluate and report one fixed configuration
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TuneArgs {
    /// CSV file: identifier column, feature columns, target column last
    #[arg(short, long, default_value = DEFAULT_DATA)]
    pub data: PathBuf,

    /// Number of trials
    #[arg(short = 'n', long, default_value_t = 100)]
    pub trials: usize,

    /// Sampler (tpe, random)
    #[arg(long, default_value = "tpe")]
    pub sampler: String,

    /// Seed for the sampler and every model
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Directory for the SVG charts
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Skip chart rendering
    #[arg(long)]
    pub no_plots: bool,

    /// Re-read the data file on every trial instead of caching it
    #[arg(long)]
    pub reload_each_trial: bool,
}

impl Default for TuneArgs {
    fn default() -> Self {
        Self {
            data: PathBuf::from(DEFAULT_DATA),
            trials: 100,
            sampler: "tpe".to_string(),
            seed: 42,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            no_plots: false,
            reload_each_trial: false,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    /// CSV file: identifier column, feature columns, target column last
    #[arg(short, long, default_value = DEFAULT_DATA)]
    pub data: PathBuf,

    #[arg(long, default_value_t = 100)]
    pub n_estimators: usize,

    #[arg(long, default_value_t = 31)]
    pub num_leaves: usize,

    #[arg(long, default_value_t = 0.1)]
    pub learning_rate: f64,

    /// Values <= 0 leave depth unlimited
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub max_depth: i32,

    #[arg(long, default_value_t = 20)]
    pub min_child_samples: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Directory for the SVG charts
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Skip chart rendering
    #[arg(long)]
    pub no_plots: bool,
}

impl EvaluateArgs {
    pub fn hyperparameters(&self) -> HyperparameterConfig {
        HyperparameterConfig::new()
            .with_n_estimators(self.n_estimators)
            .with_num_leaves(self.num_leaves)
            .with_learning_rate(self.learning_rate)
            .with_max_depth(self.max_depth)
            .with_min_child_samples(self.min_child_samples)
            .with_random_state(self.seed)
    }
}

pub fn parse_sampler(name: &str) -> anyhow::Result<SamplerType> {
    match name.to_ascii_lowercase().as_str() {
        "tpe" => Ok(SamplerType::TPE),
        "random" => Ok(SamplerType::Random),
        _ => anyhow::bail!("Invalid sampler: {} (expected tpe or random)", name),
    }
}

// ─── Data loading ──────────────────────────────────────────────────────────────

pub fn load_data(path: &Path) -> anyhow::Result<Dataset> {
    step_run("Loading data");
    let start = Instant::now();
    let dataset = DataLoader::new()
        .load_dataset(path)
        .with_context(|| format!("failed to load dataset from {}", path.display()))?;
    step_done(&format!(
        "{} rows × {} features in {:?}",
        dataset.n_samples(),
        dataset.n_features(),
        start.elapsed()
    ));
    Ok(dataset)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_tune(args: &TuneArgs) -> anyhow::Result<()> {
    section("Tune");
    let sampler = parse_sampler(&args.sampler)?;
    let dataset = load_data(&args.data)?;

    kv("Trials", &args.trials.to_string());
    kv("Sampler", &format!("{:?}", sampler));
    kv("Data source", if args.reload_each_trial { "reloaded per trial" } else { "cached" });
    println!();

    let config = OptimizationConfig::new()
        .with_n_trials(args.trials)
        .with_sampler(sampler)
        .with_random_state(Some(args.seed));
    let driver = TuningDriver::new(config).with_model_seed(args.seed);

    let start = Instant::now();
    let outcome = if args.reload_each_trial {
        let mut objective = LooObjective::reloading(&args.data, DataLoader::new()).with_random_state(args.seed);
        driver.run_with_objective(&dataset, &mut objective)
    } else {
        driver.run(&dataset)
    }
    .context("hyperparameter search failed")?;
    tracing::info!(trials = outcome.trials.len(), elapsed = ?start.elapsed(), "Tuning finished");

    finish(&outcome.evaluation, args.no_plots, &args.output_dir)
}

pub fn cmd_evaluate(args: &EvaluateArgs) -> anyhow::Result<()> {
    section("Evaluate");
    let dataset = load_data(&args.data)?;
    let config = args.hyperparameters();

    kv("n_estimators", &config.n_estimators.to_string());
    kv("num_leaves", &config.num_leaves.to_string());
    kv("learning_rate", &config.learning_rate.to_string());
    kv("max_depth", &config.max_depth.to_string());
    kv("min_child_samples", &config.min_child_samples.to_string());
    println!();

    let evaluation = LooEvaluator::new(config)
        .with_progress(true)
        .evaluate(&dataset)
        .context("leave-one-out evaluation failed")?;

    finish(&evaluation, args.no_plots, &args.output_dir)
}

fn finish(evaluation: &EvaluationResult, no_plots: bool, output_dir: &Path) -> anyhow::Result<()> {
    report::print_report(evaluation).context("failed to write report")?;

    let report_config = ReportConfig::new()
        .with_output_dir(output_dir)
        .with_render_charts(!no_plots);
    let written = render_charts(evaluation, &report_config).context("failed to render charts")?;
    for path in &written {
        step_ok(&format!("Wrote {}", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sampler() {
        assert!(matches!(parse_sampler("tpe").unwrap(), SamplerType::TPE));
        assert!(matches!(parse_sampler("Random").unwrap(), SamplerType::Random));
        assert!(parse_sampler("grid").is_err());
    }

    #[test]
    fn test_tune_defaults() {
        let cli = Cli::parse_from(["loo-boost", "tune"]);
        match cli.command {
            Some(Commands::Tune(args)) => {
                let defaults = TuneArgs::default();
                assert_eq!(args.data, defaults.data);
                assert_eq!(args.trials, defaults.trials);
                assert_eq!(args.sampler, defaults.sampler);
                assert_eq!(args.output_dir, defaults.output_dir);
                assert!(!args.no_plots);
                assert!(!args.reload_each_trial);
            }
            _ => panic!("expected tune"),
        }
    }

    #[test]
    fn test_no_command() {
        let cli = Cli::parse_from(["loo-boost"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_evaluate_negative_depth() {
        let cli = Cli::parse_from(["loo-boost", "evaluate", "--max-depth", "-1", "--learning-rate", "0.05"]);
        match cli.command {
            Some(Commands::Evaluate(args)) => {
                let config = args.hyperparameters();
                assert_eq!(config.max_depth, -1);
                assert_eq!(config.learning_rate, 0.05);
                assert_eq!(config.n_estimators, 100);
            }
            _ => panic!("expected evaluate"),
        }
    }
}
