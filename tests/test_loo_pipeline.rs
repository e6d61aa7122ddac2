//! Integration test: load, leave-one-out evaluation, tuning and charts end-to-end

use approx::assert_relative_eq;
use loo_boost::optimizer::{Objective, OptimizationConfig, SamplerType, Trial};
use loo_boost::training::{normalized_residuals, Dataset, HyperparameterConfig, LooEvaluator};
use loo_boost::tuning::{LooObjective, TuningDriver};
use loo_boost::utils::DataLoader;
use loo_boost::visualization::{render_charts, ReportConfig};
use ndarray::array;
use polars::prelude::*;
use std::io::Write;

fn patients_df() -> DataFrame {
    df!(
        "patient" => &["p01", "p02", "p03", "p04", "p05", "p06",
                       "p07", "p08", "p09", "p10", "p11", "p12"],
        "age" => &[34.0, 51.0, 29.0, 62.0, 45.0, 38.0, 57.0, 41.0, 66.0, 23.0, 49.0, 54.0],
        "bmi" => &[22.1, 27.4, 20.3, 31.0, 25.6, 23.9, 29.8, 24.4, 33.2, 19.7, 26.1, 28.5],
        "score" => &[1.2, 2.8, 1.0, 3.9, 2.1, 1.6, 3.3, 1.9, 4.4, 0.8, 2.4, 3.0]
    )
    .unwrap()
}

fn small_config() -> HyperparameterConfig {
    HyperparameterConfig::new()
        .with_n_estimators(30)
        .with_num_leaves(4)
        .with_learning_rate(0.2)
        .with_min_child_samples(2)
}

fn write_csv(df: &mut DataFrame) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    CsvWriter::new(&mut file).include_header(true).finish(df).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_dataset_from_dataframe() {
    let ds = Dataset::from_dataframe(&patients_df()).unwrap();
    assert_eq!(ds.n_samples(), 12);
    assert_eq!(ds.feature_names(), &["age".to_string(), "bmi".to_string()]);
    assert_eq!(ds.target_name(), "score");
}

#[test]
fn test_loo_fold_counts_and_mean() {
    let ds = Dataset::from_dataframe(&patients_df()).unwrap();
    let result = LooEvaluator::new(small_config()).evaluate(&ds).unwrap();

    assert_eq!(result.fold_errors.len(), 12);
    assert_eq!(result.feature_importances.len(), 12);
    assert!(result.feature_importances.iter().all(|fi| fi.len() == 2));
    assert_eq!(result.predicted.len(), 12);
    assert_eq!(result.actual, *ds.target());

    let mean = result.fold_errors.iter().sum::<f64>() / 12.0;
    assert_relative_eq!(result.mean_rmse, mean, epsilon = 1e-12);
}

#[test]
fn test_loo_is_deterministic() {
    let ds = Dataset::from_dataframe(&patients_df()).unwrap();
    let a = LooEvaluator::new(small_config()).evaluate(&ds).unwrap();
    let b = LooEvaluator::new(small_config()).evaluate(&ds).unwrap();
    assert_eq!(a.fold_errors, b.fold_errors);
    assert_eq!(a.predicted, b.predicted);
}

#[test]
fn test_three_rows_predict_from_the_other_two() {
    let df = df!(
        "id" => &["a", "b", "c"],
        "x1" => &[1.0, 2.0, 3.0],
        "x2" => &[5.0, 3.0, 4.0],
        "y" => &[10.0, 20.0, 40.0]
    )
    .unwrap();
    let ds = Dataset::from_dataframe(&df).unwrap();

    // Two training rows cannot be split with two rows per leaf
    let result = LooEvaluator::new(small_config()).evaluate(&ds).unwrap();
    assert_relative_eq!(result.predicted[0], 30.0, epsilon = 1e-9);
    assert_relative_eq!(result.predicted[1], 25.0, epsilon = 1e-9);
    assert_relative_eq!(result.predicted[2], 15.0, epsilon = 1e-9);
    assert_relative_eq!(result.fold_errors[2], 25.0, epsilon = 1e-9);
}

#[test]
fn test_normalized_residuals_divide_by_n() {
    let r = normalized_residuals(&array![1.0, 2.0, 3.0], &array![1.2, 1.8, 3.1]);
    assert_relative_eq!(r[0], -0.0667, epsilon = 1e-4);
    assert_relative_eq!(r[1], 0.0667, epsilon = 1e-4);
    assert_relative_eq!(r[2], -0.0333, epsilon = 1e-4);
}

#[test]
fn test_csv_roundtrip_into_dataset() {
    let mut df = patients_df();
    let file = write_csv(&mut df);
    let ds = DataLoader::new().load_dataset(file.path()).unwrap();
    assert_eq!(ds, Dataset::from_dataframe(&patients_df()).unwrap());
}

#[test]
fn test_tuning_budget_and_best() {
    let ds = Dataset::from_dataframe(&patients_df()).unwrap();
    let mut inner = LooObjective::cached(ds.clone());
    let mut calls = 0;
    let mut objective = |trial: &mut Trial<'_>| {
        calls += 1;
        inner.evaluate(trial)
    };

    let config = OptimizationConfig::new()
        .with_n_trials(5)
        .with_sampler(SamplerType::Random)
        .with_random_state(Some(7))
        .with_verbose(false);
    let outcome = TuningDriver::new(config).run_with_objective(&ds, &mut objective).unwrap();

    assert_eq!(calls, 5);
    assert_eq!(outcome.trials.len(), 5);
    let min = outcome.trials.iter().map(|t| t.value).fold(f64::INFINITY, f64::min);
    assert_eq!(outcome.best_value, min);
    assert!((50..=500).contains(&outcome.best_config.n_estimators));
    assert!((2..=6).contains(&outcome.best_config.min_child_samples));

    // The final run repeats the best trial's evaluation
    assert_relative_eq!(outcome.evaluation.mean_rmse, outcome.best_value, epsilon = 1e-12);
}

#[test]
fn test_reloading_objective_matches_cached() {
    let mut df = patients_df();
    let file = write_csv(&mut df);
    let ds = DataLoader::new().load_dataset(file.path()).unwrap();

    let config = OptimizationConfig::new()
        .with_n_trials(2)
        .with_sampler(SamplerType::Random)
        .with_random_state(Some(1))
        .with_verbose(false);
    let driver = TuningDriver::new(config);

    let cached = driver.run(&ds).unwrap();
    let mut reloading = LooObjective::reloading(file.path(), DataLoader::new());
    let reloaded = driver.run_with_objective(&ds, &mut reloading).unwrap();

    assert_eq!(cached.best_value, reloaded.best_value);
    assert_eq!(cached.best_params, reloaded.best_params);
}

#[test]
fn test_report_charts_written() {
    let ds = Dataset::from_dataframe(&patients_df()).unwrap();
    let result = LooEvaluator::new(small_config()).evaluate(&ds).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let config = ReportConfig::new().with_output_dir(dir.path());
    let paths = render_charts(&result, &config).unwrap();

    assert_eq!(paths.len(), 2);
    for path in paths {
        let svg = std::fs::read_to_string(path).unwrap();
        assert!(svg.contains("<svg"));
    }
}
