//! Sampling strategies for hyperparameter optimization

use super::search_space::{Parameter, ParameterType, ParameterValue, TrialParams};
use rand::prelude::*;
use rand_distr::Normal;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Type of sampler to use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SamplerType {
    /// Random sampling
    Random,
    /// Tree-structured Parzen Estimator
    TPE,
}

/// Trait for hyperparameter samplers.
///
/// `history` holds the parameters and loss of every finished trial; lower loss is better.
pub trait Sampler: Send {
    /// Sample a value for one parameter
    fn sample(&mut self, param: &Parameter, history: &[(TrialParams, f64)]) -> ParameterValue;
}

fn seeded_rng(seed: Option<u64>) -> Xoshiro256PlusPlus {
    match seed {
        Some(s) => Xoshiro256PlusPlus::seed_from_u64(s),
        None => Xoshiro256PlusPlus::from_entropy(),
    }
}

/// Random sampler
#[derive(Debug)]
pub struct RandomSampler {
    rng: Xoshiro256PlusPlus,
}

impl RandomSampler {
    /// Create a new random sampler
    pub fn new(seed: Option<u64>) -> Self {
        Self { rng: seeded_rng(seed) }
    }
}

impl Sampler for RandomSampler {
    fn sample(&mut self, param: &Parameter, _history: &[(TrialParams, f64)]) -> ParameterValue {
        param.sample(&mut self.rng)
    }
}

/// Independent (per-parameter) Tree-structured Parzen Estimator.
///
/// After `n_startup_trials` random draws, observations of a parameter are split
/// into the best `gamma` fraction and the rest. Each group becomes a Parzen
/// mixture; candidates are drawn from the good mixture and the one maximizing
/// `l(x) / g(x)` is returned.
#[derive(Debug)]
pub struct TPESampler {
    rng: Xoshiro256PlusPlus,
    n_startup_trials: usize,
    gamma: f64,
    n_candidates: usize,
}

impl TPESampler {
    /// Create a new TPE sampler
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: seeded_rng(seed),
            n_startup_trials: 10,
            gamma: 0.25,
            n_candidates: 24,
        }
    }

    /// Set number of startup trials
    pub fn with_n_startup(mut self, n: usize) -> Self {
        self.n_startup_trials = n;
        self
    }

    /// Set gamma (quantile for splitting good/bad)
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma.clamp(f64::EPSILON, 1.0);
        self
    }

    /// Set number of candidates drawn from the good mixture
    pub fn with_n_candidates(mut self, n: usize) -> Self {
        self.n_candidates = n.max(1);
        self
    }

    fn split_observations<'a>(
        &self,
        param: &Parameter,
        history: &'a [(TrialParams, f64)],
    ) -> (Vec<&'a ParameterValue>, Vec<&'a ParameterValue>) {
        let mut observed: Vec<(&ParameterValue, f64)> = history
            .iter()
            .filter_map(|(p, loss)| p.get(&param.name).map(|v| (v, *loss)))
            .filter(|(v, _)| param.contains(v))
            .collect();
        observed.sort_by(|a, b| a.1.total_cmp(&b.1));

        let n = observed.len();
        if n == 0 {
            return (Vec::new(), Vec::new());
        }
        let n_below = ((n as f64 * self.gamma).ceil() as usize).clamp(1, n);
        let below = observed[..n_below].iter().map(|(v, _)| *v).collect();
        let above = observed[n_below..].iter().map(|(v, _)| *v).collect();
        (below, above)
    }

    fn sample_numeric(&mut self, bounds: NumericBounds, below: &[f64], above: &[f64]) -> f64 {
        let l = ParzenEstimator::new(below, bounds);
        let g = ParzenEstimator::new(above, bounds);

        let mut best = l.sample(&mut self.rng);
        let mut best_score = f64::NEG_INFINITY;
        for _ in 0..self.n_candidates {
            let candidate = l.sample(&mut self.rng);
            let score = l.log_pdf(candidate) - g.log_pdf(candidate);
            if score > best_score {
                best_score = score;
                best = candidate;
            }
        }
        best
    }

    fn sample_categorical(&mut self, choices: &[String], below: &[&ParameterValue], above: &[&ParameterValue]) -> ParameterValue {
        let weights = |obs: &[&ParameterValue]| -> Vec<f64> {
            let mut w = vec![1.0; choices.len()];
            for v in obs {
                if let Some(idx) = v.as_string().and_then(|s| choices.iter().position(|c| c == s)) {
                    w[idx] += 1.0;
                }
            }
            let total: f64 = w.iter().sum();
            w.iter().map(|x| x / total).collect()
        };
        let l = weights(below);
        let g = weights(above);

        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for _ in 0..self.n_candidates {
            let idx = sample_index(&l, &mut self.rng);
            let score = l[idx].ln() - g[idx].ln();
            if score > best_score {
                best_score = score;
                best = idx;
            }
        }
        ParameterValue::String(choices[best].clone())
    }
}

impl Sampler for TPESampler {
    fn sample(&mut self, param: &Parameter, history: &[(TrialParams, f64)]) -> ParameterValue {
        let n_observed = history.iter().filter(|(p, _)| p.contains_key(&param.name)).count();
        if n_observed < self.n_startup_trials.max(2) {
            return param.sample(&mut self.rng);
        }

        let (below, above) = self.split_observations(param, history);
        if below.is_empty() {
            return param.sample(&mut self.rng);
        }

        match &param.param_type {
            ParameterType::Float { low, high, log_scale } => {
                if low >= high {
                    return ParameterValue::Float(*low);
                }
                let bounds = NumericBounds::new(*low, *high, *log_scale);
                let below: Vec<f64> = below.iter().filter_map(|v| v.as_float()).map(|v| bounds.to_internal(v)).collect();
                let above: Vec<f64> = above.iter().filter_map(|v| v.as_float()).map(|v| bounds.to_internal(v)).collect();
                let x = self.sample_numeric(bounds, &below, &above);
                ParameterValue::Float(bounds.to_external(x).clamp(*low, *high))
            }
            ParameterType::Int { low, high, log_scale } => {
                if low >= high {
                    return ParameterValue::Int(*low);
                }
                // Integers are modelled on a continuous range widened by half a step on each side
                let lo = *low as f64 - 0.5;
                let hi = *high as f64 + 0.5;
                let bounds = if *log_scale {
                    NumericBounds::new(lo.max(0.5), hi, true)
                } else {
                    NumericBounds::new(lo, hi, false)
                };
                let below: Vec<f64> = below.iter().filter_map(|v| v.as_float()).map(|v| bounds.to_internal(v)).collect();
                let above: Vec<f64> = above.iter().filter_map(|v| v.as_float()).map(|v| bounds.to_internal(v)).collect();
                let x = self.sample_numeric(bounds, &below, &above);
                ParameterValue::Int((bounds.to_external(x).round() as i64).clamp(*low, *high))
            }
            ParameterType::Categorical { choices } => self.sample_categorical(choices, &below, &above),
        }
    }
}

fn sample_index(weights: &[f64], rng: &mut impl Rng) -> usize {
    let r: f64 = rng.gen();
    let mut acc = 0.0;
    for (i, w) in weights.iter().enumerate() {
        acc += w;
        if r < acc {
            return i;
        }
    }
    weights.len() - 1
}

/// Numeric domain, possibly log-transformed. `low`/`high` are in internal (transformed) units.
#[derive(Debug, Clone, Copy)]
struct NumericBounds {
    low: f64,
    high: f64,
    log_scale: bool,
}

impl NumericBounds {
    fn new(low: f64, high: f64, log_scale: bool) -> Self {
        if log_scale {
            Self { low: low.ln(), high: high.ln(), log_scale }
        } else {
            Self { low, high, log_scale }
        }
    }

    fn to_internal(&self, v: f64) -> f64 {
        if self.log_scale { v.max(f64::MIN_POSITIVE).ln() } else { v }
    }

    fn to_external(&self, v: f64) -> f64 {
        if self.log_scale { v.exp() } else { v }
    }
}

/// Mixture of truncated Gaussians centred on observations plus a wide prior component
struct ParzenEstimator {
    mus: Vec<f64>,
    sigmas: Vec<f64>,
    bounds: NumericBounds,
}

impl ParzenEstimator {
    fn new(observations: &[f64], bounds: NumericBounds) -> Self {
        let width = bounds.high - bounds.low;
        let prior_mu = 0.5 * (bounds.low + bounds.high);

        let mut mus: Vec<f64> = observations.to_vec();
        mus.push(prior_mu);
        let mut order: Vec<usize> = (0..mus.len()).collect();
        order.sort_by(|&a, &b| mus[a].total_cmp(&mus[b]));

        // Bandwidth of each point is the larger gap to its sorted neighbours (domain edges at the ends)
        let min_sigma = width / (100.0f64).min(1.0 + mus.len() as f64);
        let mut sigmas = vec![width; mus.len()];
        for (rank, &idx) in order.iter().enumerate() {
            let left = if rank == 0 { bounds.low } else { mus[order[rank - 1]] };
            let right = if rank + 1 == order.len() { bounds.high } else { mus[order[rank + 1]] };
            sigmas[idx] = (mus[idx] - left).max(right - mus[idx]).clamp(min_sigma, width);
        }
        let prior_idx = mus.len() - 1;
        sigmas[prior_idx] = width;

        Self { mus, sigmas, bounds }
    }

    fn sample(&self, rng: &mut impl Rng) -> f64 {
        let k = rng.gen_range(0..self.mus.len());
        let (mu, sigma) = (self.mus[k], self.sigmas[k]);
        match Normal::new(mu, sigma) {
            Ok(normal) => {
                for _ in 0..100 {
                    let x = normal.sample(rng);
                    if x >= self.bounds.low && x <= self.bounds.high {
                        return x;
                    }
                }
                mu.clamp(self.bounds.low, self.bounds.high)
            }
            Err(_) => mu.clamp(self.bounds.low, self.bounds.high),
        }
    }

    fn log_pdf(&self, x: f64) -> f64 {
        let weight = 1.0 / self.mus.len() as f64;
        let density: f64 = self
            .mus
            .iter()
            .zip(&self.sigmas)
            .map(|(&mu, &sigma)| {
                let mass = normal_cdf((self.bounds.high - mu) / sigma) - normal_cdf((self.bounds.low - mu) / sigma);
                let z = (x - mu) / sigma;
                let pdf = (-0.5 * z * z).exp() / (sigma * (2.0 * std::f64::consts::PI).sqrt());
                weight * pdf / mass.max(1e-12)
            })
            .sum();
        density.max(1e-300).ln()
    }
}

fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Abramowitz and Stegun 7.1.26, absolute error below 1.5e-7
fn erf(x: f64) -> f64 {
    let sign = x.signum();
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.3275911 * x);
    let poly = t * (0.254829592 + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    sign * (1.0 - poly * (-x * x).exp())
}

/// Create a sampler from type
pub fn create_sampler(sampler_type: SamplerType, seed: Option<u64>, n_startup_trials: usize) -> Box<dyn Sampler> {
    match sampler_type {
        SamplerType::Random => Box::new(RandomSampler::new(seed)),
        SamplerType::TPE => Box::new(TPESampler::new(seed).with_n_startup(n_startup_trials)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_for(name: &str, values: &[(i64, f64)]) -> Vec<(TrialParams, f64)> {
        values
            .iter()
            .map(|&(v, loss)| {
                let mut p = TrialParams::new();
                p.insert(name.to_string(), ParameterValue::Int(v));
                (p, loss)
            })
            .collect()
    }

    #[test]
    fn test_random_sampler() {
        let param = Parameter::float("lr", 0.001, 0.1);
        let mut sampler = RandomSampler::new(Some(42));
        let v = sampler.sample(&param, &[]).as_float().unwrap();
        assert!((0.001..=0.1).contains(&v));
    }

    #[test]
    fn test_samplers_are_seeded() {
        let param = Parameter::int("num_leaves", 2, 256);
        let mut a = RandomSampler::new(Some(7));
        let mut b = RandomSampler::new(Some(7));
        for _ in 0..10 {
            assert_eq!(a.sample(&param, &[]), b.sample(&param, &[]));
        }
    }

    #[test]
    fn test_tpe_respects_bounds_after_startup() {
        let param = Parameter::int("num_leaves", 2, 256);
        let history = history_for("num_leaves", &[
            (2, 5.0), (10, 4.0), (40, 3.0), (80, 1.0), (90, 0.5),
            (100, 0.7), (150, 2.0), (200, 6.0), (250, 7.0), (256, 8.0),
        ]);
        let mut sampler = TPESampler::new(Some(42)).with_n_startup(5);
        for _ in 0..200 {
            let v = sampler.sample(&param, &history);
            assert!(param.contains(&v), "{:?} out of bounds", v);
        }
    }

    #[test]
    fn test_tpe_concentrates_near_good_region() {
        let param = Parameter::float("x", 0.0, 10.0);
        let history: Vec<(TrialParams, f64)> = (0..40)
            .map(|i| {
                let x = i as f64 * 0.25;
                let mut p = TrialParams::new();
                p.insert("x".to_string(), ParameterValue::Float(x));
                (p, (x - 2.0).powi(2))
            })
            .collect();

        let mut sampler = TPESampler::new(Some(3)).with_n_startup(10);
        let samples: Vec<f64> = (0..100)
            .map(|_| sampler.sample(&param, &history).as_float().unwrap())
            .collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!(mean < 5.0, "TPE mean {} not pulled toward the optimum", mean);
        assert!(samples.iter().all(|&x| (0.0..=10.0).contains(&x)));
    }

    #[test]
    fn test_tpe_categorical() {
        let param = Parameter::categorical("kind", &["a", "b"]);
        let history: Vec<(TrialParams, f64)> = (0..20)
            .map(|i| {
                let mut p = TrialParams::new();
                let kind = if i % 2 == 0 { "a" } else { "b" };
                p.insert("kind".to_string(), ParameterValue::String(kind.to_string()));
                (p, if kind == "a" { 0.0 } else { 1.0 })
            })
            .collect();
        let mut sampler = TPESampler::new(Some(1)).with_n_startup(5);
        assert_eq!(sampler.sample(&param, &history).as_string(), Some("a"));
    }

    #[test]
    fn test_tpe_builder_limits() {
        let sampler = TPESampler::new(Some(1)).with_gamma(0.0).with_n_candidates(0);
        assert_eq!(sampler.gamma, f64::EPSILON);
        assert_eq!(sampler.n_candidates, 1);

        let sampler = TPESampler::new(Some(1)).with_gamma(3.0).with_n_candidates(64);
        assert_eq!(sampler.gamma, 1.0);
        assert_eq!(sampler.n_candidates, 64);
    }

    #[test]
    fn test_tpe_single_candidate_stays_in_bounds() {
        let param = Parameter::int("min_child_samples", 2, 6);
        let history = history_for("min_child_samples", &[
            (2, 1.0), (3, 0.5), (4, 0.2), (5, 0.9), (6, 2.0), (4, 0.3),
        ]);
        let mut sampler = TPESampler::new(Some(8))
            .with_n_startup(2)
            .with_gamma(0.5)
            .with_n_candidates(1);
        for _ in 0..100 {
            let v = sampler.sample(&param, &history);
            assert!(param.contains(&v), "{:?} out of bounds", v);
        }
    }

    #[test]
    fn test_erf_reference_values() {
        assert!((erf(0.0)).abs() < 1e-7);
        assert!((erf(1.0) - 0.842_700_79).abs() < 1e-6);
        assert!((erf(-1.0) + 0.842_700_79).abs() < 1e-6);
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
    }
}
