//! LightGBM-style gradient boosting with leaf-wise tree growth
//!
//! Key differences from level-wise gradient boosting:
//! - Leaf-wise (best-first) growth bounded by `max_leaves` rather than depth
//! - Optional Gradient-based One-Side Sampling (GOSS): keeps the largest
//!   gradients, samples the rest and re-weights them
//! - Split-count or gain feature importances, accumulated while fitting

use super::config::BoostingType;
use crate::error::{LooError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// How feature importances are accumulated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ImportanceType {
    /// Number of splits that use the feature
    #[default]
    Split,
    /// Total gain of the splits that use the feature
    Gain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightGBMConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_leaves: usize,
    pub max_depth: Option<usize>,
    pub min_child_samples: usize,
    pub reg_lambda: f64,
    pub reg_alpha: f64,
    pub boosting_type: BoostingType,
    pub top_rate: f64,
    pub other_rate: f64,
    pub importance_type: ImportanceType,
    pub random_state: Option<u64>,
}

impl Default for LightGBMConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_leaves: 31,
            max_depth: None,
            min_child_samples: 20,
            reg_lambda: 0.0,
            reg_alpha: 0.0,
            boosting_type: BoostingType::Gbdt,
            top_rate: 0.2,
            other_rate: 0.1,
            importance_type: ImportanceType::Split,
            random_state: Some(42),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum LGBNode {
    Leaf { value: f64 },
    Split {
        feature: usize,
        threshold: f64,
        gain: f64,
        left: Box<LGBNode>,
        right: Box<LGBNode>,
    },
}

impl LGBNode {
    fn predict(&self, sample: &ArrayView1<f64>) -> f64 {
        match self {
            LGBNode::Leaf { value } => *value,
            LGBNode::Split { feature, threshold, left, right, .. } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }

    fn accumulate_importance(&self, kind: ImportanceType, out: &mut [f64]) {
        if let LGBNode::Split { feature, gain, left, right, .. } = self {
            out[*feature] += match kind {
                ImportanceType::Split => 1.0,
                ImportanceType::Gain => *gain,
            };
            left.accumulate_importance(kind, out);
            right.accumulate_importance(kind, out);
        }
    }

    #[cfg(test)]
    fn n_leaves(&self) -> usize {
        match self {
            LGBNode::Leaf { .. } => 1,
            LGBNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }

    #[cfg(test)]
    fn depth(&self) -> usize {
        match self {
            LGBNode::Leaf { .. } => 0,
            LGBNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

// ---- Tree building utilities ----

fn compute_leaf_weight(g: f64, h: f64, lambda: f64, alpha: f64) -> f64 {
    let g_adj = if g.abs() <= alpha { 0.0 } else { g - alpha * g.signum() };
    let denom = h + lambda;
    if denom <= 0.0 { 0.0 } else { -g_adj / denom }
}

fn compute_gain_single(g: f64, h: f64, lambda: f64) -> f64 {
    let denom = h + lambda;
    if denom <= 0.0 { 0.0 } else { g * g / denom }
}

fn make_leaf(gradients: &[f64], hessians: &[f64], indices: &[usize], lambda: f64, alpha: f64) -> LGBNode {
    let g: f64 = indices.iter().map(|&i| gradients[i]).sum();
    let h: f64 = indices.iter().map(|&i| hessians[i]).sum();
    LGBNode::Leaf { value: compute_leaf_weight(g, h, lambda, alpha) }
}

struct SplitCandidate {
    gain: f64,
    node_id: usize,
    feature: usize,
    threshold: f64,
    left_indices: Vec<usize>,
    right_indices: Vec<usize>,
}

impl PartialEq for SplitCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for SplitCandidate {}
impl PartialOrd for SplitCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for SplitCandidate {
    // Equal gains pop in node creation order
    fn cmp(&self, other: &Self) -> Ordering {
        self.gain
            .partial_cmp(&other.gain)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node_id.cmp(&self.node_id))
    }
}

struct FeatureSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
    left_indices: Vec<usize>,
    right_indices: Vec<usize>,
}

fn find_best_split_for_feature(
    x: &Array2<f64>, gradients: &[f64], hessians: &[f64],
    indices: &[usize], feature: usize, reg_lambda: f64, min_child_samples: usize,
) -> Option<FeatureSplit> {
    if indices.len() < 2 {
        return None;
    }
    let mut sorted: Vec<(usize, f64)> = indices.iter().map(|&i| (i, x[[i, feature]])).collect();
    sorted.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let total_g: f64 = indices.iter().map(|&i| gradients[i]).sum();
    let total_h: f64 = indices.iter().map(|&i| hessians[i]).sum();
    let base_score = compute_gain_single(total_g, total_h, reg_lambda);

    let mut left_g = 0.0;
    let mut left_h = 0.0;
    let mut best_gain = f64::NEG_INFINITY;
    let mut best_threshold = 0.0;
    let mut best_pos = 0;

    for i in 0..sorted.len() - 1 {
        left_g += gradients[sorted[i].0];
        left_h += hessians[sorted[i].0];

        if i + 1 < min_child_samples || sorted.len() - i - 1 < min_child_samples {
            continue;
        }
        if sorted[i].1 == sorted[i + 1].1 {
            continue;
        }

        let right_g = total_g - left_g;
        let right_h = total_h - left_h;
        let gain = compute_gain_single(left_g, left_h, reg_lambda)
            + compute_gain_single(right_g, right_h, reg_lambda)
            - base_score;

        if gain > best_gain {
            best_gain = gain;
            best_threshold = (sorted[i].1 + sorted[i + 1].1) / 2.0;
            best_pos = i + 1;
        }
    }

    if best_gain <= 0.0 {
        return None;
    }

    Some(FeatureSplit {
        feature,
        threshold: best_threshold,
        gain: best_gain,
        left_indices: sorted[..best_pos].iter().map(|&(i, _)| i).collect(),
        right_indices: sorted[best_pos..].iter().map(|&(i, _)| i).collect(),
    })
}

/// Best split of `indices` over the candidate features.
/// Candidates are reduced in feature order so equal gains resolve the same way on every run.
fn find_best_split(
    x: &Array2<f64>, gradients: &[f64], hessians: &[f64], indices: &[usize],
    features: &[usize], config: &LightGBMConfig,
) -> Option<FeatureSplit> {
    let per_feature: Vec<Option<FeatureSplit>> = features
        .par_iter()
        .map(|&feat| {
            find_best_split_for_feature(
                x, gradients, hessians, indices, feat, config.reg_lambda, config.min_child_samples,
            )
        })
        .collect();

    per_feature.into_iter().flatten().fold(None, |best: Option<FeatureSplit>, cand| match best {
        Some(b) if b.gain >= cand.gain => Some(b),
        _ => Some(cand),
    })
}

/// Build tree using leaf-wise (best-first) strategy
fn build_lgb_tree(
    x: &Array2<f64>, gradients: &[f64], hessians: &[f64],
    indices: &[usize], config: &LightGBMConfig,
) -> LGBNode {
    if indices.len() < config.min_child_samples * 2 {
        return make_leaf(gradients, hessians, indices, config.reg_lambda, config.reg_alpha);
    }

    let feature_indices: Vec<usize> = (0..x.ncols()).collect();

    enum NodeSlot {
        Leaf(Vec<usize>),
        Split { feature: usize, threshold: f64, gain: f64, left: usize, right: usize },
    }

    let mut nodes: Vec<NodeSlot> = vec![NodeSlot::Leaf(indices.to_vec())];
    let mut depths: Vec<usize> = vec![0];
    let mut heap: BinaryHeap<SplitCandidate> = BinaryHeap::new();
    let max_depth_limit = config.max_depth.unwrap_or(usize::MAX);

    if max_depth_limit > 0 {
        if let Some(best) = find_best_split(x, gradients, hessians, indices, &feature_indices, config) {
            heap.push(SplitCandidate {
                gain: best.gain, node_id: 0, feature: best.feature, threshold: best.threshold,
                left_indices: best.left_indices, right_indices: best.right_indices,
            });
        }
    }

    let mut n_leaves = 1usize;

    while n_leaves < config.max_leaves {
        let split = match heap.pop() {
            Some(s) if s.gain > 0.0 => s,
            _ => break,
        };

        let depth = depths[split.node_id];
        let left_id = nodes.len();
        let right_id = nodes.len() + 1;

        nodes[split.node_id] = NodeSlot::Split {
            feature: split.feature, threshold: split.threshold, gain: split.gain,
            left: left_id, right: right_id,
        };
        depths.push(depth + 1);
        depths.push(depth + 1);
        n_leaves += 1;

        if depth + 1 < max_depth_limit {
            for (child_id, child_indices) in [(left_id, &split.left_indices), (right_id, &split.right_indices)] {
                if child_indices.len() < config.min_child_samples * 2 {
                    continue;
                }
                if let Some(best) = find_best_split(x, gradients, hessians, child_indices, &feature_indices, config) {
                    heap.push(SplitCandidate {
                        gain: best.gain, node_id: child_id, feature: best.feature, threshold: best.threshold,
                        left_indices: best.left_indices, right_indices: best.right_indices,
                    });
                }
            }
        }

        nodes.push(NodeSlot::Leaf(split.left_indices));
        nodes.push(NodeSlot::Leaf(split.right_indices));
    }

    fn to_node(nodes: &[NodeSlot], idx: usize, g: &[f64], h: &[f64], lam: f64, alpha: f64) -> LGBNode {
        match &nodes[idx] {
            NodeSlot::Leaf(indices) => make_leaf(g, h, indices, lam, alpha),
            NodeSlot::Split { feature, threshold, gain, left, right } => LGBNode::Split {
                feature: *feature, threshold: *threshold, gain: *gain,
                left: Box::new(to_node(nodes, *left, g, h, lam, alpha)),
                right: Box::new(to_node(nodes, *right, g, h, lam, alpha)),
            },
        }
    }
    to_node(&nodes, 0, gradients, hessians, config.reg_lambda, config.reg_alpha)
}

/// GOSS row selection. Returns the selected rows and the weight to apply to each row's
/// gradient and hessian (1 for large-gradient rows, `(1 - a) / b` for sampled ones).
fn goss_sample(gradients: &[f64], top_rate: f64, other_rate: f64, rng: &mut Xoshiro256PlusPlus) -> (Vec<usize>, Vec<f64>) {
    let n = gradients.len();
    let n_top = ((n as f64 * top_rate).ceil() as usize).min(n);
    let n_other = (n as f64 * other_rate).ceil() as usize;
    let mut sorted: Vec<usize> = (0..n).collect();
    sorted.sort_by(|&a, &b| gradients[b].abs().partial_cmp(&gradients[a].abs()).unwrap_or(Ordering::Equal));

    let mut weights = vec![0.0; n];
    let mut selected: Vec<usize> = sorted[..n_top].to_vec();
    for &i in &selected {
        weights[i] = 1.0;
    }

    let mut remaining: Vec<usize> = sorted[n_top..].to_vec();
    remaining.shuffle(rng);
    let amplify = if other_rate > 0.0 { (1.0 - top_rate) / other_rate } else { 1.0 };
    for &i in remaining.iter().take(n_other) {
        weights[i] = amplify;
        selected.push(i);
    }
    selected.sort_unstable();
    (selected, weights)
}

// ============ LightGBM Regressor ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightGBMRegressor {
    pub config: LightGBMConfig,
    trees: Vec<LGBNode>,
    base_prediction: f64,
    n_features: usize,
    feature_importances: Array1<f64>,
}

impl LightGBMRegressor {
    pub fn new(config: LightGBMConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_prediction: 0.0,
            n_features: 0,
            feature_importances: Array1::zeros(0),
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n = x.nrows();
        if n == 0 {
            return Err(LooError::TrainingError("Empty dataset".into()));
        }
        if y.len() != n {
            return Err(LooError::ShapeError {
                expected: format!("{} targets", n),
                actual: format!("{} targets", y.len()),
            });
        }

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };
        self.n_features = x.ncols();
        self.trees.clear();
        self.base_prediction = y.mean().unwrap_or(0.0);
        let mut importances = vec![0.0; self.n_features];
        let mut predictions = Array1::from_elem(n, self.base_prediction);

        for _ in 0..self.config.n_estimators {
            let mut gradients: Vec<f64> = predictions.iter().zip(y.iter()).map(|(&p, &yi)| p - yi).collect();
            let mut hessians: Vec<f64> = vec![1.0; n];

            let indices = match self.config.boosting_type {
                BoostingType::Goss if self.config.top_rate + self.config.other_rate < 1.0 => {
                    let (idx, weights) = goss_sample(&gradients, self.config.top_rate, self.config.other_rate, &mut rng);
                    for &i in &idx {
                        gradients[i] *= weights[i];
                        hessians[i] *= weights[i];
                    }
                    idx
                }
                _ => (0..n).collect(),
            };

            let tree = build_lgb_tree(x, &gradients, &hessians, &indices, &self.config);
            tree.accumulate_importance(self.config.importance_type, &mut importances);
            for (i, row) in x.rows().into_iter().enumerate() {
                predictions[i] += self.config.learning_rate * tree.predict(&row);
            }
            self.trees.push(tree);
        }

        self.feature_importances = Array1::from_vec(importances);
        tracing::debug!(
            n_samples = n,
            n_trees = self.trees.len(),
            "Fitted boosted regressor"
        );
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() && self.n_features == 0 {
            return Err(LooError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(LooError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.rows().into_iter().map(|row| self.predict_row(&row)).collect())
    }

    fn predict_row(&self, row: &ArrayView1<f64>) -> f64 {
        self.base_prediction
            + self.trees.iter().map(|t| self.config.learning_rate * t.predict(row)).sum::<f64>()
    }

    /// Per-feature importances of the fitted ensemble, `None` before `fit`
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        if self.n_features == 0 {
            return None;
        }
        Some(&self.feature_importances)
    }
}
