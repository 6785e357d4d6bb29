//! CART (Classification and Regression Tree) builder
//!
//! Exact-greedy regression tree construction on the squared-error
//! criterion. Candidate thresholds are midpoints between adjacent distinct
//! feature values. Ties between equally good splits keep the first one
//! found, i.e. the lowest feature index and then the lowest threshold.

use crate::errors::{Result, TrainerError};
use superfund_ai_core::forest::{Node, Tree};

/// Improvements at or below this are treated as no improvement
const MIN_IMPROVEMENT: f64 = 1e-12;

/// Growth limits for a single tree
#[derive(Clone, Debug, PartialEq)]
pub struct TreeConfig {
    /// `None` grows until leaves are pure or too small to split
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

/// Split candidate with its score
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    /// sum_l^2 / n_l + sum_r^2 / n_r, larger is better
    score: f64,
}

/// Builds one regression tree over a (possibly repeated) set of row indices
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<f64>],
    targets: &'a [f64],
    feature_count: usize,
}

impl<'a> CartBuilder<'a> {
    pub fn new(features: &'a [Vec<f64>], targets: &'a [f64], config: TreeConfig) -> Result<Self> {
        if features.len() != targets.len() {
            return Err(TrainerError::Training(format!(
                "{} feature rows but {} targets",
                features.len(),
                targets.len()
            )));
        }

        let feature_count = features.first().map(Vec::len).unwrap_or(0);
        if let Some(row) = features.iter().position(|row| row.len() != feature_count) {
            return Err(TrainerError::Training(format!(
                "row {row} has {} features, expected {feature_count}",
                features[row].len()
            )));
        }

        Ok(Self {
            config,
            features,
            targets,
            feature_count,
        })
    }

    /// Build a tree from every row once.
    pub fn build(&self) -> Tree {
        let indices: Vec<usize> = (0..self.targets.len()).collect();
        self.build_from(indices)
    }

    /// Build a tree from the given rows. Repeated indices act as weights,
    /// which is how bootstrap samples are fed in.
    pub fn build_from(&self, indices: Vec<usize>) -> Tree {
        let mut nodes = Vec::new();
        if indices.is_empty() {
            nodes.push(Node::leaf(0.0));
        } else {
            self.build_node(indices, 0, &mut nodes);
        }
        Tree::new(nodes)
    }

    /// Recursively build tree nodes, parent before children
    fn build_node(&self, indices: Vec<usize>, depth: usize, nodes: &mut Vec<Node>) -> i32 {
        let current_idx = nodes.len();
        let leaf_value = self.mean_target(&indices);

        let depth_exhausted = self
            .config
            .max_depth
            .map(|max| depth >= max)
            .unwrap_or(false);

        if depth_exhausted
            || indices.len() < self.config.min_samples_split
            || indices.len() < 2 * self.config.min_samples_leaf
            || self.is_pure(&indices)
        {
            nodes.push(Node::leaf(leaf_value));
            return current_idx as i32;
        }

        let Some(split) = self.find_best_split(&indices) else {
            nodes.push(Node::leaf(leaf_value));
            return current_idx as i32;
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&idx| self.features[idx][split.feature_idx] <= split.threshold);

        // Reserve space for current node
        nodes.push(Node::internal(split.feature_idx as i32, split.threshold, -1, -1));

        let left = self.build_node(left_indices, depth + 1, nodes);
        let right = self.build_node(right_indices, depth + 1, nodes);

        nodes[current_idx].left = left;
        nodes[current_idx].right = right;

        current_idx as i32
    }

    /// Find the best split with a sorted sweep per feature
    fn find_best_split(&self, indices: &[usize]) -> Option<SplitCandidate> {
        let n = indices.len();
        let total: f64 = indices.iter().map(|&idx| self.targets[idx]).sum();
        let parent_score = total * total / n as f64;
        let min_leaf = self.config.min_samples_leaf.max(1);

        let mut best: Option<SplitCandidate> = None;
        let mut order = indices.to_vec();

        for feature_idx in 0..self.feature_count {
            order.sort_by(|&a, &b| {
                self.features[a][feature_idx].total_cmp(&self.features[b][feature_idx])
            });

            let mut left_sum = 0.0;
            for pos in 0..n - 1 {
                left_sum += self.targets[order[pos]];

                let left_count = pos + 1;
                let right_count = n - left_count;
                if left_count < min_leaf || right_count < min_leaf {
                    continue;
                }

                let current = self.features[order[pos]][feature_idx];
                let next = self.features[order[pos + 1]][feature_idx];
                if current >= next {
                    continue;
                }

                let right_sum = total - left_sum;
                let score = left_sum * left_sum / left_count as f64
                    + right_sum * right_sum / right_count as f64;
                if score - parent_score <= MIN_IMPROVEMENT {
                    continue;
                }

                if best.map(|b| score > b.score).unwrap_or(true) {
                    best = Some(SplitCandidate {
                        feature_idx,
                        threshold: midpoint(current, next),
                        score,
                    });
                }
            }
        }

        best
    }

    fn is_pure(&self, indices: &[usize]) -> bool {
        let first = self.targets[indices[0]];
        indices.iter().all(|&idx| self.targets[idx] == first)
    }

    fn mean_target(&self, indices: &[usize]) -> f64 {
        if indices.is_empty() {
            return 0.0;
        }
        indices.iter().map(|&idx| self.targets[idx]).sum::<f64>() / indices.len() as f64
    }
}

/// Midpoint that still separates `low` from `high` under `<=`.
fn midpoint(low: f64, high: f64) -> f64 {
    let mid = low + (high - low) / 2.0;
    if mid >= high {
        low
    } else {
        mid
    }
}
