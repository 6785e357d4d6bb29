//! Random forest trainer
//!
//! Each tree is grown on a bootstrap sample with its own RNG seeded from a
//! per-tree seed drawn up front from the run seed. Trees are then grown in
//! parallel and collected in order, so the forest only depends on the seed.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use superfund_ai_core::forest::{ForestMetadata, ForestModel, Tree};
use tracing::debug;

use crate::cart::{CartBuilder, TreeConfig};
use crate::errors::{Result, TrainerError};

/// Forest training configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub bootstrap: bool,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
        }
    }
}

impl ForestConfig {
    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        }
    }
}

/// Random forest trainer
pub struct ForestTrainer {
    config: ForestConfig,
}

impl ForestTrainer {
    pub fn new(config: ForestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Train a forest on transformed rows.
    pub fn train(&self, features: &[Vec<f64>], targets: &[f64], seed: u64) -> Result<ForestModel> {
        if features.is_empty() {
            return Err(TrainerError::Training("cannot train on zero rows".to_string()));
        }
        if features.len() != targets.len() {
            return Err(TrainerError::Training(format!(
                "{} feature rows but {} targets",
                features.len(),
                targets.len()
            )));
        }
        if self.config.n_estimators == 0 {
            return Err(TrainerError::Training(
                "n_estimators must be at least 1".to_string(),
            ));
        }

        let feature_count = features[0].len();
        if let Some(row) = features.iter().position(|row| row.len() != feature_count) {
            return Err(TrainerError::Training(format!(
                "row {row} has {} features, expected {feature_count}",
                features[row].len()
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let tree_seeds: Vec<u64> = (0..self.config.n_estimators).map(|_| rng.gen()).collect();

        let builder = CartBuilder::new(features, targets, self.config.tree_config())?;
        let rows = features.len();
        let bootstrap = self.config.bootstrap;

        let trees: Vec<Tree> = tree_seeds
            .par_iter()
            .map(|&tree_seed| {
                let indices = if bootstrap {
                    let mut tree_rng = StdRng::seed_from_u64(tree_seed);
                    (0..rows).map(|_| tree_rng.gen_range(0..rows)).collect()
                } else {
                    (0..rows).collect()
                };
                builder.build_from(indices)
            })
            .collect();

        debug!(
            trees = trees.len(),
            leaves = trees.iter().map(Tree::leaf_count).sum::<usize>(),
            "Grew forest"
        );

        let metadata = ForestMetadata {
            created_at: Utc::now().timestamp(),
            seed,
            train_rows: rows,
        };

        Ok(ForestModel::new(trees, feature_count, metadata))
    }
}
