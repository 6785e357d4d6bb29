//! Random forest regressor with canonical JSON persistence
//!
//! Inference averages the leaf values of every tree. The on-disk format is
//! canonical JSON (sorted keys) so the file hash is stable for a given
//! model, which lets the recipe artifact pin the exact estimator it was
//! trained with.

pub mod tree;

pub use tree::{Node, Tree};

use crate::errors::{AiCoreError, Result};
use crate::serialization::canonical_json_string;
use serde::{Deserialize, Serialize};

/// Current on-disk format version
pub const FOREST_FORMAT_VERSION: i32 = 1;

/// Training provenance stored alongside the trees
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForestMetadata {
    pub created_at: i64,
    pub seed: u64,
    pub train_rows: usize,
}

/// Ensemble of regression trees
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForestModel {
    pub version: i32,
    /// Width of the transformed feature vector the trees index into
    pub feature_count: usize,
    pub trees: Vec<Tree>,
    pub metadata: ForestMetadata,
}

impl ForestModel {
    pub fn new(trees: Vec<Tree>, feature_count: usize, metadata: ForestMetadata) -> Self {
        Self {
            version: FOREST_FORMAT_VERSION,
            feature_count,
            trees,
            metadata,
        }
    }

    /// Validate model structure
    pub fn validate(&self) -> Result<()> {
        if self.version != FOREST_FORMAT_VERSION {
            return Err(AiCoreError::InvalidParameters(format!(
                "Unsupported model version: {}",
                self.version
            )));
        }

        if self.trees.is_empty() {
            return Err(AiCoreError::InvalidParameters(
                "Model has no trees".to_string(),
            ));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_count).map_err(|e| {
                AiCoreError::InvalidParameters(format!("Tree {i} validation failed: {e}"))
            })?;
        }

        Ok(())
    }

    /// Predict one transformed row: the mean of every tree's output.
    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.feature_count {
            return Err(AiCoreError::Transform(format!(
                "X has {} features, but the model is expecting {} features as input",
                features.len(),
                self.feature_count
            )));
        }
        if self.trees.is_empty() {
            return Err(AiCoreError::NotTrained);
        }

        let sum: f64 = self.trees.iter().map(|tree| tree.evaluate(features)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    /// Predict many transformed rows.
    pub fn predict_all(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Serialize model to canonical JSON
    pub fn to_canonical_json(&self) -> Result<String> {
        Ok(canonical_json_string(self)?)
    }

    /// Parse and validate a model from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let model: ForestModel = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }
}

/// Mean absolute error between targets and predictions.
pub fn mean_absolute_error(targets: &[f64], predictions: &[f64]) -> f64 {
    if targets.is_empty() {
        return 0.0;
    }
    let total: f64 = targets
        .iter()
        .zip(predictions)
        .map(|(t, p)| (t - p).abs())
        .sum();
    total / targets.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> ForestModel {
        let stump = |low: f64, high: f64| {
            Tree::new(vec![
                Node::internal(0, 0.0, 1, 2),
                Node::leaf(low),
                Node::leaf(high),
            ])
        };
        ForestModel::new(
            vec![stump(1.0, 5.0), stump(3.0, 7.0)],
            2,
            ForestMetadata {
                created_at: 0,
                seed: 42,
                train_rows: 4,
            },
        )
    }

    #[test]
    fn test_predict_averages_trees() {
        let model = model();
        assert_eq!(model.predict(&[-1.0, 0.0]).unwrap(), 2.0);
        assert_eq!(model.predict(&[1.0, 0.0]).unwrap(), 6.0);
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let err = model().predict(&[1.0]).unwrap_err();
        assert!(matches!(err, AiCoreError::Transform(_)));
    }

    #[test]
    fn test_json_roundtrip_validates() {
        let model = model();
        let json = model.to_canonical_json().unwrap();
        assert_eq!(ForestModel::from_json(&json).unwrap(), model);

        let mut broken = model.clone();
        broken.trees.clear();
        let json = broken.to_canonical_json().unwrap();
        assert!(ForestModel::from_json(&json).is_err());
    }

    #[test]
    fn test_canonical_json_is_stable() {
        let a = model().to_canonical_json().unwrap();
        let b = model().to_canonical_json().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_mean_absolute_error() {
        assert_eq!(mean_absolute_error(&[1.0, 2.0, 3.0], &[2.0, 2.0, 1.0]), 1.0);
        assert_eq!(mean_absolute_error(&[], &[]), 0.0);
    }
}
