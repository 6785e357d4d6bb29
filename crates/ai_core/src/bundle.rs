//! Trained model bundle and its on-disk artifact pair
//!
//! A bundle is the estimator plus the recipe and plan it was trained with.
//! It is persisted as two files:
//! - the model file: canonical JSON of the forest
//! - the recipe file: recipe, plan, feature columns and the BLAKE3 hash of
//!   the model file
//!
//! The recipe rename is the only commit point. The model is first written
//! to a content-addressed sibling (`<model_path>.<hash>`), then the recipe
//! is renamed into place, and only then is the sibling moved over
//! `model_path`. A save that fails before the commit removes the sibling
//! and leaves the previous pair untouched. A reader resolves the model
//! through the hash recorded in the recipe, falling back to the sibling
//! when `model_path` still holds the previous model.

use crate::errors::{AiCoreError, Result};
use crate::forest::ForestModel;
use crate::plan::FeaturePlan;
use crate::recipe::TransformRecipe;
use crate::serialization::{canonical_json_string, content_hash_hex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Locations of the two persisted artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub model_path: PathBuf,
    pub recipe_path: PathBuf,
}

impl ArtifactPaths {
    pub fn new(model_path: impl Into<PathBuf>, recipe_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            recipe_path: recipe_path.into(),
        }
    }

    /// Whether both files are present.
    pub fn exist(&self) -> bool {
        self.model_path.exists() && self.recipe_path.exists()
    }

    /// Where a model with content hash `hash` is written before the recipe
    /// commits.
    pub fn staged_model_path(&self, hash: &str) -> PathBuf {
        let mut name = self.model_path.clone().into_os_string();
        name.push(".");
        name.push(hash);
        PathBuf::from(name)
    }
}

/// Contents of the recipe file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeArtifact {
    pub recipe: TransformRecipe,
    pub plan: FeaturePlan,
    pub feature_columns: Vec<String>,
    /// BLAKE3 hex digest of the model file this recipe was trained with
    pub model_hash: String,
}

/// Estimator, recipe and plan from a single training run.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBundle {
    pub estimator: ForestModel,
    pub recipe: TransformRecipe,
    pub plan: FeaturePlan,
}

impl ModelBundle {
    pub fn new(estimator: ForestModel, recipe: TransformRecipe, plan: FeaturePlan) -> Self {
        Self {
            estimator,
            recipe,
            plan,
        }
    }

    /// Predict from a loosely typed feature mapping.
    pub fn predict(&self, features: &Map<String, JsonValue>) -> Result<f64> {
        let row = self.plan.resolve(features)?;
        let encoded = self.recipe.transform(&row)?;
        self.estimator.predict(&encoded)
    }

    /// Write both artifacts, replacing any previous pair.
    pub fn save(&self, paths: &ArtifactPaths) -> Result<String> {
        self.save_with(paths, |recipe_tmp, target| {
            recipe_tmp
                .persist(target)
                .map(|_| ())
                .map_err(|err| AiCoreError::Io(err.error))
        })
    }

    /// `save`, with the recipe commit supplied by the caller.
    fn save_with<F>(&self, paths: &ArtifactPaths, commit_recipe: F) -> Result<String>
    where
        F: FnOnce(NamedTempFile, &Path) -> Result<()>,
    {
        let model_json = self.estimator.to_canonical_json()?;
        let model_hash = content_hash_hex(model_json.as_bytes());

        let artifact = RecipeArtifact {
            recipe: self.recipe.clone(),
            plan: self.plan.clone(),
            feature_columns: self
                .plan
                .feature_columns()
                .into_iter()
                .map(str::to_string)
                .collect(),
            model_hash: model_hash.clone(),
        };
        let recipe_json = canonical_json_string(&artifact)?;

        let staged = paths.staged_model_path(&model_hash);
        write_synced_temp(&paths.model_path, model_json.as_bytes())?
            .persist(&staged)
            .map_err(|err| AiCoreError::Io(err.error))?;

        let committed = write_synced_temp(&paths.recipe_path, recipe_json.as_bytes())
            .and_then(|recipe_tmp| commit_recipe(recipe_tmp, &paths.recipe_path));
        if let Err(err) = committed {
            if let Err(cleanup) = fs::remove_file(&staged) {
                warn!(path = %staged.display(), error = %cleanup, "Failed to remove staged model");
            }
            return Err(err);
        }

        // committed; a failed move leaves the staged file for `load` to find
        if let Err(err) = fs::rename(&staged, &paths.model_path) {
            warn!(
                staged = %staged.display(),
                model = %paths.model_path.display(),
                error = %err,
                "Model left at its staged path"
            );
        }

        info!(
            model = %paths.model_path.display(),
            recipe = %paths.recipe_path.display(),
            model_hash = %model_hash,
            "Saved model artifacts"
        );
        Ok(model_hash)
    }

    /// Read both artifacts back and verify they belong together.
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        if !paths.recipe_path.exists() {
            return Err(AiCoreError::ArtifactNotFound {
                path: paths.recipe_path.clone(),
            });
        }
        let recipe_json = fs::read_to_string(&paths.recipe_path)?;
        let artifact: RecipeArtifact = serde_json::from_str(&recipe_json)?;

        let model_json = read_model(paths, &artifact.model_hash)?;
        let estimator = ForestModel::from_json(&model_json)?;

        if artifact.recipe.encoders.len() != artifact.plan.features.len() {
            return Err(AiCoreError::InvalidParameters(format!(
                "recipe has {} encoders but plan has {} features",
                artifact.recipe.encoders.len(),
                artifact.plan.features.len()
            )));
        }
        if artifact.recipe.width() != estimator.feature_count {
            return Err(AiCoreError::InvalidParameters(format!(
                "recipe produces {} columns but model expects {}",
                artifact.recipe.width(),
                estimator.feature_count
            )));
        }

        debug!(
            trees = estimator.num_trees(),
            features = estimator.feature_count,
            "Loaded model artifacts"
        );

        Ok(Self {
            estimator,
            recipe: artifact.recipe,
            plan: artifact.plan,
        })
    }
}

/// The model text whose hash is `expected`, from `model_path` or its staged
/// sibling.
fn read_model(paths: &ArtifactPaths, expected: &str) -> Result<String> {
    let staged = paths.staged_model_path(expected);
    let mut mismatch = None;

    for path in [&paths.model_path, &staged] {
        if !path.exists() {
            continue;
        }
        let model_json = fs::read_to_string(path)?;
        let actual = content_hash_hex(model_json.as_bytes());
        if actual == expected {
            return Ok(model_json);
        }
        mismatch.get_or_insert(actual);
    }

    Err(match mismatch {
        Some(actual) => AiCoreError::ArtifactMismatch {
            expected: expected.to_string(),
            actual,
        },
        None => AiCoreError::ArtifactNotFound {
            path: paths.model_path.clone(),
        },
    })
}

/// Write `bytes` to a synced temporary file next to `target`.
fn write_synced_temp(target: &Path, bytes: &[u8]) -> Result<NamedTempFile> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let mut file = NamedTempFile::new_in(&dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    Ok(file)
}
