//! Process-wide model state
//!
//! Holds at most one [`ModelBundle`]. Readers clone the `Arc` under the
//! read lock. A missing bundle is loaded from the artifact pair on first
//! use under the write lock. Training fits outside any lock, then persists
//! and swaps the new bundle while holding the write lock, so readers see
//! either the old bundle or the new one.

use crate::errors::Result;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use superfund_ai_core::{AiCoreError, ArtifactPaths, ModelBundle};
use superfund_ai_trainer::{TrainerError, TrainingOutcome, TrainingReport};
use tracing::{info, warn};

pub struct ModelStore {
    paths: ArtifactPaths,
    current: RwLock<Option<Arc<ModelBundle>>>,
    training: Mutex<()>,
}

impl ModelStore {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            current: RwLock::new(None),
            training: Mutex::new(()),
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// The resident bundle, without touching disk.
    pub fn current(&self) -> Option<Arc<ModelBundle>> {
        self.current.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// The resident bundle, loading the artifact pair if nothing is resident.
    pub fn get_or_load(&self) -> std::result::Result<Arc<ModelBundle>, AiCoreError> {
        if let Some(bundle) = self.current() {
            return Ok(bundle);
        }

        let mut slot = self.current.write();
        if let Some(bundle) = slot.as_ref() {
            return Ok(bundle.clone());
        }

        let bundle = Arc::new(self.read_artifacts()?);
        *slot = Some(bundle.clone());
        Ok(bundle)
    }

    /// Eagerly load the artifact pair at startup. Returns whether a bundle
    /// is now resident.
    pub fn load_existing(&self) -> bool {
        match self.get_or_load() {
            Ok(bundle) => {
                info!(
                    model = %self.paths.model_path.display(),
                    trees = bundle.estimator.num_trees(),
                    "Loaded existing model"
                );
                true
            }
            Err(_) => false,
        }
    }

    /// Run `fit` and install its bundle. Concurrent calls are serialised;
    /// a failed fit or save leaves the previous bundle and artifacts untouched.
    pub fn train<F>(&self, fit: F) -> Result<TrainingReport>
    where
        F: FnOnce() -> std::result::Result<TrainingOutcome, TrainerError>,
    {
        let _training = self.training.lock();
        let outcome = fit()?;

        let mut slot = self.current.write();
        outcome.bundle.save(&self.paths)?;
        *slot = Some(Arc::new(outcome.bundle));

        Ok(outcome.report)
    }

    fn read_artifacts(&self) -> std::result::Result<ModelBundle, AiCoreError> {
        // the recipe is the commit point; the model may still be staged
        if !self.paths.recipe_path.exists() {
            return Err(AiCoreError::NotTrained);
        }

        ModelBundle::load(&self.paths).map_err(|err| {
            warn!(
                model = %self.paths.model_path.display(),
                recipe = %self.paths.recipe_path.display(),
                error = %err,
                "Failed to load existing model artifacts"
            );
            AiCoreError::NotTrained
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;
    use superfund_ai_core::Table;
    use superfund_ai_trainer::{train_from_table, ForestConfig, TrainingParams};
    use tempfile::TempDir;

    const DATA: &str = "\
Investment_Name,Risk_Level,Expense_Ratio,5yr_Return
Alpha,Low,0.10,4.2
Beta,Low,0.15,6.1
Gamma,Medium,0.20,7.5
Delta,High,0.40,11.2
Epsilon,High,0.45,10.4
Zeta,Medium,0.30,7.9
";

    fn fit() -> std::result::Result<TrainingOutcome, TrainerError> {
        fit_with(5, 42)
    }

    fn fit_with(trees: usize, seed: u64) -> std::result::Result<TrainingOutcome, TrainerError> {
        let table = Table::from_reader(DATA.as_bytes())?;
        let params = TrainingParams {
            seed,
            forest: ForestConfig {
                n_estimators: trees,
                ..ForestConfig::default()
            },
            ..TrainingParams::default()
        };
        train_from_table(&table, &params)
    }

    fn store(dir: &TempDir) -> ModelStore {
        ModelStore::new(ArtifactPaths::new(
            dir.path().join("model.json"),
            dir.path().join("recipe.json"),
        ))
    }

    #[test]
    fn test_not_trained_without_artifacts() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(matches!(store.get_or_load(), Err(AiCoreError::NotTrained)));
        assert!(!store.load_existing());
    }

    #[test]
    fn test_train_installs_and_persists() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let report = store.train(fit).unwrap();
        assert_eq!(report.train_rows + report.validation_rows, 6);
        assert!(store.is_loaded());
        assert!(store.paths().exist());

        let reopened = self::store(&dir);
        assert!(reopened.load_existing());
        assert_eq!(*reopened.current().unwrap(), *store.current().unwrap());
    }

    #[test]
    fn test_failed_training_keeps_previous_bundle() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.train(fit).unwrap();
        let before = store.current().unwrap();

        let err = store
            .train(|| Err(TrainerError::InvalidSplit("bad".to_string())))
            .unwrap_err();
        assert!(matches!(err, crate::ServiceError::Trainer(_)));
        assert_eq!(*store.current().unwrap(), *before);
    }

    #[test]
    fn test_mismatched_pair_is_not_trained() {
        let dir = TempDir::new().unwrap();
        store(&dir).train(fit).unwrap();
        fs::write(dir.path().join("model.json"), "{}").unwrap();

        let store = store(&dir);
        assert!(matches!(store.get_or_load(), Err(AiCoreError::NotTrained)));
    }

    #[test]
    fn test_readers_see_old_or_new_bundle_during_training() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.train(fit).unwrap();

        let features = json!({"Risk_Level": "Low", "Expense_Ratio": 0.12})
            .as_object()
            .cloned()
            .unwrap();
        let old = store.get_or_load().unwrap();
        let old_value = old.predict(&features).unwrap();

        let done = AtomicBool::new(false);
        let (seen, (report, trees_after_train)) = thread::scope(|scope| {
            let reader = scope.spawn(|| {
                let mut seen = Vec::new();
                loop {
                    let bundle = store.get_or_load().unwrap();
                    seen.push((bundle.estimator.num_trees(), bundle.predict(&features).unwrap()));
                    if done.load(Ordering::SeqCst) {
                        return seen;
                    }
                }
            });

            let report = store.train(|| {
                thread::sleep(Duration::from_millis(50));
                fit_with(7, 7)
            });
            let trees_after_train = store.current().map(|bundle| bundle.estimator.num_trees());
            done.store(true, Ordering::SeqCst);
            (reader.join().unwrap(), (report, trees_after_train))
        });

        report.unwrap();
        // train has returned, so the swap is already visible
        assert_eq!(trees_after_train, Some(7));
        let new_value = store.current().unwrap().predict(&features).unwrap();
        assert!(!seen.is_empty());
        for (trees, value) in seen {
            match trees {
                5 => assert_eq!(value, old_value),
                7 => assert_eq!(value, new_value),
                other => panic!("unexpected bundle with {other} trees"),
            }
        }

        let reopened = self::store(&dir);
        assert_eq!(reopened.get_or_load().unwrap().estimator.num_trees(), 7);
    }
}
