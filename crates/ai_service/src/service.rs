//! Advisor service facade used by the HTTP layer

use crate::chat::{compose_reply, ChatRequest, Outcome};
use crate::config::ServiceConfig;
use crate::errors::Result;
use crate::recommend::{recommend, RecommendColumns, Recommendation};
use crate::store::ModelStore;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use superfund_ai_core::Table;
use superfund_ai_trainer::{train_from_csv, ForestConfig, TrainingParams, TrainingReport};
use tracing::{debug, info};

/// Training, prediction, recommendation and chat over one dataset and one
/// model store. Cheap to clone.
#[derive(Clone)]
pub struct AdvisorService {
    config: Arc<ServiceConfig>,
    store: Arc<ModelStore>,
}

impl AdvisorService {
    pub fn new(config: ServiceConfig) -> Self {
        let store = ModelStore::new(config.artifact_paths());
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// Try to load a previously trained model. Failure leaves the service
    /// untrained.
    pub fn load_existing_model(&self) -> bool {
        self.store.load_existing()
    }

    /// Retrain from the dataset and install the new model.
    pub fn train_blocking(&self, test_size: f64) -> Result<TrainingReport> {
        let params = TrainingParams {
            target_column: self.config.target_column.clone(),
            test_size,
            seed: self.config.random_seed,
            forest: ForestConfig::default(),
        };
        info!(
            dataset = %self.config.dataset_path.display(),
            test_size,
            "Training requested"
        );
        self.store
            .train(|| train_from_csv(&self.config.dataset_path, &params))
    }

    pub fn predict_blocking(&self, features: &Map<String, JsonValue>) -> Result<f64> {
        let bundle = self.store.get_or_load()?;
        let prediction = bundle.predict(features)?;
        debug!(prediction, "Predicted five-year return");
        Ok(prediction)
    }

    pub fn recommend_blocking(&self, risk: &str) -> Result<Vec<Recommendation>> {
        let table = Table::from_csv(&self.config.dataset_path)?;
        let columns = RecommendColumns {
            risk: self.config.risk_column.clone(),
            name: self.config.name_column.clone(),
            target: self.config.target_column.clone(),
        };
        Ok(recommend(&table, risk, &columns)?)
    }

    pub fn chat_blocking(&self, request: &ChatRequest) -> String {
        let recommendations = request
            .risk()
            .map(|risk| (risk, Outcome::from(self.recommend_blocking(risk))));
        let prediction = request
            .features()
            .map(|features| Outcome::from(self.predict_blocking(features)));

        compose_reply(recommendations, prediction)
    }

    pub async fn train(&self, test_size: f64) -> Result<TrainingReport> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.train_blocking(test_size)).await?
    }

    pub async fn predict(&self, features: Map<String, JsonValue>) -> Result<f64> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.predict_blocking(&features)).await?
    }

    pub async fn recommend(&self, risk: String) -> Result<Vec<Recommendation>> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.recommend_blocking(&risk)).await?
    }

    pub async fn chat(&self, request: ChatRequest) -> Result<String> {
        let service = self.clone();
        Ok(tokio::task::spawn_blocking(move || service.chat_blocking(&request)).await?)
    }
}
