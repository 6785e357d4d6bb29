//! Service configuration

use crate::errors::{Result, ServiceError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use superfund_ai_core::ArtifactPaths;

/// Runtime configuration, fixed at process start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Dataset used for training and recommendations
    pub dataset_path: PathBuf,
    pub target_column: String,
    pub risk_column: String,
    pub name_column: String,
    pub random_seed: u64,
    pub model_path: PathBuf,
    pub recipe_path: PathBuf,
    /// The single origin allowed by CORS
    pub allowed_origin: String,
    pub rpc_host: String,
    pub rpc_port: u16,
    pub log_level: String,
    /// `pretty` or `json`
    pub log_format: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("Data_1.csv"),
            target_column: "5yr_Return".to_string(),
            risk_column: "Risk_Level".to_string(),
            name_column: "Investment_Name".to_string(),
            random_seed: 42,
            model_path: PathBuf::from("investment_model.json"),
            recipe_path: PathBuf::from("preprocessor_pipeline.json"),
            allowed_origin: "http://localhost:8080".to_string(),
            rpc_host: "127.0.0.1".to_string(),
            rpc_port: 8000,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths::new(&self.model_path, &self.recipe_path)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("dataset_path", &self.dataset_path),
            ("model_path", &self.model_path),
            ("recipe_path", &self.recipe_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ServiceError::Config(format!("{name} must not be empty")));
            }
        }

        if self.model_path == self.recipe_path {
            return Err(ServiceError::Config(
                "model_path and recipe_path must differ".to_string(),
            ));
        }

        for (name, column) in [
            ("target_column", &self.target_column),
            ("risk_column", &self.risk_column),
            ("name_column", &self.name_column),
        ] {
            if column.trim().is_empty() {
                return Err(ServiceError::Config(format!("{name} must not be empty")));
            }
        }

        if !is_origin(&self.allowed_origin) {
            return Err(ServiceError::Config(format!(
                "allowed_origin '{}' is not a valid origin",
                self.allowed_origin
            )));
        }

        if self.rpc_host.trim().is_empty() {
            return Err(ServiceError::Config("rpc_host must not be empty".to_string()));
        }

        match self.log_format.as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(ServiceError::Config(format!(
                "log_format must be 'pretty' or 'json', got '{other}'"
            ))),
        }
    }
}

/// `scheme://host[:port]` with no path, query or whitespace.
fn is_origin(value: &str) -> bool {
    let Some((scheme, rest)) = value.split_once("://") else {
        return false;
    };
    if !matches!(scheme, "http" | "https") || rest.is_empty() {
        return false;
    }
    if rest.contains(&['/', '?', '#'][..]) || rest.chars().any(char::is_whitespace) {
        return false;
    }
    match rest.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => true,
    }
}
