//! Advisor service error types

use superfund_ai_core::{AiCoreError, ErrorKind};
use superfund_ai_trainer::TrainerError;
use thiserror::Error;

/// Advisor service errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] AiCoreError),

    #[error(transparent)]
    Trainer(#[from] TrainerError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Classify the error into the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Core(err) => err.kind(),
            Self::Trainer(err) => err.kind(),
            Self::Config(_) => ErrorKind::InvalidInput,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether a recommendation query matched nothing.
    pub fn is_no_matches(&self) -> bool {
        match self {
            Self::Core(err) => err.is_no_matches(),
            Self::Trainer(TrainerError::Core(err)) => err.is_no_matches(),
            _ => false,
        }
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
