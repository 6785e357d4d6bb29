use superfund_ai_core::{AiCoreError, ErrorKind};
use thiserror::Error;

/// Errors returned by the forest trainer.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error(transparent)]
    Core(#[from] AiCoreError),

    #[error("invalid split: {0}")]
    InvalidSplit(String),

    #[error("training error: {0}")]
    Training(String),
}

impl TrainerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Core(err) => err.kind(),
            Self::InvalidSplit(_) => ErrorKind::InvalidInput,
            Self::Training(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrainerError>;
