//! Error types for the AI Core module

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification used by callers to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Dataset, artifact or recommendation match not found
    NotFound,
    /// Required column absent or of the wrong kind
    Schema,
    /// No trained model available
    NotTrained,
    /// Input row could not be shaped into the trained feature space
    Transform,
    /// Caller supplied an invalid parameter
    InvalidInput,
    /// Anything else
    Internal,
}

/// Errors that can occur in the AI Core module
#[derive(Error, Debug)]
pub enum AiCoreError {
    /// Source dataset does not exist
    #[error("CSV file '{}' not found. Put it in the project directory.", path.display())]
    DatasetNotFound { path: PathBuf },

    /// A persisted artifact does not exist
    #[error("artifact '{}' not found", path.display())]
    ArtifactNotFound { path: PathBuf },

    /// Recommendation filter produced no rows
    #[error("No investments found for risk '{risk}'")]
    NoMatches { risk: String },

    /// Required column absent or unusable
    #[error("{0}")]
    Schema(String),

    /// Prediction requested before any successful training
    #[error("Model not available. Call /train first.")]
    NotTrained,

    /// Input row failed to pass through the recipe
    #[error("Prediction failed: {0}")]
    Transform(String),

    /// Model file and recipe file come from different training runs
    #[error("artifact mismatch: recipe expects model hash {expected}, found {actual}")]
    ArtifactMismatch { expected: String, actual: String },

    /// Invalid model or training parameters
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AiCoreError {
    /// Classify the error into the service-level taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DatasetNotFound { .. }
            | Self::ArtifactNotFound { .. }
            | Self::NoMatches { .. } => ErrorKind::NotFound,
            Self::Schema(_) => ErrorKind::Schema,
            Self::NotTrained | Self::ArtifactMismatch { .. } => ErrorKind::NotTrained,
            Self::Transform(_) => ErrorKind::Transform,
            Self::InvalidParameters(_) => ErrorKind::InvalidInput,
            Self::Io(_) | Self::Csv(_) | Self::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Whether this is the "no recommendation matched" flavour of not-found.
    pub fn is_no_matches(&self) -> bool {
        matches!(self, Self::NoMatches { .. })
    }
}

/// Result type for AI Core operations
pub type Result<T> = std::result::Result<T, AiCoreError>;
