//! Superfund AI Trainer - seeded random forest trainer
//!
//! Turns a tabular dataset into a [`ModelBundle`](superfund_ai_core::ModelBundle):
//! train/validation split, recipe fitting on the training partition,
//! bootstrap forest growth and MAE reporting.

pub mod cart;
pub mod errors;
pub mod pipeline;
pub mod split;
pub mod trainer;

pub use cart::{CartBuilder, TreeConfig};
pub use errors::TrainerError;
pub use pipeline::{
    train_from_csv, train_from_table, TrainingOutcome, TrainingParams, TrainingReport,
};
pub use split::{train_validation_split, Split};
pub use trainer::{ForestConfig, ForestTrainer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
