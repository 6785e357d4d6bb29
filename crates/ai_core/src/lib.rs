//! Superfund AI Core
//!
//! Building blocks shared by the trainer and the service layer.
//!
//! Modules:
//! - `table`: CSV loading into a typed, column-major table
//! - `plan`: numeric/categorical feature plan and input resolution
//! - `recipe`: fitted imputation, scaling and one-hot encoding
//! - `forest`: random forest regressor inference
//! - `bundle`: estimator + recipe + plan, persisted as an atomic pair
//! - `serialization`: canonical JSON and artifact hashing
//! - `errors`: error taxonomy shared by every layer

pub mod bundle;
pub mod errors;
pub mod forest;
pub mod plan;
pub mod recipe;
pub mod serialization;
pub mod table;

pub use bundle::{ArtifactPaths, ModelBundle, RecipeArtifact};
pub use errors::{AiCoreError, ErrorKind};
pub use forest::{mean_absolute_error, ForestMetadata, ForestModel, Node, Tree};
pub use plan::{FeatureKind, FeaturePlan, FeatureValue, PlannedFeature, EXCLUDED_COLUMNS};
pub use recipe::{ColumnEncoder, TransformRecipe, MISSING_CATEGORY};
pub use table::{Column, ColumnType, Table, Value};

/// Crate version string for metadata and status reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
