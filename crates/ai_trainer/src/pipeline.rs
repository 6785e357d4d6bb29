//! End-to-end training run: table in, fitted bundle and report out

use serde::{Deserialize, Serialize};
use std::path::Path;
use superfund_ai_core::{
    mean_absolute_error, AiCoreError, FeaturePlan, ModelBundle, Table, TransformRecipe, Value,
};
use tracing::info;

use crate::errors::Result;
use crate::split::train_validation_split;
use crate::trainer::{ForestConfig, ForestTrainer};

/// Parameters for one training run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub target_column: String,
    /// Fraction of rows held out for validation, in (0, 1)
    pub test_size: f64,
    pub seed: u64,
    pub forest: ForestConfig,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            target_column: "5yr_Return".to_string(),
            test_size: 0.2,
            seed: 42,
            forest: ForestConfig::default(),
        }
    }
}

/// Fit quality of a training run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub train_mae: f64,
    pub validation_mae: f64,
    pub train_rows: usize,
    pub validation_rows: usize,
}

/// Everything a training run produces
#[derive(Clone, Debug)]
pub struct TrainingOutcome {
    pub bundle: ModelBundle,
    pub report: TrainingReport,
}

/// Load `path` and train on it.
pub fn train_from_csv(path: &Path, params: &TrainingParams) -> Result<TrainingOutcome> {
    let table = Table::from_csv(path)?;
    train_from_table(&table, params)
}

/// Train a bundle on an already loaded table.
pub fn train_from_table(table: &Table, params: &TrainingParams) -> Result<TrainingOutcome> {
    let target = params.target_column.as_str();

    let target_column = table.column(target).ok_or_else(|| {
        AiCoreError::Schema(format!("Target column '{target}' not found in CSV."))
    })?;
    if !target_column.kind().is_numeric() {
        return Err(AiCoreError::Schema(format!(
            "Target column '{target}' must contain only numeric values."
        ))
        .into());
    }

    let table = table.drop_missing(target)?;
    let plan = FeaturePlan::build(&table, target)?;
    info!(
        rows = table.len(),
        numeric = plan.numeric_columns().len(),
        categorical = plan.categorical_columns().len(),
        "Built feature plan"
    );

    let targets: Vec<f64> = table
        .column(target)
        .map(|column| column.values().iter().filter_map(Value::as_f64).collect())
        .unwrap_or_default();
    let rows = plan.rows_from_table(&table)?;

    let split = train_validation_split(rows.len(), params.test_size, params.seed)?;

    let train_rows: Vec<_> = split.train.iter().map(|&idx| rows[idx].clone()).collect();
    let validation_rows: Vec<_> = split.validation.iter().map(|&idx| rows[idx].clone()).collect();
    let train_targets: Vec<f64> = split.train.iter().map(|&idx| targets[idx]).collect();
    let validation_targets: Vec<f64> = split.validation.iter().map(|&idx| targets[idx]).collect();

    let recipe = TransformRecipe::fit(&plan, &train_rows)?;
    let train_x = recipe.transform_all(&train_rows)?;
    let validation_x = recipe.transform_all(&validation_rows)?;

    info!(
        trees = params.forest.n_estimators,
        width = recipe.width(),
        seed = params.seed,
        "Training random forest"
    );
    let estimator =
        ForestTrainer::new(params.forest.clone()).train(&train_x, &train_targets, params.seed)?;

    let train_mae = mean_absolute_error(&train_targets, &estimator.predict_all(&train_x)?);
    let validation_mae =
        mean_absolute_error(&validation_targets, &estimator.predict_all(&validation_x)?);

    let report = TrainingReport {
        train_mae,
        validation_mae,
        train_rows: train_x.len(),
        validation_rows: validation_x.len(),
    };
    info!(
        train_mae = report.train_mae,
        validation_mae = report.validation_mae,
        train_rows = report.train_rows,
        validation_rows = report.validation_rows,
        "Training complete"
    );

    Ok(TrainingOutcome {
        bundle: ModelBundle::new(estimator, recipe, plan),
        report,
    })
}
