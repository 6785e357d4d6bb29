//! Feature plan construction and boundary resolution of input rows
//!
//! A plan fixes which dataset columns feed the model and whether each one
//! is numeric or categorical. It is decided once from the declared column
//! types and never revisited.

use crate::errors::{AiCoreError, Result};
use crate::table::{Table, Value};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Free-text columns never used as features (compared lowercased).
pub const EXCLUDED_COLUMNS: &[&str] = &["investment_name", "description", "notes"];

/// How a feature column is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Numeric,
    Categorical,
}

/// A feature column and its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedFeature {
    pub name: String,
    pub kind: FeatureKind,
}

/// One input cell after resolution against the plan.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    Category(String),
    Missing,
}

/// Ordered feature columns with their numeric/categorical split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturePlan {
    pub target: String,
    pub features: Vec<PlannedFeature>,
}

impl FeaturePlan {
    /// Partition every non-target, non-free-text column of `table`.
    pub fn build(table: &Table, target: &str) -> Result<Self> {
        if !table.has_column(target) {
            return Err(AiCoreError::Schema(format!(
                "Target column '{target}' not found in CSV."
            )));
        }

        let features = table
            .columns()
            .iter()
            .filter(|column| column.name() != target)
            .filter(|column| !EXCLUDED_COLUMNS.contains(&column.name().to_lowercase().as_str()))
            .map(|column| PlannedFeature {
                name: column.name().to_string(),
                kind: if column.kind().is_numeric() {
                    FeatureKind::Numeric
                } else {
                    FeatureKind::Categorical
                },
            })
            .collect();

        Ok(Self {
            target: target.to_string(),
            features,
        })
    }

    pub fn feature_columns(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns_of(FeatureKind::Numeric)
    }

    pub fn categorical_columns(&self) -> Vec<&str> {
        self.columns_of(FeatureKind::Categorical)
    }

    fn columns_of(&self, kind: FeatureKind) -> Vec<&str> {
        self.features
            .iter()
            .filter(|f| f.kind == kind)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Resolve every row of `table` into plan order.
    pub fn rows_from_table(&self, table: &Table) -> Result<Vec<Vec<FeatureValue>>> {
        let mut columns = Vec::with_capacity(self.features.len());
        for feature in &self.features {
            let column = table.column(&feature.name).ok_or_else(|| {
                AiCoreError::Schema(format!("Feature column '{}' not found in CSV.", feature.name))
            })?;
            columns.push((feature.kind, column));
        }

        let rows = (0..table.len())
            .map(|row| {
                columns
                    .iter()
                    .map(|(kind, column)| match (kind, column.get(row)) {
                        (_, None | Some(Value::Missing)) => FeatureValue::Missing,
                        (FeatureKind::Numeric, Some(Value::Number(v))) => FeatureValue::Number(*v),
                        (FeatureKind::Numeric, Some(Value::Text(_))) => FeatureValue::Missing,
                        (FeatureKind::Categorical, Some(value)) => {
                            FeatureValue::Category(value.to_string())
                        }
                    })
                    .collect()
            })
            .collect();

        Ok(rows)
    }

    /// Resolve a loosely typed request mapping into plan order.
    ///
    /// Absent keys and `null` become [`FeatureValue::Missing`]; keys outside
    /// the plan are ignored.
    pub fn resolve(&self, input: &Map<String, JsonValue>) -> Result<Vec<FeatureValue>> {
        self.features
            .iter()
            .map(|feature| match input.get(&feature.name) {
                None | Some(JsonValue::Null) => Ok(FeatureValue::Missing),
                Some(value) => match feature.kind {
                    FeatureKind::Numeric => resolve_numeric(&feature.name, value),
                    FeatureKind::Categorical => resolve_categorical(&feature.name, value),
                },
            })
            .collect()
    }
}

fn resolve_numeric(name: &str, value: &JsonValue) -> Result<FeatureValue> {
    match value {
        JsonValue::Number(n) => n
            .as_f64()
            .map(FeatureValue::Number)
            .ok_or_else(|| AiCoreError::Transform(format!("'{name}' is not a finite number"))),
        JsonValue::Bool(b) => Ok(FeatureValue::Number(if *b { 1.0 } else { 0.0 })),
        JsonValue::String(s) => s.trim().parse::<f64>().map(FeatureValue::Number).map_err(|_| {
            AiCoreError::Transform(format!(
                "could not convert string to float for numeric feature '{name}': '{s}'"
            ))
        }),
        other => Err(AiCoreError::Transform(format!(
            "numeric feature '{name}' expects a number, got {other}"
        ))),
    }
}

fn resolve_categorical(name: &str, value: &JsonValue) -> Result<FeatureValue> {
    match value {
        JsonValue::String(s) => Ok(FeatureValue::Category(s.clone())),
        JsonValue::Number(n) => Ok(FeatureValue::Category(n.to_string())),
        JsonValue::Bool(b) => Ok(FeatureValue::Category(b.to_string())),
        other => Err(AiCoreError::Transform(format!(
            "categorical feature '{name}' expects a scalar, got {other}"
        ))),
    }
}
