//! Fitted transform recipe
//!
//! Maps a plan-ordered input row to a fixed-length numeric vector:
//! - numeric columns: median imputation, then standard scaling
//! - categorical columns: constant imputation, then one-hot indicators
//!
//! All statistics come from the training partition and are reused verbatim
//! at prediction time. Output layout is every numeric column in plan order,
//! followed by the indicator blocks of every categorical column in plan
//! order, each block sorted by category.

use crate::errors::{AiCoreError, Result};
use crate::plan::{FeatureKind, FeaturePlan, FeatureValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Category used in place of a missing categorical value.
pub const MISSING_CATEGORY: &str = "missing";

static ABSENT: FeatureValue = FeatureValue::Missing;

/// Per-column fitted encoder, aligned with the plan's feature order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnEncoder {
    Numeric {
        column: String,
        median: f64,
        mean: f64,
        scale: f64,
    },
    Categorical {
        column: String,
        categories: Vec<String>,
    },
}

impl ColumnEncoder {
    fn width(&self) -> usize {
        match self {
            ColumnEncoder::Numeric { .. } => 1,
            ColumnEncoder::Categorical { categories, .. } => categories.len(),
        }
    }
}

/// Serializable, fitted preprocessing recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformRecipe {
    pub encoders: Vec<ColumnEncoder>,
}

impl TransformRecipe {
    /// Fit imputation, scaling and vocabulary statistics on training rows.
    pub fn fit(plan: &FeaturePlan, rows: &[Vec<FeatureValue>]) -> Result<Self> {
        if rows.is_empty() {
            return Err(AiCoreError::InvalidParameters(
                "cannot fit a recipe on zero rows".to_string(),
            ));
        }

        let encoders = plan
            .features
            .iter()
            .enumerate()
            .map(|(idx, feature)| {
                let cells = rows.iter().map(|row| row.get(idx).unwrap_or(&ABSENT));
                match feature.kind {
                    FeatureKind::Numeric => fit_numeric(&feature.name, cells),
                    FeatureKind::Categorical => fit_categorical(&feature.name, cells),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { encoders })
    }

    /// Length of every transformed vector.
    pub fn width(&self) -> usize {
        self.encoders.iter().map(ColumnEncoder::width).sum()
    }

    /// Column names of the transformed vector, for logs and debugging.
    pub fn output_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.width());
        for encoder in self.numeric_first() {
            match encoder {
                ColumnEncoder::Numeric { column, .. } => names.push(format!("num__{column}")),
                ColumnEncoder::Categorical { column, categories } => names.extend(
                    categories
                        .iter()
                        .map(|category| format!("cat__{column}_{category}")),
                ),
            }
        }
        names
    }

    /// Shape one plan-ordered row.
    pub fn transform(&self, row: &[FeatureValue]) -> Result<Vec<f64>> {
        if row.len() != self.encoders.len() {
            return Err(AiCoreError::Transform(format!(
                "expected {} features, got {}",
                self.encoders.len(),
                row.len()
            )));
        }

        let mut output = Vec::with_capacity(self.width());

        for (encoder, value) in self.encoders.iter().zip(row) {
            if let ColumnEncoder::Numeric {
                column,
                median,
                mean,
                scale,
            } = encoder
            {
                let raw = match value {
                    FeatureValue::Number(v) if v.is_finite() => *v,
                    FeatureValue::Number(_) | FeatureValue::Missing => *median,
                    FeatureValue::Category(text) => {
                        return Err(AiCoreError::Transform(format!(
                            "could not convert string to float for '{column}': '{text}'"
                        )))
                    }
                };
                output.push((raw - mean) / scale);
            }
        }

        for (encoder, value) in self.encoders.iter().zip(row) {
            if let ColumnEncoder::Categorical { categories, .. } = encoder {
                let category = category_of(value);
                // unseen categories leave the whole block at zero
                output.extend(
                    categories
                        .iter()
                        .map(|known| if *known == category { 1.0 } else { 0.0 }),
                );
            }
        }

        Ok(output)
    }

    /// Shape many rows at once.
    pub fn transform_all(&self, rows: &[Vec<FeatureValue>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform(row)).collect()
    }

    fn numeric_first(&self) -> impl Iterator<Item = &ColumnEncoder> {
        let numeric = self
            .encoders
            .iter()
            .filter(|e| matches!(e, ColumnEncoder::Numeric { .. }));
        let categorical = self
            .encoders
            .iter()
            .filter(|e| matches!(e, ColumnEncoder::Categorical { .. }));
        numeric.chain(categorical)
    }
}

fn category_of(value: &FeatureValue) -> String {
    match value {
        FeatureValue::Category(text) => text.clone(),
        FeatureValue::Number(v) => v.to_string(),
        FeatureValue::Missing => MISSING_CATEGORY.to_string(),
    }
}

fn fit_numeric<'a>(
    column: &str,
    cells: impl Iterator<Item = &'a FeatureValue>,
) -> Result<ColumnEncoder> {
    let cells: Vec<&FeatureValue> = cells.collect();
    let mut observed = Vec::with_capacity(cells.len());
    for cell in &cells {
        match cell {
            FeatureValue::Number(v) if v.is_finite() => observed.push(*v),
            FeatureValue::Number(_) | FeatureValue::Missing => {}
            FeatureValue::Category(text) => {
                return Err(AiCoreError::Transform(format!(
                    "could not convert string to float for '{column}': '{text}'"
                )))
            }
        }
    }

    let median = median(&mut observed).unwrap_or(0.0);

    let imputed: Vec<f64> = cells
        .iter()
        .map(|cell| match cell {
            FeatureValue::Number(v) if v.is_finite() => *v,
            _ => median,
        })
        .collect();

    let n = imputed.len() as f64;
    let mean = imputed.iter().sum::<f64>() / n;
    let variance = imputed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    let scale = if std > f64::EPSILON { std } else { 1.0 };

    Ok(ColumnEncoder::Numeric {
        column: column.to_string(),
        median,
        mean,
        scale,
    })
}

fn fit_categorical<'a>(
    column: &str,
    cells: impl Iterator<Item = &'a FeatureValue>,
) -> Result<ColumnEncoder> {
    let categories: BTreeSet<String> = cells.map(category_of).collect();
    Ok(ColumnEncoder::Categorical {
        column: column.to_string(),
        categories: categories.into_iter().collect(),
    })
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlannedFeature;

    fn plan() -> FeaturePlan {
        FeaturePlan {
            target: "5yr_Return".into(),
            features: vec![
                PlannedFeature {
                    name: "Risk_Level".into(),
                    kind: FeatureKind::Categorical,
                },
                PlannedFeature {
                    name: "Expense_Ratio".into(),
                    kind: FeatureKind::Numeric,
                },
            ],
        }
    }

    fn rows() -> Vec<Vec<FeatureValue>> {
        vec![
            vec![FeatureValue::Category("Low".into()), FeatureValue::Number(1.0)],
            vec![FeatureValue::Category("High".into()), FeatureValue::Number(3.0)],
            vec![FeatureValue::Missing, FeatureValue::Missing],
        ]
    }

    #[test]
    fn test_fit_statistics() {
        let recipe = TransformRecipe::fit(&plan(), &rows()).unwrap();
        match &recipe.encoders[1] {
            ColumnEncoder::Numeric {
                median, mean, scale, ..
            } => {
                assert_eq!(*median, 2.0);
                assert_eq!(*mean, 2.0);
                assert!((scale - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
            }
            other => panic!("unexpected encoder {other:?}"),
        }
        match &recipe.encoders[0] {
            ColumnEncoder::Categorical { categories, .. } => {
                assert_eq!(categories, &vec!["High", "Low", "missing"]);
            }
            other => panic!("unexpected encoder {other:?}"),
        }
        assert_eq!(recipe.width(), 4);
    }

    #[test]
    fn test_numeric_block_comes_first() {
        let recipe = TransformRecipe::fit(&plan(), &rows()).unwrap();
        assert_eq!(
            recipe.output_names(),
            vec![
                "num__Expense_Ratio",
                "cat__Risk_Level_High",
                "cat__Risk_Level_Low",
                "cat__Risk_Level_missing"
            ]
        );
        let out = recipe
            .transform(&[FeatureValue::Category("Low".into()), FeatureValue::Number(2.0)])
            .unwrap();
        assert_eq!(out, vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_missing_values_are_imputed() {
        let recipe = TransformRecipe::fit(&plan(), &rows()).unwrap();
        let out = recipe
            .transform(&[FeatureValue::Missing, FeatureValue::Missing])
            .unwrap();
        assert_eq!(out, vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_unseen_category_is_all_zero() {
        let recipe = TransformRecipe::fit(&plan(), &rows()).unwrap();
        let out = recipe
            .transform(&[
                FeatureValue::Category("Speculative".into()),
                FeatureValue::Number(2.0),
            ])
            .unwrap();
        assert_eq!(&out[1..], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_text_in_numeric_column_fails() {
        let recipe = TransformRecipe::fit(&plan(), &rows()).unwrap();
        let err = recipe
            .transform(&[
                FeatureValue::Category("Low".into()),
                FeatureValue::Category("cheap".into()),
            ])
            .unwrap_err();
        assert!(matches!(err, AiCoreError::Transform(_)));
    }

    #[test]
    fn test_constant_column_keeps_unit_scale() {
        let rows = vec![
            vec![FeatureValue::Category("Low".into()), FeatureValue::Number(5.0)],
            vec![FeatureValue::Category("Low".into()), FeatureValue::Number(5.0)],
        ];
        let recipe = TransformRecipe::fit(&plan(), &rows).unwrap();
        let out = recipe
            .transform(&[FeatureValue::Category("Low".into()), FeatureValue::Number(7.0)])
            .unwrap();
        assert_eq!(out[0], 2.0);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }
}
