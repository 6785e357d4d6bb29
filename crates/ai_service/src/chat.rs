//! Chat reply composition
//!
//! The responder never fails: each sub-call arrives as an [`Outcome`] and a
//! failure becomes an informational line in the reply.

use crate::recommend::Recommendation;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Reply used when neither a risk nor features were supplied.
pub const HELP_TEXT: &str = "Hi — I can provide recommendations and return predictions. \
Send a `risk` (Low/Medium/High) for CSV-based recommendations, \
or `features` dict to get a model prediction. Example payload:\n\
{\"message\":\"...\",\"risk\":\"Medium\",\"features\":{\"Risk_Level\":\"Medium\",\"Expense_Ratio\":0.25}}";

/// Incoming chat message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub risk: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub features: Option<Map<String, JsonValue>>,
}

impl ChatRequest {
    /// The risk, unless absent or blank.
    pub fn risk(&self) -> Option<&str> {
        self.risk.as_deref().filter(|risk| !risk.trim().is_empty())
    }

    /// The feature mapping, unless absent or empty.
    pub fn features(&self) -> Option<&Map<String, JsonValue>> {
        self.features.as_ref().filter(|features| !features.is_empty())
    }
}

/// Result of one sub-call, with the failure already rendered for the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Failure(String),
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for Outcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(err) => Outcome::Failure(err.to_string()),
        }
    }
}

/// Build the reply text. `recommendations` carries the risk as supplied.
pub fn compose_reply(
    recommendations: Option<(&str, Outcome<Vec<Recommendation>>)>,
    prediction: Option<Outcome<f64>>,
) -> String {
    let mut parts = Vec::new();

    if let Some((risk, outcome)) = recommendations {
        match outcome {
            Outcome::Success(items) => {
                parts.push(format!("Based on a {risk} risk profile, top picks are:"));
                for item in items {
                    let five_year = item
                        .five_year_return
                        // keeps a trailing ".0" on whole returns
                        .map(|value| format!("{value:?}"))
                        .unwrap_or_else(|| "N/A".to_string());
                    parts.push(format!("- {} ({five_year}% 5yr)", item.investment_name));
                }
            }
            Outcome::Failure(reason) => {
                parts.push(format!("Couldn't find CSV recommendations: {reason}"));
            }
        }
    }

    match prediction {
        Some(Outcome::Success(value)) => parts.push(format!(
            "Model predicts a {value:.2}% 5-year return for the provided inputs."
        )),
        Some(Outcome::Failure(reason)) => parts.push(format!("Prediction unavailable: {reason}")),
        None => {}
    }

    if parts.is_empty() {
        return HELP_TEXT.to_string();
    }
    parts.join("\n")
}
