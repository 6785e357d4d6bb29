//! Risk-based recommendations over the raw dataset
//!
//! Matching is case-insensitive on trimmed text. An exact pass runs first;
//! only when it matches nothing does a substring pass run, so "med" still
//! finds "Medium". The substring pass can also match wider categories than
//! intended (e.g. "high" inside "Highly Speculative").

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use superfund_ai_core::{AiCoreError, Table, Value};
use tracing::debug;

/// Number of rows returned per query
pub const TOP_N: usize = 3;

/// Name used when a row has no name cell
pub const UNKNOWN_NAME: &str = "Unknown";

/// Column names the recommender reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendColumns {
    pub risk: String,
    pub name: String,
    pub target: String,
}

/// One recommended row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub investment_name: String,
    pub risk_level: Option<String>,
    pub five_year_return: Option<f64>,
}

/// Top rows for `risk`, highest target first.
pub fn recommend(
    table: &Table,
    risk: &str,
    columns: &RecommendColumns,
) -> Result<Vec<Recommendation>, AiCoreError> {
    let risk_column = table.column(&columns.risk).ok_or_else(|| {
        AiCoreError::Schema(format!(
            "CSV is missing '{}' column required for filtering.",
            columns.risk
        ))
    })?;

    let wanted = normalize(risk);
    let cells: Vec<Option<String>> = risk_column
        .values()
        .iter()
        .map(|value| value.render().map(|text| normalize(&text)))
        .collect();

    let mut matched = matching_rows(&cells, |cell| cell == wanted);
    if matched.is_empty() {
        matched = matching_rows(&cells, |cell| cell.contains(&wanted));
        debug!(risk, rows = matched.len(), "Fell back to substring risk match");
    }

    if matched.is_empty() {
        return Err(AiCoreError::NoMatches {
            risk: risk.to_string(),
        });
    }

    if let Some(target) = table.column(&columns.target) {
        // stable, so equal returns keep table order
        matched.sort_by(|&a, &b| {
            descending_missing_last(
                target.get(a).and_then(Value::as_f64),
                target.get(b).and_then(Value::as_f64),
            )
        });
    }

    Ok(matched
        .into_iter()
        .take(TOP_N)
        .map(|row| Recommendation {
            investment_name: table
                .value(row, &columns.name)
                .and_then(Value::render)
                .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            risk_level: table.value(row, &columns.risk).and_then(Value::render),
            five_year_return: table.value(row, &columns.target).and_then(Value::as_f64),
        })
        .collect())
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn matching_rows(cells: &[Option<String>], matches: impl Fn(&str) -> bool) -> Vec<usize> {
    cells
        .iter()
        .enumerate()
        .filter(|(_, cell)| cell.as_deref().map(&matches).unwrap_or(false))
        .map(|(row, _)| row)
        .collect()
}

fn descending_missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a.filter(|v| !v.is_nan()), b.filter(|v| !v.is_nan())) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> RecommendColumns {
        RecommendColumns {
            risk: "Risk_Level".into(),
            name: "Investment_Name".into(),
            target: "5yr_Return".into(),
        }
    }

    fn table(csv: &str) -> Table {
        Table::from_reader(csv.as_bytes()).unwrap()
    }

    fn names(recs: &[Recommendation]) -> Vec<&str> {
        recs.iter().map(|r| r.investment_name.as_str()).collect()
    }

    #[test]
    fn test_sorted_by_return_descending() {
        let table = table("Investment_Name,Risk_Level,5yr_Return\nA,Low,4.2\nB,Low,6.1\n");
        let recs = recommend(&table, "low", &columns()).unwrap();
        assert_eq!(names(&recs), vec!["B", "A"]);
        assert_eq!(recs[0].risk_level.as_deref(), Some("Low"));
        assert_eq!(recs[0].five_year_return, Some(6.1));
    }

    #[test]
    fn test_exact_match_wins_over_substring() {
        let table = table(
            "Investment_Name,Risk_Level,5yr_Return\nA,Medium,5\nB,High,9\nC,Medium-High,8\n",
        );
        let recs = recommend(&table, " MEDIUM ", &columns()).unwrap();
        assert_eq!(names(&recs), vec!["A"]);
    }

    #[test]
    fn test_substring_fallback() {
        let table = table("Investment_Name,Risk_Level,5yr_Return\nA,Medium,5\nB,High,9\n");
        let recs = recommend(&table, "med", &columns()).unwrap();
        assert_eq!(names(&recs), vec!["A"]);
    }

    #[test]
    fn test_top_three_with_missing_returns_last() {
        let five = table(
            "Investment_Name,Risk_Level,5yr_Return\nA,High,\nB,High,3\nC,High,9\nD,High,3\nE,High,1\n",
        );
        let recs = recommend(&five, "high", &columns()).unwrap();
        assert_eq!(names(&recs), vec!["C", "B", "D"]);

        let two = table("Investment_Name,Risk_Level,5yr_Return\nA,High,\nB,High,3\n");
        let recs = recommend(&two, "high", &columns()).unwrap();
        assert_eq!(names(&recs), vec!["B", "A"]);
        assert_eq!(recs[1].five_year_return, None);
    }

    #[test]
    fn test_risk_level_returned_as_stored() {
        let table = table("Investment_Name,Risk_Level,5yr_Return\nA, Low ,5\nB,High,9\n");
        let recs = recommend(&table, "LOW", &columns()).unwrap();
        assert_eq!(names(&recs), vec!["A"]);
        assert_eq!(recs[0].risk_level.as_deref(), Some(" Low "));
    }

    #[test]
    fn test_missing_risk_never_matches() {
        let table = table("Investment_Name,Risk_Level,5yr_Return\nA,,5\nB,Low,1\n");
        let recs = recommend(&table, "", &columns()).unwrap();
        assert_eq!(names(&recs), vec!["B"]);
    }

    #[test]
    fn test_no_matches() {
        let table = table("Investment_Name,Risk_Level,5yr_Return\nA,Low,5\n");
        let err = recommend(&table, "aggressive", &columns()).unwrap_err();
        assert!(err.is_no_matches());
        assert_eq!(err.to_string(), "No investments found for risk 'aggressive'");
    }

    #[test]
    fn test_missing_risk_column() {
        let table = table("Investment_Name,5yr_Return\nA,5\n");
        let err = recommend(&table, "low", &columns()).unwrap_err();
        assert!(matches!(err, AiCoreError::Schema(_)));
    }

    #[test]
    fn test_without_target_or_name_columns() {
        let table = table("Risk_Level\nLow\nLow\nHigh\n");
        let recs = recommend(&table, "low", &columns()).unwrap();
        assert_eq!(recs.len(), 2);
        assert!(recs.iter().all(|r| r.investment_name == UNKNOWN_NAME));
        assert!(recs.iter().all(|r| r.five_year_return.is_none()));
    }

    #[test]
    fn test_idempotent() {
        let table = table("Investment_Name,Risk_Level,5yr_Return\nA,Low,4\nB,Low,4\nC,Low,7\n");
        let first = recommend(&table, "Low", &columns()).unwrap();
        let second = recommend(&table, "Low", &columns()).unwrap();
        assert_eq!(first, second);
        assert_eq!(names(&first), vec!["C", "A", "B"]);
    }
}
