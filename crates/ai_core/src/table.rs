//! Delimited dataset loading
//!
//! Reads a headered CSV file into a column-major table. Column names are
//! trimmed and each column gets a storage type inferred once from its
//! non-missing cells. Text cells are kept as stored. No other validation happens here:
//! malformed rows surface later when a recipe tries to use them.

use crate::errors::{AiCoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Cell tokens read as a missing value.
pub const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "<NA>", "#N/A",
    "#NA",
];

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view of the cell. Text cells are never coerced.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Text form of the cell, `None` when missing.
    pub fn render(&self) -> Option<String> {
        match self {
            Value::Number(v) => Some(v.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Missing => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
            Value::Missing => f.write_str("NaN"),
        }
    }
}

/// Storage type declared for a column at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnType,
    values: Vec<Value>,
}

impl Column {
    /// Build a column from raw cell strings, inferring its storage type.
    fn from_raw(name: String, raw: Vec<String>) -> Self {
        let observed: Vec<&str> = raw
            .iter()
            .map(String::as_str)
            .filter(|cell| !is_missing_token(cell))
            .map(str::trim)
            .collect();

        let kind = if observed.iter().all(|cell| cell.parse::<i64>().is_ok()) {
            if observed.is_empty() {
                // an all-missing column is numeric, same as the dataframe convention
                ColumnType::Float
            } else {
                ColumnType::Integer
            }
        } else if observed.iter().all(|cell| cell.parse::<f64>().is_ok()) {
            ColumnType::Float
        } else {
            ColumnType::Text
        };

        let values = raw
            .into_iter()
            .map(|cell| {
                if is_missing_token(&cell) {
                    Value::Missing
                } else if kind.is_numeric() {
                    cell.trim().parse::<f64>().map(Value::Number).unwrap_or(Value::Missing)
                } else {
                    Value::Text(cell)
                }
            })
            .collect();

        Self { name, kind, values }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnType {
        self.kind
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row)
    }
}

/// In-memory table with a fixed set of columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Load a table from a CSV file on disk.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AiCoreError::DatasetNotFound {
                path: path.to_path_buf(),
            });
        }

        let table = Self::from_reader(File::open(path)?)?;
        debug!(
            path = %path.display(),
            rows = table.len(),
            columns = table.columns.len(),
            "Loaded dataset"
        );
        Ok(table)
    }

    /// Parse a table from any CSV byte source. The first record is the header.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let names: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|name| name.trim().to_string())
            .collect();

        let mut raw: Vec<Vec<String>> = vec![Vec::new(); names.len()];
        let mut rows = 0;
        for record in csv_reader.records() {
            let record = record?;
            // ragged rows are padded or truncated to the header width
            for (idx, cells) in raw.iter_mut().enumerate() {
                cells.push(record.get(idx).unwrap_or("").to_string());
            }
            rows += 1;
        }

        let columns = names
            .into_iter()
            .zip(raw)
            .map(|(name, cells)| Column::from_raw(name, cells))
            .collect();

        Ok(Self { columns, rows })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Look up one cell by row index and column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        self.column(column).and_then(|column| column.get(row))
    }

    /// Copy of the table keeping only the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|column| Column {
                name: column.name.clone(),
                kind: column.kind,
                values: indices
                    .iter()
                    .filter_map(|&idx| column.values.get(idx).cloned())
                    .collect(),
            })
            .collect();

        Self {
            columns,
            rows: indices.iter().filter(|&&idx| idx < self.rows).count(),
        }
    }

    /// Copy of the table without rows whose `column` cell is missing.
    /// Declared column types are kept as loaded.
    pub fn drop_missing(&self, column: &str) -> Result<Self> {
        let target = self
            .column(column)
            .ok_or_else(|| AiCoreError::Schema(format!("Column '{column}' not found in CSV.")))?;

        let keep: Vec<usize> = target
            .values
            .iter()
            .enumerate()
            .filter(|(_, value)| !value.is_missing())
            .map(|(idx, _)| idx)
            .collect();

        Ok(self.select_rows(&keep))
    }
}

fn is_missing_token(cell: &str) -> bool {
    MISSING_TOKENS.contains(&cell.trim())
}
