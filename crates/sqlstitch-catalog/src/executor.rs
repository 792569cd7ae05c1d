//! Query execution interface

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tabular result of a successful statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    /// Column names in projection order
    pub columns: Vec<String>,

    /// Row values, one `Vec` per row, in column order
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl RowSet {
    /// Create an empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a result with the given column names and no rows yet
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row
    pub fn push_row(&mut self, row: Vec<serde_json::Value>) {
        self.rows.push(row);
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// True when no rows came back
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Raw failure reported by a database driver
///
/// The message is kept verbatim; the diagnostics resolver pattern-matches
/// it against per-backend tables keyed by `backend`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{backend}: {message}")]
pub struct BackendError {
    /// Backend identifier, e.g. "duckdb"
    pub backend: String,

    /// Driver message, verbatim
    pub message: String,
}

impl BackendError {
    /// Create a backend error
    pub fn new(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

/// Runs composed statements against a backend.
pub trait Executor {
    /// Backend identifier used to pick a diagnostic pattern table
    fn backend(&self) -> &str;

    /// Execute one statement
    fn run(&self, sql: &str) -> Result<RowSet, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rowset_accumulates_rows() {
        let mut rows = RowSet::with_columns(["id", "name"]);
        assert!(rows.is_empty());

        rows.push_row(vec![serde_json::json!(1), serde_json::json!("ada")]);
        rows.push_row(vec![serde_json::json!(2), serde_json::json!("lin")]);

        assert_eq!(rows.row_count(), 2);
        assert_eq!(rows.columns, vec!["id", "name"]);
    }

    #[test]
    fn backend_error_display() {
        let error = BackendError::new("sqlite", "no such table: t");
        assert_eq!(error.to_string(), "sqlite: no such table: t");
    }
}
