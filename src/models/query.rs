//! Query-related data models.
//!
//! This module defines the read-only verdict for a statement and the tabular
//! payload every tool returns.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Outcome of the read-only gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny,
}

/// Verdict plus the reason shown to the client when the statement is denied.
///
/// Computed fresh for every statement, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryClassification {
    pub verdict: Verdict,
    pub reason: Option<String>,
}

impl QueryClassification {
    pub fn allow() -> Self {
        Self {
            verdict: Verdict::Allow,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Deny,
            reason: Some(reason.into()),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.verdict == Verdict::Allow
    }
}

/// Column names plus rows of transport-safe cells (string, number, bool, null).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
}

impl TabularResult {
    /// Create a result from column names and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<JsonValue>>) -> Self {
        Self { columns, rows }
    }

    /// Build a one-column result, one row per value.
    pub fn single_column<I>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            columns: vec![column.to_string()],
            rows: values
                .into_iter()
                .map(|v| vec![JsonValue::String(v)])
                .collect(),
        }
    }

    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
