//! The query backend seam.
//!
//! Constraints never talk to an engine directly. They render one SQL string,
//! hand it to a [`DataSource`], and read numbers back from the single row it
//! returns. Anything that can answer scalar aggregate queries and describe a
//! table's columns can back a validation run.

mod session;

pub use session::DataFusionSource;

use crate::error::{QualinkError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A query engine that validation constraints run against.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Executes a query expected to return exactly one row of numeric columns.
    ///
    /// SQL `NULL` values come back as `None`. An empty result set is a
    /// backend error.
    async fn execute_scalar_query(&self, sql: &str) -> Result<ScalarRow>;

    /// Returns the ordered columns of `table` with their declared types.
    async fn schema(&self, table: &str) -> Result<Vec<ColumnSchema>>;
}

/// One column of a table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name
    pub name: String,
    /// Declared type as rendered by the backend (e.g. `Int64`, `Utf8`)
    pub data_type: String,
}

impl ColumnSchema {
    /// Creates a column description.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// A single result row of named, possibly-null numeric values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScalarRow {
    values: Vec<(String, Option<f64>)>,
}

impl ScalarRow {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a named value.
    pub fn with_value(mut self, name: impl Into<String>, value: Option<f64>) -> Self {
        self.push(name, value);
        self
    }

    /// Appends a named value.
    pub fn push(&mut self, name: impl Into<String>, value: Option<f64>) {
        self.values.push((name.into(), value));
    }

    /// Looks up a value by column name.
    ///
    /// Returns `Ok(None)` for SQL `NULL`. A missing column means the query
    /// and its consumer disagree, which is reported as an error.
    pub fn get(&self, name: &str) -> Result<Option<f64>> {
        self.values
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| *value)
            .ok_or_else(|| {
                QualinkError::UnexpectedResult(format!(
                    "column '{name}' missing from query result"
                ))
            })
    }

    /// Looks up a value and treats SQL `NULL` as zero, for `COUNT`-like columns.
    pub fn count(&self, name: &str) -> Result<f64> {
        Ok(self.get(name)?.unwrap_or(0.0))
    }

    /// Number of columns in the row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
