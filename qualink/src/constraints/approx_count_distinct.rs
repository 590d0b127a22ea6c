//! Approximate distinct count.

use super::{grade, Assertion};
use crate::core::{Constraint, ConstraintMetadata, ConstraintResult};
use crate::error::Result;
use crate::security::SqlSecurity;
use crate::source::DataSource;
use async_trait::async_trait;
use tracing::instrument;

/// Checks the approximate number of distinct non-null values in a column.
///
/// Uses the engine's HyperLogLog-based `APPROX_DISTINCT`, which is exact for
/// small cardinalities and within a few percent for large ones.
#[derive(Debug, Clone)]
pub struct ApproxCountDistinctConstraint {
    name: String,
    column: String,
    quoted: String,
    assertion: Assertion,
    hint: Option<String>,
}

impl ApproxCountDistinctConstraint {
    /// Creates an approximate-distinct-count constraint.
    pub fn new(column: impl Into<String>, assertion: Assertion) -> Result<Self> {
        let column = column.into();
        let quoted = SqlSecurity::escape_identifier(&column)?;
        Ok(Self {
            name: format!("ApproxCountDistinct({column})"),
            column,
            quoted,
            assertion,
            hint: None,
        })
    }

    /// Appends advice to the failure message.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

#[async_trait]
impl Constraint for ApproxCountDistinctConstraint {
    #[instrument(skip(self, source), fields(constraint.name = %self.name))]
    async fn evaluate(&self, source: &dyn DataSource, table: &str) -> Result<ConstraintResult> {
        SqlSecurity::validate_table_name(table)?;
        let sql = format!(
            "SELECT APPROX_DISTINCT({}) AS approx_distinct_count FROM {table}",
            self.quoted
        );
        let row = source.execute_scalar_query(&sql).await?;
        let count = row.count("approx_distinct_count")?;

        grade(&self.name, count, &self.assertion, self.hint.as_deref(), || {
            format!("ApproxCountDistinct of '{}' is {count}", self.column)
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> ConstraintMetadata {
        ConstraintMetadata::for_column(&self.name, &self.column).with_description(format!(
            "Approximate distinct count of '{}' must satisfy {}",
            self.column, self.assertion
        ))
    }
}
