//! Column existence.

use super::Assertion;
use crate::core::{Constraint, ConstraintMetadata, ConstraintResult};
use crate::error::{QualinkError, Result};
use crate::security::SqlSecurity;
use crate::source::DataSource;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Passes when the table has a column with exactly this name.
///
/// The metric is `1.0` when the column exists and `0.0` otherwise. On failure
/// the message lists the columns that do exist.
#[derive(Debug, Clone)]
pub struct ColumnExistsConstraint {
    name: String,
    column: String,
    hint: Option<String>,
}

impl ColumnExistsConstraint {
    /// Creates a column-exists constraint.
    pub fn new(column: impl Into<String>) -> Result<Self> {
        let column = column.into();
        if column.trim().is_empty() {
            return Err(QualinkError::Configuration(
                "ColumnExists requires a column name".to_string(),
            ));
        }
        Ok(Self {
            name: format!("ColumnExists({column})"),
            column,
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
impl Constraint for ColumnExistsConstraint {
    #[instrument(skip(self, source), fields(constraint.name = %self.name))]
    async fn evaluate(&self, source: &dyn DataSource, table: &str) -> Result<ConstraintResult> {
        SqlSecurity::validate_table_name(table)?;
        let schema = source.schema(table).await?;

        if schema.iter().any(|column| column.name == self.column) {
            debug!(constraint.name = %self.name, "Column found");
            return Ok(ConstraintResult::success_with_metric(1.0));
        }

        let available: Vec<&str> = schema.iter().map(|column| column.name.as_str()).collect();
        let mut message = format!(
            "Column '{}' does not exist in table '{table}', expected {}. Available: [{}]",
            self.column,
            Assertion::equal_to(1.0),
            available.join(", ")
        );
        if let Some(hint) = self.hint.as_deref().filter(|h| !h.trim().is_empty()) {
            message.push_str(". ");
            message.push_str(hint.trim());
        }
        Ok(ConstraintResult::failure_with_metric(0.0, message))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> ConstraintMetadata {
        ConstraintMetadata::for_column(&self.name, &self.column)
            .with_description(format!("Column '{}' must exist", self.column))
    }
}
