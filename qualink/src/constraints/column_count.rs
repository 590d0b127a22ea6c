//! Column count.

use super::{grade, Assertion};
use crate::core::{Constraint, ConstraintMetadata, ConstraintResult};
use crate::error::Result;
use crate::security::SqlSecurity;
use crate::source::DataSource;
use async_trait::async_trait;
use tracing::instrument;

/// Checks the number of columns in the table's schema.
#[derive(Debug, Clone)]
pub struct ColumnCountConstraint {
    name: String,
    assertion: Assertion,
}

impl ColumnCountConstraint {
    /// Creates a column-count constraint.
    pub fn new(assertion: Assertion) -> Self {
        Self {
            name: format!("ColumnCount({assertion})"),
            assertion,
        }
    }
}

#[async_trait]
impl Constraint for ColumnCountConstraint {
    #[instrument(skip(self, source), fields(constraint.name = %self.name))]
    async fn evaluate(&self, source: &dyn DataSource, table: &str) -> Result<ConstraintResult> {
        SqlSecurity::validate_table_name(table)?;
        let count = source.schema(table).await?.len() as f64;

        grade(&self.name, count, &self.assertion, None, || {
            format!("Column count is {count}")
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> ConstraintMetadata {
        ConstraintMetadata::new(&self.name)
            .with_description(format!("Column count must satisfy {}", self.assertion))
    }
}
