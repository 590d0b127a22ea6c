//! Row count.

use super::{grade, Assertion};
use crate::core::{Constraint, ConstraintMetadata, ConstraintResult};
use crate::error::Result;
use crate::security::SqlSecurity;
use crate::source::DataSource;
use async_trait::async_trait;
use tracing::instrument;

/// Checks the number of rows in the table.
///
/// # Examples
///
/// ```rust
/// use qualink::constraints::{Assertion, SizeConstraint};
/// use qualink::core::Constraint;
///
/// let constraint = SizeConstraint::new(Assertion::between(1.0, 1000.0));
/// assert_eq!(constraint.name(), "Size(in [1.0, 1000.0])");
/// ```
#[derive(Debug, Clone)]
pub struct SizeConstraint {
    name: String,
    assertion: Assertion,
}

impl SizeConstraint {
    /// Creates a size constraint.
    pub fn new(assertion: Assertion) -> Self {
        Self {
            name: format!("Size({assertion})"),
            assertion,
        }
    }
}

#[async_trait]
impl Constraint for SizeConstraint {
    #[instrument(skip(self, source), fields(constraint.name = %self.name))]
    async fn evaluate(&self, source: &dyn DataSource, table: &str) -> Result<ConstraintResult> {
        SqlSecurity::validate_table_name(table)?;
        let row = source
            .execute_scalar_query(&format!("SELECT COUNT(*) AS row_count FROM {table}"))
            .await?;
        let count = row.count("row_count")?;

        grade(&self.name, count, &self.assertion, None, || {
            format!("Row count is {count}")
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> ConstraintMetadata {
        ConstraintMetadata::new(&self.name)
            .with_description(format!("Row count must satisfy {}", self.assertion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{people_source, source_from_sql};

    #[tokio::test]
    async fn test_size() {
        let source = people_source().await.unwrap();

        let result = SizeConstraint::new(Assertion::equal_to(5.0))
            .evaluate(source.as_ref(), "people")
            .await
            .unwrap();
        assert!(result.status.is_success());
        assert_eq!(result.metric, Some(5.0));

        let result = SizeConstraint::new(Assertion::greater_than(5.0))
            .evaluate(source.as_ref(), "people")
            .await
            .unwrap();
        assert!(result.status.is_failure());
        assert_eq!(result.message, "Row count is 5, expected > 5.0");
    }

    #[tokio::test]
    async fn test_empty_table() {
        let source = source_from_sql(&["CREATE TABLE nothing (v BIGINT)"]).await.unwrap();
        let result = SizeConstraint::new(Assertion::equal_to(0.0))
            .evaluate(source.as_ref(), "nothing")
            .await
            .unwrap();
        assert!(result.status.is_success());
        assert_eq!(result.metric, Some(0.0));
    }

    #[tokio::test]
    async fn test_invalid_table_name() {
        let source = people_source().await.unwrap();
        let err = SizeConstraint::new(Assertion::equal_to(5.0))
            .evaluate(source.as_ref(), "people; DROP TABLE people")
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::QualinkError::SecurityError(_)));
    }
}
