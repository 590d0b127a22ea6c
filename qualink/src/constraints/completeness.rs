//! Completeness: the share of rows where a column is not null.

use super::{grade, Assertion};
use crate::core::{Constraint, ConstraintMetadata, ConstraintResult};
use crate::error::Result;
use crate::security::SqlSecurity;
use crate::source::DataSource;
use async_trait::async_trait;
use tracing::instrument;

/// Checks the non-null ratio of a column.
///
/// An empty table is complete (`1.0`); a table whose column is entirely
/// null has completeness `0.0`.
///
/// # Examples
///
/// ```rust
/// use qualink::constraints::{Assertion, CompletenessConstraint};
/// use qualink::core::Constraint;
///
/// let constraint = CompletenessConstraint::complete("user_id").unwrap();
/// assert_eq!(constraint.name(), "Completeness(user_id)");
///
/// let partial =
///     CompletenessConstraint::new("email", Assertion::greater_than_or_equal(0.95)).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct CompletenessConstraint {
    name: String,
    column: String,
    quoted: String,
    assertion: Assertion,
    hint: Option<String>,
}

impl CompletenessConstraint {
    /// Creates a completeness constraint with an arbitrary assertion.
    pub fn new(column: impl Into<String>, assertion: Assertion) -> Result<Self> {
        let column = column.into();
        let quoted = SqlSecurity::escape_identifier(&column)?;
        Ok(Self {
            name: format!("Completeness({column})"),
            column,
            quoted,
            assertion,
            hint: None,
        })
    }

    /// The column must contain no nulls.
    pub fn complete(column: impl Into<String>) -> Result<Self> {
        Self::new(column, Assertion::equal_to(1.0))
    }

    /// Appends advice to the failure message.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

#[async_trait]
impl Constraint for CompletenessConstraint {
    #[instrument(skip(self, source), fields(constraint.name = %self.name))]
    async fn evaluate(&self, source: &dyn DataSource, table: &str) -> Result<ConstraintResult> {
        SqlSecurity::validate_table_name(table)?;
        let sql = format!(
            "SELECT COUNT(*) AS total_count, COUNT({}) AS non_null_count FROM {table}",
            self.quoted
        );
        let row = source.execute_scalar_query(&sql).await?;
        let total = row.count("total_count")?;
        let non_null = row.count("non_null_count")?;

        let completeness = if total == 0.0 { 1.0 } else { non_null / total };

        grade(&self.name, completeness, &self.assertion, self.hint.as_deref(), || {
            format!("Completeness of '{}' is {completeness:.4}", self.column)
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> ConstraintMetadata {
        ConstraintMetadata::for_column(&self.name, &self.column).with_description(format!(
            "Completeness of '{}' satisfies {}",
            self.column, self.assertion
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConstraintStatus;
    use crate::test_utils::{people_source, source_from_sql};

    #[tokio::test]
    async fn test_complete_column() {
        let source = people_source().await.unwrap();
        let constraint = CompletenessConstraint::complete("id").unwrap();

        let result = constraint.evaluate(source.as_ref(), "people").await.unwrap();
        assert_eq!(result.status, ConstraintStatus::Success);
        assert_eq!(result.metric, Some(1.0));
        assert!(result.message.is_empty());
    }

    #[tokio::test]
    async fn test_incomplete_column() {
        let source = people_source().await.unwrap();
        let constraint = CompletenessConstraint::complete("email").unwrap();

        let result = constraint.evaluate(source.as_ref(), "people").await.unwrap();
        assert_eq!(result.status, ConstraintStatus::Failure);
        assert_eq!(result.metric, Some(0.8));
        assert_eq!(
            result.message,
            "Completeness of 'email' is 0.8000, expected == 1.0"
        );
    }

    #[tokio::test]
    async fn test_threshold() {
        let source = people_source().await.unwrap();
        let constraint =
            CompletenessConstraint::new("email", Assertion::greater_than_or_equal(0.8)).unwrap();

        let result = constraint.evaluate(source.as_ref(), "people").await.unwrap();
        assert_eq!(result.status, ConstraintStatus::Success);
    }

    #[tokio::test]
    async fn test_empty_and_all_null() {
        let source = source_from_sql(&[
            "CREATE TABLE empty_t (v BIGINT)",
            "CREATE TABLE nulls_t (v BIGINT)",
            "INSERT INTO nulls_t VALUES (NULL), (NULL)",
        ])
        .await
        .unwrap();
        let constraint = CompletenessConstraint::complete("v").unwrap();

        let empty = constraint.evaluate(source.as_ref(), "empty_t").await.unwrap();
        assert_eq!(empty.metric, Some(1.0));
        assert!(empty.status.is_success());

        let nulls = constraint.evaluate(source.as_ref(), "nulls_t").await.unwrap();
        assert_eq!(nulls.metric, Some(0.0));
        assert!(nulls.status.is_failure());
    }

    #[tokio::test]
    async fn test_missing_column_is_backend_error() {
        let source = people_source().await.unwrap();
        let constraint = CompletenessConstraint::complete("nope").unwrap();
        assert!(constraint.evaluate(source.as_ref(), "people").await.is_err());
    }

    #[test]
    fn test_metadata() {
        let constraint = CompletenessConstraint::complete("email").unwrap();
        let metadata = constraint.metadata();
        assert_eq!(metadata.name, "Completeness(email)");
        assert_eq!(metadata.column.as_deref(), Some("email"));
        assert!(CompletenessConstraint::complete("").is_err());
    }
}
