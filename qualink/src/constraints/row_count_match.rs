//! Row count parity between two tables.

use super::{grade, ratio, Assertion};
use crate::core::{Constraint, ConstraintMetadata, ConstraintResult};
use crate::error::Result;
use crate::security::SqlSecurity;
use crate::source::DataSource;
use async_trait::async_trait;
use tracing::instrument;

/// Compares the row counts of two tables as `min / max`.
///
/// Two empty tables match with ratio `0.0`, so use an assertion such as
/// `>= 0.0` when empty inputs are acceptable.
#[derive(Debug, Clone)]
pub struct RowCountMatchConstraint {
    name: String,
    table_a: String,
    table_b: String,
    assertion: Assertion,
    hint: Option<String>,
}

impl RowCountMatchConstraint {
    pub fn new(
        table_a: impl Into<String>,
        table_b: impl Into<String>,
        assertion: Assertion,
    ) -> Result<Self> {
        let table_a = table_a.into();
        let table_b = table_b.into();
        SqlSecurity::validate_table_name(&table_a)?;
        SqlSecurity::validate_table_name(&table_b)?;
        Ok(Self {
            name: format!("RowCountMatch({table_a} vs {table_b})"),
            table_a,
            table_b,
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
impl Constraint for RowCountMatchConstraint {
    #[instrument(skip(self, source, _table), fields(constraint.name = %self.name))]
    async fn evaluate(&self, source: &dyn DataSource, _table: &str) -> Result<ConstraintResult> {
        let sql = format!(
            "SELECT a.count_a, b.count_b FROM \
             (SELECT COUNT(*) AS count_a FROM {}) a \
             CROSS JOIN (SELECT COUNT(*) AS count_b FROM {}) b",
            self.table_a, self.table_b
        );
        let row = source.execute_scalar_query(&sql).await?;
        let count_a = row.count("count_a")?;
        let count_b = row.count("count_b")?;

        let value = ratio(count_a.min(count_b), count_a.max(count_b));
        grade(&self.name, value, &self.assertion, self.hint.as_deref(), || {
            format!(
                "Row count ratio of '{}' ({count_a}) and '{}' ({count_b}) is {value:.4}",
                self.table_a, self.table_b
            )
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> ConstraintMetadata {
        ConstraintMetadata::new(&self.name)
            .with_description("Compares row counts between two tables")
            .with_extra("table_a", self.table_a.clone())
            .with_extra("table_b", self.table_b.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::source_from_sql;

    #[tokio::test]
    async fn test_ratio_is_min_over_max() {
        let source = source_from_sql(&[
            "CREATE TABLE source_rows (v BIGINT)",
            "INSERT INTO source_rows VALUES (1), (2), (3), (4), (5), (6), (7), (8), (9), (10)",
            "CREATE TABLE target_rows (v BIGINT)",
            "INSERT INTO target_rows VALUES (1), (2), (3), (4), (5), (6), (7), (8)",
        ])
        .await
        .unwrap();

        let constraint =
            RowCountMatchConstraint::new("source_rows", "target_rows", Assertion::equal_to(1.0))
                .unwrap();
        let result = constraint.evaluate(source.as_ref(), "source_rows").await.unwrap();
        assert!(result.status.is_failure());
        assert_eq!(result.metric, Some(0.8));
        assert_eq!(
            result.message,
            "Row count ratio of 'source_rows' (10) and 'target_rows' (8) is 0.8000, expected == 1.0"
        );

        let reversed =
            RowCountMatchConstraint::new("target_rows", "source_rows", Assertion::greater_than(0.75))
                .unwrap();
        let result = reversed.evaluate(source.as_ref(), "source_rows").await.unwrap();
        assert!(result.status.is_success());
        assert_eq!(result.metric, Some(0.8));
    }

    #[tokio::test]
    async fn test_empty_tables() {
        let source = source_from_sql(&[
            "CREATE TABLE left_empty (v BIGINT)",
            "CREATE TABLE right_empty (v BIGINT)",
        ])
        .await
        .unwrap();
        let result =
            RowCountMatchConstraint::new("left_empty", "right_empty", Assertion::equal_to(0.0))
                .unwrap()
                .evaluate(source.as_ref(), "left_empty")
                .await
                .unwrap();
        assert!(result.status.is_success());
    }

    #[test]
    fn test_metadata() {
        let constraint = RowCountMatchConstraint::new("a", "b", Assertion::equal_to(1.0)).unwrap();
        assert_eq!(constraint.name(), "RowCountMatch(a vs b)");
        let metadata = constraint.metadata();
        assert_eq!(metadata.extra["table_a"], "a");
        assert_eq!(metadata.extra["table_b"], "b");
        assert!(RowCountMatchConstraint::new("a b", "b", Assertion::equal_to(1.0)).is_err());
    }
}
