//! Foreign-key style coverage between two tables.

use super::{grade, ratio, Assertion};
use crate::core::{Constraint, ConstraintMetadata, ConstraintResult};
use crate::error::Result;
use crate::security::SqlSecurity;
use crate::source::DataSource;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Checks the share of non-null child keys that exist in a parent table.
///
/// Both tables are fixed at construction; the table passed to `evaluate` is
/// ignored. Parent keys are de-duplicated before the anti-join so repeated
/// parents never inflate the count.
///
/// # Examples
///
/// ```rust
/// use qualink::constraints::{Assertion, ReferentialIntegrityConstraint};
/// use qualink::core::Constraint;
///
/// let fk = ReferentialIntegrityConstraint::new(
///     "orders",
///     "customer_id",
///     "customers",
///     "id",
///     Assertion::equal_to(1.0),
/// )
/// .unwrap();
/// assert_eq!(fk.name(), "ReferentialIntegrity(orders.customer_id -> customers.id)");
/// ```
#[derive(Debug, Clone)]
pub struct ReferentialIntegrityConstraint {
    name: String,
    child_table: String,
    child_column: String,
    parent_table: String,
    parent_column: String,
    quoted_child: String,
    quoted_parent: String,
    assertion: Assertion,
    hint: Option<String>,
}

impl ReferentialIntegrityConstraint {
    pub fn new(
        child_table: impl Into<String>,
        child_column: impl Into<String>,
        parent_table: impl Into<String>,
        parent_column: impl Into<String>,
        assertion: Assertion,
    ) -> Result<Self> {
        let child_table = child_table.into();
        let child_column = child_column.into();
        let parent_table = parent_table.into();
        let parent_column = parent_column.into();

        SqlSecurity::validate_table_name(&child_table)?;
        SqlSecurity::validate_table_name(&parent_table)?;
        let quoted_child = SqlSecurity::escape_identifier(&child_column)?;
        let quoted_parent = SqlSecurity::escape_identifier(&parent_column)?;

        Ok(Self {
            name: format!(
                "ReferentialIntegrity({child_table}.{child_column} -> {parent_table}.{parent_column})"
            ),
            child_table,
            child_column,
            parent_table,
            parent_column,
            quoted_child,
            quoted_parent,
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
impl Constraint for ReferentialIntegrityConstraint {
    #[instrument(skip(self, source, _table), fields(constraint.name = %self.name))]
    async fn evaluate(&self, source: &dyn DataSource, _table: &str) -> Result<ConstraintResult> {
        let child = &self.child_table;
        let parent = &self.parent_table;
        let cc = &self.quoted_child;
        let pc = &self.quoted_parent;
        let sql = format!(
            "SELECT totals.child_count, orphans.unmatched_count FROM \
             (SELECT COUNT(*) AS child_count FROM {child} WHERE {cc} IS NOT NULL) totals \
             CROSS JOIN \
             (SELECT COUNT(*) AS unmatched_count FROM {child} c \
              LEFT JOIN (SELECT DISTINCT {pc} AS parent_key FROM {parent}) p ON c.{cc} = p.parent_key \
              WHERE c.{cc} IS NOT NULL AND p.parent_key IS NULL) orphans"
        );
        let row = source.execute_scalar_query(&sql).await?;
        let total = row.count("child_count")?;
        let unmatched = row.count("unmatched_count")?;
        debug!(
            constraint.name = %self.name,
            child_keys = total,
            unmatched = unmatched,
            "Referential integrity counts"
        );

        let value = ratio(total - unmatched, total);
        grade(&self.name, value, &self.assertion, self.hint.as_deref(), || {
            format!(
                "Referential integrity of {}.{} -> {}.{} is {value:.4} ({unmatched} unmatched of {total})",
                self.child_table, self.child_column, self.parent_table, self.parent_column
            )
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> ConstraintMetadata {
        ConstraintMetadata::for_column(&self.name, &self.child_column)
            .with_description("Values in the child column must exist in the parent column")
            .with_extra("child_table", self.child_table.clone())
            .with_extra("child_column", self.child_column.clone())
            .with_extra("parent_table", self.parent_table.clone())
            .with_extra("parent_column", self.parent_column.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QualinkError;
    use crate::source::DataFusionSource;
    use crate::test_utils::source_from_sql;
    use std::sync::Arc;

    async fn orders() -> Arc<DataFusionSource> {
        source_from_sql(&[
            "CREATE TABLE users (id BIGINT)",
            "INSERT INTO users VALUES (1), (2), (3), (3)",
            "CREATE TABLE orders (user_id BIGINT)",
            "INSERT INTO orders VALUES (1), (2), (99)",
            "CREATE TABLE clean_orders (user_id BIGINT)",
            "INSERT INTO clean_orders VALUES (1), (1), (3), (NULL)",
        ])
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_orphan_keys_fail() {
        let source = orders().await;
        let constraint = ReferentialIntegrityConstraint::new(
            "orders",
            "user_id",
            "users",
            "id",
            Assertion::equal_to(1.0),
        )
        .unwrap();

        let result = constraint.evaluate(source.as_ref(), "orders").await.unwrap();
        assert!(result.status.is_failure());
        let metric = result.metric.unwrap();
        assert!((metric - 2.0 / 3.0).abs() < 1e-9);
        assert!(result.message.contains("(1 unmatched of 3)"));
        assert!(result.message.ends_with("expected == 1.0"));
    }

    #[tokio::test]
    async fn test_null_child_keys_and_duplicate_parents() {
        let source = orders().await;
        let constraint = ReferentialIntegrityConstraint::new(
            "clean_orders",
            "user_id",
            "users",
            "id",
            Assertion::equal_to(1.0),
        )
        .unwrap();

        // evaluated against an unrelated primary table
        let result = constraint.evaluate(source.as_ref(), "orders").await.unwrap();
        assert!(result.status.is_success(), "{result:?}");
        assert_eq!(result.metric, Some(1.0));
    }

    #[test]
    fn test_metadata_carries_both_tables() {
        let constraint = ReferentialIntegrityConstraint::new(
            "orders",
            "user_id",
            "users",
            "id",
            Assertion::equal_to(1.0),
        )
        .unwrap();
        let metadata = constraint.metadata();
        assert_eq!(metadata.extra["child_table"], "orders");
        assert_eq!(metadata.extra["parent_table"], "users");
        assert_eq!(metadata.extra["parent_column"], "id");
    }

    #[test]
    fn test_table_names_validated() {
        let err = ReferentialIntegrityConstraint::new(
            "orders; DROP TABLE users",
            "user_id",
            "users",
            "id",
            Assertion::equal_to(1.0),
        )
        .unwrap_err();
        assert!(matches!(err, QualinkError::SecurityError(_)));
    }
}
