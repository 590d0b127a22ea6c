//! Uniqueness, distinctness and unique-value-ratio constraints.
//!
//! All three group the table by the selected columns, skipping rows where
//! any of them is null, and differ only in which counts they divide:
//!
//! - uniqueness: distinct combinations / non-null rows
//! - distinctness: distinct combinations / all rows
//! - unique value ratio: combinations seen exactly once / distinct combinations

use super::{grade, not_null_filter, quote_columns, ratio, unit_interval, Assertion};
use crate::core::{Constraint, ConstraintMetadata, ConstraintResult};
use crate::error::Result;
use crate::security::SqlSecurity;
use crate::source::{DataSource, ScalarRow};
use async_trait::async_trait;
use tracing::instrument;

/// Columns shared by the three constraints in this module.
#[derive(Debug, Clone)]
struct GroupedColumns {
    columns: Vec<String>,
    quoted: Vec<String>,
}

impl GroupedColumns {
    fn new<I, S>(columns: I, constraint: &str) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let quoted = quote_columns(&columns, constraint)?;
        Ok(Self { columns, quoted })
    }

    fn label(&self) -> String {
        self.columns.join(", ")
    }

    /// One row with `distinct_count`, `non_null_rows`, `singleton_count` and `total_rows`.
    async fn counts(&self, source: &dyn DataSource, table: &str) -> Result<ScalarRow> {
        SqlSecurity::validate_table_name(table)?;
        let group_by = self.quoted.join(", ");
        let filter = not_null_filter(&self.quoted);
        let sql = format!(
            "SELECT grouped.distinct_count, grouped.non_null_rows, grouped.singleton_count, totals.total_rows \
             FROM (\
                SELECT COUNT(*) AS distinct_count, \
                       SUM(cnt) AS non_null_rows, \
                       COUNT(CASE WHEN cnt = 1 THEN 1 END) AS singleton_count \
                FROM (SELECT COUNT(*) AS cnt FROM {table} WHERE {filter} GROUP BY {group_by}) counted\
             ) grouped \
             CROSS JOIN (SELECT COUNT(*) AS total_rows FROM {table}) totals"
        );
        source.execute_scalar_query(&sql).await
    }
}

/// Distinct non-null combinations over non-null rows, compared to a minimum.
///
/// A column set with no non-null rows is treated as fully unique (`1.0`).
///
/// # Examples
///
/// ```rust
/// use qualink::constraints::UniquenessConstraint;
/// use qualink::core::Constraint;
///
/// let constraint = UniquenessConstraint::new(["customer_id", "order_id"], 1.0).unwrap();
/// assert_eq!(constraint.name(), "Uniqueness(customer_id, order_id)");
/// ```
#[derive(Debug, Clone)]
pub struct UniquenessConstraint {
    name: String,
    columns: GroupedColumns,
    threshold: f64,
    assertion: Assertion,
    hint: Option<String>,
}

impl UniquenessConstraint {
    /// Passes when the uniqueness ratio is at least `threshold` (in `[0, 1]`).
    pub fn new<I, S>(columns: I, threshold: f64) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = GroupedColumns::new(columns, "Uniqueness")?;
        let threshold = unit_interval(threshold, "uniqueness threshold")?;
        Ok(Self {
            name: format!("Uniqueness({})", columns.label()),
            columns,
            threshold,
            assertion: Assertion::greater_than_or_equal(threshold),
            hint: None,
        })
    }

    /// Every non-null combination must be unique.
    pub fn unique<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(columns, 1.0)
    }

    /// The minimum accepted ratio.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Appends advice to the failure message.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

#[async_trait]
impl Constraint for UniquenessConstraint {
    #[instrument(skip(self, source), fields(constraint.name = %self.name))]
    async fn evaluate(&self, source: &dyn DataSource, table: &str) -> Result<ConstraintResult> {
        let row = self.columns.counts(source, table).await?;
        let distinct = row.count("distinct_count")?;
        let non_null = row.count("non_null_rows")?;

        let uniqueness = if non_null == 0.0 { 1.0 } else { distinct / non_null };

        grade(&self.name, uniqueness, &self.assertion, self.hint.as_deref(), || {
            format!("Uniqueness of ({}) is {uniqueness:.4}", self.columns.label())
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> ConstraintMetadata {
        let metadata = ConstraintMetadata::new(&self.name)
            .with_description(format!(
                "Uniqueness of ({}) is at least {}",
                self.columns.label(),
                self.threshold
            ))
            .with_extra("columns", self.columns.label());
        match self.columns.columns.as_slice() {
            [single] => ConstraintMetadata {
                column: Some(single.clone()),
                ..metadata
            },
            _ => metadata,
        }
    }
}

/// Distinct non-null combinations over all rows.
#[derive(Debug, Clone)]
pub struct DistinctnessConstraint {
    name: String,
    columns: GroupedColumns,
    assertion: Assertion,
    hint: Option<String>,
}

impl DistinctnessConstraint {
    /// Creates a distinctness constraint.
    pub fn new<I, S>(columns: I, assertion: Assertion) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = GroupedColumns::new(columns, "Distinctness")?;
        Ok(Self {
            name: format!("Distinctness({})", columns.label()),
            columns,
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
impl Constraint for DistinctnessConstraint {
    #[instrument(skip(self, source), fields(constraint.name = %self.name))]
    async fn evaluate(&self, source: &dyn DataSource, table: &str) -> Result<ConstraintResult> {
        let row = self.columns.counts(source, table).await?;
        let distinctness = ratio(row.count("distinct_count")?, row.count("total_rows")?);

        grade(&self.name, distinctness, &self.assertion, self.hint.as_deref(), || {
            format!("Distinctness of ({}) is {distinctness:.4}", self.columns.label())
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> ConstraintMetadata {
        ConstraintMetadata::new(&self.name)
            .with_description(format!(
                "Distinctness of ({}) satisfies {}",
                self.columns.label(),
                self.assertion
            ))
            .with_extra("columns", self.columns.label())
    }
}

/// Share of distinct combinations that occur exactly once.
#[derive(Debug, Clone)]
pub struct UniqueValueRatioConstraint {
    name: String,
    columns: GroupedColumns,
    assertion: Assertion,
    hint: Option<String>,
}

impl UniqueValueRatioConstraint {
    /// Creates a unique-value-ratio constraint.
    pub fn new<I, S>(columns: I, assertion: Assertion) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = GroupedColumns::new(columns, "UniqueValueRatio")?;
        Ok(Self {
            name: format!("UniqueValueRatio({})", columns.label()),
            columns,
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
impl Constraint for UniqueValueRatioConstraint {
    #[instrument(skip(self, source), fields(constraint.name = %self.name))]
    async fn evaluate(&self, source: &dyn DataSource, table: &str) -> Result<ConstraintResult> {
        let row = self.columns.counts(source, table).await?;
        let value = ratio(row.count("singleton_count")?, row.count("distinct_count")?);

        grade(&self.name, value, &self.assertion, self.hint.as_deref(), || {
            format!("UniqueValueRatio of ({}) is {value:.4}", self.columns.label())
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> ConstraintMetadata {
        ConstraintMetadata::new(&self.name)
            .with_description(format!(
                "UniqueValueRatio of ({}) satisfies {}",
                self.columns.label(),
                self.assertion
            ))
            .with_extra("columns", self.columns.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConstraintStatus;
    use crate::test_utils::source_from_sql;
    use std::sync::Arc;

    async fn source() -> Arc<crate::source::DataFusionSource> {
        source_from_sql(&[
            "CREATE TABLE orders (id BIGINT, customer VARCHAR, region VARCHAR)",
            "INSERT INTO orders VALUES \
                (1, 'a', 'north'), (2, 'a', 'north'), (3, 'b', 'south'), \
                (4, 'c', NULL), (5, NULL, 'east')",
            "CREATE TABLE empty_orders (id BIGINT)",
        ])
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_unique_primary_key() {
        let source = source().await;
        let constraint = UniquenessConstraint::unique(["id"]).unwrap();
        assert_eq!(constraint.name(), "Uniqueness(id)");

        let result = constraint.evaluate(source.as_ref(), "orders").await.unwrap();
        assert_eq!(result.status, ConstraintStatus::Success);
        assert_eq!(result.metric, Some(1.0));
    }

    #[tokio::test]
    async fn test_duplicates_fail_uniqueness() {
        let source = source().await;
        // non-null customers: a, a, b, c -> 3 distinct / 4 rows
        let constraint = UniquenessConstraint::unique(["customer"]).unwrap();

        let result = constraint.evaluate(source.as_ref(), "orders").await.unwrap();
        assert_eq!(result.status, ConstraintStatus::Failure);
        assert_eq!(result.metric, Some(0.75));
        assert_eq!(result.message, "Uniqueness of (customer) is 0.7500, expected >= 1.0");

        let relaxed = UniquenessConstraint::new(["customer"], 0.7).unwrap();
        let result = relaxed.evaluate(source.as_ref(), "orders").await.unwrap();
        assert!(result.status.is_success());
    }

    #[tokio::test]
    async fn test_multi_column_uniqueness_skips_nulls() {
        let source = source().await;
        // rows with both non-null: (a,north) x2, (b,south)
        let constraint = UniquenessConstraint::unique(["customer", "region"]).unwrap();

        let result = constraint.evaluate(source.as_ref(), "orders").await.unwrap();
        assert_eq!(result.metric, Some(2.0 / 3.0));
    }

    #[tokio::test]
    async fn test_empty_table_is_unique() {
        let source = source().await;
        let constraint = UniquenessConstraint::unique(["id"]).unwrap();

        let result = constraint.evaluate(source.as_ref(), "empty_orders").await.unwrap();
        assert_eq!(result.metric, Some(1.0));
        assert!(result.status.is_success());
    }

    #[tokio::test]
    async fn test_distinctness() {
        let source = source().await;
        // 3 distinct non-null customers over 5 rows
        let constraint =
            DistinctnessConstraint::new(["customer"], Assertion::greater_than_or_equal(0.5))
                .unwrap();

        let result = constraint.evaluate(source.as_ref(), "orders").await.unwrap();
        assert_eq!(result.metric, Some(0.6));
        assert!(result.status.is_success());
    }

    #[tokio::test]
    async fn test_unique_value_ratio() {
        let source = source().await;
        // groups: a(2), b(1), c(1) -> 2 singletons / 3 groups
        let constraint =
            UniqueValueRatioConstraint::new(["customer"], Assertion::greater_than(0.9)).unwrap();

        let result = constraint.evaluate(source.as_ref(), "orders").await.unwrap();
        assert_eq!(result.metric, Some(2.0 / 3.0));
        assert!(result.status.is_failure());
        assert!(result.message.starts_with("UniqueValueRatio of (customer) is 0.6667"));
    }

    #[test]
    fn test_configuration_errors() {
        assert!(UniquenessConstraint::new(Vec::<String>::new(), 1.0).is_err());
        assert!(UniquenessConstraint::new(["id"], 1.5).is_err());
        assert!(DistinctnessConstraint::new([""], Assertion::equal_to(1.0)).is_err());
    }
}
