//! Minimum and maximum string length.
//!
//! Lengths are counted in characters over non-null values.

use super::{grade, missing_metric, Assertion};
use crate::core::{Constraint, ConstraintMetadata, ConstraintResult};
use crate::error::Result;
use crate::security::SqlSecurity;
use crate::source::DataSource;
use async_trait::async_trait;
use tracing::instrument;

#[derive(Debug, Clone, Copy)]
enum Bound {
    Min,
    Max,
}

impl Bound {
    fn label(self) -> &'static str {
        match self {
            Bound::Min => "MinLength",
            Bound::Max => "MaxLength",
        }
    }

    fn aggregate(self) -> &'static str {
        match self {
            Bound::Min => "MIN",
            Bound::Max => "MAX",
        }
    }
}

#[derive(Debug, Clone)]
struct LengthCheck {
    name: String,
    column: String,
    quoted: String,
    bound: Bound,
    assertion: Assertion,
    hint: Option<String>,
}

impl LengthCheck {
    fn new(column: String, bound: Bound, assertion: Assertion) -> Result<Self> {
        let quoted = SqlSecurity::escape_identifier(&column)?;
        Ok(Self {
            name: format!("{}({column})", bound.label()),
            column,
            quoted,
            bound,
            assertion,
            hint: None,
        })
    }

    async fn evaluate(&self, source: &dyn DataSource, table: &str) -> Result<ConstraintResult> {
        SqlSecurity::validate_table_name(table)?;
        let sql = format!(
            "SELECT CAST({agg}(CHARACTER_LENGTH(CAST({col} AS VARCHAR))) AS DOUBLE) AS length_value \
             FROM {table} WHERE {col} IS NOT NULL",
            agg = self.bound.aggregate(),
            col = self.quoted,
        );
        let row = source.execute_scalar_query(&sql).await?;

        let Some(length) = row.get("length_value")? else {
            return Ok(missing_metric(
                &self.name,
                format!("Column '{}' has no non-null values", self.column),
                &self.assertion,
                self.hint.as_deref(),
            ));
        };

        grade(&self.name, length, &self.assertion, self.hint.as_deref(), || {
            format!("{} of '{}' is {length}", self.bound.label(), self.column)
        })
    }

    fn metadata(&self) -> ConstraintMetadata {
        ConstraintMetadata::for_column(&self.name, &self.column).with_description(format!(
            "{} of '{}' must satisfy {}",
            self.bound.label(),
            self.column,
            self.assertion
        ))
    }
}

/// Checks the shortest non-null value of a column.
#[derive(Debug, Clone)]
pub struct MinLengthConstraint(LengthCheck);

impl MinLengthConstraint {
    /// Creates a minimum-length constraint.
    pub fn new(column: impl Into<String>, assertion: Assertion) -> Result<Self> {
        LengthCheck::new(column.into(), Bound::Min, assertion).map(Self)
    }

    /// Appends advice to the failure message.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.0.hint = Some(hint.into());
        self
    }
}

#[async_trait]
impl Constraint for MinLengthConstraint {
    #[instrument(skip(self, source), fields(constraint.name = %self.0.name))]
    async fn evaluate(&self, source: &dyn DataSource, table: &str) -> Result<ConstraintResult> {
        self.0.evaluate(source, table).await
    }

    fn name(&self) -> &str {
        &self.0.name
    }

    fn metadata(&self) -> ConstraintMetadata {
        self.0.metadata()
    }
}

/// Checks the longest non-null value of a column.
#[derive(Debug, Clone)]
pub struct MaxLengthConstraint(LengthCheck);

impl MaxLengthConstraint {
    /// Creates a maximum-length constraint.
    pub fn new(column: impl Into<String>, assertion: Assertion) -> Result<Self> {
        LengthCheck::new(column.into(), Bound::Max, assertion).map(Self)
    }

    /// Appends advice to the failure message.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.0.hint = Some(hint.into());
        self
    }
}

#[async_trait]
impl Constraint for MaxLengthConstraint {
    #[instrument(skip(self, source), fields(constraint.name = %self.0.name))]
    async fn evaluate(&self, source: &dyn DataSource, table: &str) -> Result<ConstraintResult> {
        self.0.evaluate(source, table).await
    }

    fn name(&self) -> &str {
        &self.0.name
    }

    fn metadata(&self) -> ConstraintMetadata {
        self.0.metadata()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{people_source, source_from_sql};

    #[tokio::test]
    async fn test_min_and_max_length() {
        let source = people_source().await.unwrap();

        let min = MinLengthConstraint::new("name", Assertion::greater_than_or_equal(3.0)).unwrap();
        assert_eq!(min.name(), "MinLength(name)");
        let result = min.evaluate(source.as_ref(), "people").await.unwrap();
        assert!(result.status.is_success());
        assert_eq!(result.metric, Some(3.0));

        let max = MaxLengthConstraint::new("name", Assertion::less_than_or_equal(5.0)).unwrap();
        let result = max.evaluate(source.as_ref(), "people").await.unwrap();
        assert!(result.status.is_failure());
        assert_eq!(result.metric, Some(7.0));
        assert_eq!(result.message, "MaxLength of 'name' is 7, expected <= 5.0");
    }

    #[tokio::test]
    async fn test_lengths_skip_nulls() {
        let source = people_source().await.unwrap();
        // shortest non-null email is "not-an-email"
        let result = MinLengthConstraint::new("email", Assertion::equal_to(12.0))
            .unwrap()
            .evaluate(source.as_ref(), "people")
            .await
            .unwrap();
        assert!(result.status.is_success());
    }

    #[tokio::test]
    async fn test_all_null_column() {
        let source = source_from_sql(&[
            "CREATE TABLE notes (body VARCHAR)",
            "INSERT INTO notes VALUES (NULL)",
        ])
        .await
        .unwrap();
        let result = MaxLengthConstraint::new("body", Assertion::less_than(10.0))
            .unwrap()
            .with_hint("notes are optional")
            .evaluate(source.as_ref(), "notes")
            .await
            .unwrap();

        assert!(result.status.is_failure());
        assert_eq!(result.metric, None);
        assert_eq!(
            result.message,
            "Column 'body' has no non-null values, expected < 10.0. notes are optional"
        );
    }
}
