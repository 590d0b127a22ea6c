//! Regex match ratio.

use super::{grade, ratio, Assertion};
use crate::core::{Constraint, ConstraintMetadata, ConstraintResult};
use crate::error::Result;
use crate::security::SqlSecurity;
use crate::source::DataSource;
use async_trait::async_trait;
use tracing::instrument;

/// Share of non-null values of `quoted` matching `escaped_pattern`.
///
/// The pattern must already be escaped for a SQL string literal.
pub(super) async fn match_ratio(
    source: &dyn DataSource,
    table: &str,
    quoted: &str,
    escaped_pattern: &str,
) -> Result<f64> {
    SqlSecurity::validate_table_name(table)?;
    let sql = format!(
        "SELECT COUNT(CASE WHEN CAST({quoted} AS VARCHAR) ~ '{escaped_pattern}' THEN 1 END) AS matched_count, \
         COUNT({quoted}) AS non_null_count \
         FROM {table} WHERE {quoted} IS NOT NULL"
    );
    let row = source.execute_scalar_query(&sql).await?;
    Ok(ratio(
        row.count("matched_count")?,
        row.count("non_null_count")?,
    ))
}

/// Checks the share of non-null values matching a regular expression.
///
/// # Examples
///
/// ```rust
/// use qualink::constraints::{Assertion, PatternMatchConstraint};
/// use qualink::core::Constraint;
///
/// let constraint = PatternMatchConstraint::new(
///     "sku",
///     r"^[A-Z]{3}-\d{4}$",
///     Assertion::greater_than_or_equal(0.99),
/// )
/// .unwrap();
/// assert_eq!(constraint.name(), r"PatternMatch(sku, '^[A-Z]{3}-\d{4}$')");
/// ```
#[derive(Debug, Clone)]
pub struct PatternMatchConstraint {
    name: String,
    column: String,
    quoted: String,
    pattern: String,
    escaped_pattern: String,
    assertion: Assertion,
    hint: Option<String>,
}

impl PatternMatchConstraint {
    /// Creates a pattern-match constraint. The pattern must compile.
    pub fn new(
        column: impl Into<String>,
        pattern: impl Into<String>,
        assertion: Assertion,
    ) -> Result<Self> {
        let column = column.into();
        let pattern = pattern.into();
        let quoted = SqlSecurity::escape_identifier(&column)?;
        let escaped_pattern = SqlSecurity::validate_regex_pattern(&pattern)?;
        Ok(Self {
            name: format!("PatternMatch({column}, '{pattern}')"),
            column,
            quoted,
            pattern,
            escaped_pattern,
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
impl Constraint for PatternMatchConstraint {
    #[instrument(skip(self, source), fields(constraint.name = %self.name))]
    async fn evaluate(&self, source: &dyn DataSource, table: &str) -> Result<ConstraintResult> {
        let value = match_ratio(source, table, &self.quoted, &self.escaped_pattern).await?;
        grade(&self.name, value, &self.assertion, self.hint.as_deref(), || {
            format!("Pattern match on '{}' is {value:.4}", self.column)
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> ConstraintMetadata {
        ConstraintMetadata::for_column(&self.name, &self.column)
            .with_description(format!(
                "Share of '{}' matching the pattern must satisfy {}",
                self.column, self.assertion
            ))
            .with_extra("pattern", self.pattern.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QualinkError;
    use crate::test_utils::{people_source, source_from_sql};

    #[tokio::test]
    async fn test_match_ratio_ignores_nulls() {
        let source = people_source().await.unwrap();
        let constraint =
            PatternMatchConstraint::new("email", "@", Assertion::equal_to(0.75)).unwrap();

        let result = constraint.evaluate(source.as_ref(), "people").await.unwrap();
        assert!(result.status.is_success());
        assert_eq!(result.metric, Some(0.75));
    }

    #[tokio::test]
    async fn test_failure_message_and_hint() {
        let source = people_source().await.unwrap();
        let constraint = PatternMatchConstraint::new("name", "^[A-C]", Assertion::equal_to(1.0))
            .unwrap()
            .with_hint("names are sorted into buckets A-C");

        let result = constraint.evaluate(source.as_ref(), "people").await.unwrap();
        assert!(result.status.is_failure());
        assert_eq!(result.metric, Some(0.6));
        assert_eq!(
            result.message,
            "Pattern match on 'name' is 0.6000, expected == 1.0. names are sorted into buckets A-C"
        );
    }

    #[tokio::test]
    async fn test_quote_in_pattern_is_escaped() {
        let source = source_from_sql(&[
            "CREATE TABLE quotes (v VARCHAR)",
            "INSERT INTO quotes VALUES ('it''s'), ('its')",
        ])
        .await
        .unwrap();
        let result = PatternMatchConstraint::new("v", "'", Assertion::equal_to(0.5))
            .unwrap()
            .evaluate(source.as_ref(), "quotes")
            .await
            .unwrap();
        assert!(result.status.is_success(), "{result:?}");
    }

    #[tokio::test]
    async fn test_empty_table_ratio_is_zero() {
        let source = source_from_sql(&["CREATE TABLE empty_codes (code VARCHAR)"])
            .await
            .unwrap();
        let result = PatternMatchConstraint::new("code", "^x", Assertion::equal_to(0.0))
            .unwrap()
            .evaluate(source.as_ref(), "empty_codes")
            .await
            .unwrap();
        assert_eq!(result.metric, Some(0.0));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = PatternMatchConstraint::new("v", "([a-z", Assertion::equal_to(1.0)).unwrap_err();
        assert!(matches!(err, QualinkError::Configuration(_)));
    }
}
