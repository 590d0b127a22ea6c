//! Compliance with a boolean SQL predicate.

use super::{grade, ratio, Assertion};
use crate::core::{Constraint, ConstraintMetadata, ConstraintResult};
use crate::error::Result;
use crate::security::SqlSecurity;
use crate::source::DataSource;
use async_trait::async_trait;
use tracing::instrument;

/// Longest prefix of a predicate used as a default label.
const LABEL_CHARS: usize = 50;

pub(super) fn default_label(expression: &str) -> String {
    expression.trim().chars().take(LABEL_CHARS).collect()
}

/// Share of all rows of `table` satisfying `predicate`.
///
/// The predicate must already have passed
/// [`SqlSecurity::validate_sql_expression`].
pub(super) async fn predicate_ratio(
    source: &dyn DataSource,
    table: &str,
    predicate: &str,
) -> Result<f64> {
    SqlSecurity::validate_table_name(table)?;
    let sql = format!(
        "SELECT COUNT(CASE WHEN ({predicate}) THEN 1 END) AS satisfied_count, \
         COUNT(*) AS total_count FROM {table}"
    );
    let row = source.execute_scalar_query(&sql).await?;
    Ok(ratio(
        row.count("satisfied_count")?,
        row.count("total_count")?,
    ))
}

/// Checks the share of rows satisfying a predicate against an assertion.
///
/// Rows where the predicate evaluates to `NULL` count as not satisfied.
/// An empty table has compliance `0.0`.
///
/// # Examples
///
/// ```rust
/// use qualink::constraints::{Assertion, ComplianceConstraint};
/// use qualink::core::Constraint;
///
/// let adults = ComplianceConstraint::new("age >= 18", Assertion::greater_than_or_equal(0.9))
///     .unwrap()
///     .with_label("adults");
/// assert_eq!(adults.name(), "Compliance(adults)");
///
/// assert!(ComplianceConstraint::new("1 = 1; DROP TABLE users", Assertion::equal_to(1.0)).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ComplianceConstraint {
    name: String,
    label: String,
    predicate: String,
    assertion: Assertion,
    hint: Option<String>,
}

impl ComplianceConstraint {
    /// Creates a compliance constraint labelled with the start of the predicate.
    pub fn new(predicate: impl Into<String>, assertion: Assertion) -> Result<Self> {
        let predicate = predicate.into();
        SqlSecurity::validate_sql_expression(&predicate)?;
        let label = default_label(&predicate);
        Ok(Self {
            name: format!("Compliance({label})"),
            label,
            predicate,
            assertion,
            hint: None,
        })
    }

    /// Replaces the label shown in the name and failure message.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        if !label.trim().is_empty() {
            self.name = format!("Compliance({label})");
            self.label = label;
        }
        self
    }

    /// Appends advice to the failure message.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn predicate(&self) -> &str {
        &self.predicate
    }
}

#[async_trait]
impl Constraint for ComplianceConstraint {
    #[instrument(skip(self, source), fields(constraint.name = %self.name))]
    async fn evaluate(&self, source: &dyn DataSource, table: &str) -> Result<ConstraintResult> {
        let value = predicate_ratio(source, table, &self.predicate).await?;
        grade(&self.name, value, &self.assertion, self.hint.as_deref(), || {
            format!("Compliance '{}' is {value:.4}", self.label)
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> ConstraintMetadata {
        ConstraintMetadata::new(&self.name).with_description(self.predicate.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QualinkError;
    use crate::test_utils::{people_source, source_from_sql};

    #[tokio::test]
    async fn test_compliance_ratio() {
        let source = people_source().await.unwrap();
        let constraint =
            ComplianceConstraint::new("age >= 30", Assertion::greater_than_or_equal(0.5)).unwrap();
        assert_eq!(constraint.name(), "Compliance(age >= 30)");

        let result = constraint.evaluate(source.as_ref(), "people").await.unwrap();
        assert!(result.status.is_success());
        assert_eq!(result.metric, Some(0.6));
    }

    #[tokio::test]
    async fn test_null_predicate_counts_as_unsatisfied() {
        let source = people_source().await.unwrap();
        let constraint = ComplianceConstraint::new("score > 0", Assertion::equal_to(1.0))
            .unwrap()
            .with_label("positive scores")
            .with_hint("backfill missing scores");

        let result = constraint.evaluate(source.as_ref(), "people").await.unwrap();
        assert!(result.status.is_failure());
        assert_eq!(result.metric, Some(0.8));
        assert_eq!(
            result.message,
            "Compliance 'positive scores' is 0.8000, expected == 1.0. backfill missing scores"
        );
    }

    #[tokio::test]
    async fn test_empty_table() {
        let source = source_from_sql(&["CREATE TABLE empty_orders (amount DOUBLE)"])
            .await
            .unwrap();
        let result = ComplianceConstraint::new("amount > 0", Assertion::equal_to(0.0))
            .unwrap()
            .evaluate(source.as_ref(), "empty_orders")
            .await
            .unwrap();
        assert!(result.status.is_success());
        assert_eq!(result.metric, Some(0.0));
    }

    #[test]
    fn test_default_label_truncates() {
        let predicate = format!("{} > 0", "a".repeat(60));
        let constraint = ComplianceConstraint::new(predicate, Assertion::equal_to(1.0)).unwrap();
        assert_eq!(constraint.name(), format!("Compliance({})", "a".repeat(50)));
    }

    #[test]
    fn test_dangerous_predicate_rejected() {
        let err = ComplianceConstraint::new("1 = 1 -- comment", Assertion::equal_to(1.0)).unwrap_err();
        assert!(matches!(err, QualinkError::SecurityError(_)));
        assert!(ComplianceConstraint::new("   ", Assertion::equal_to(1.0)).is_err());
    }

    #[tokio::test]
    async fn test_quoted_keywords_are_plain_data() {
        let source = source_from_sql(&[
            "CREATE TABLE audit (action VARCHAR, note VARCHAR, \"commit\" VARCHAR)",
            "INSERT INTO audit VALUES \
                ('update', '--', 'a1'), \
                ('insert', 'ok', NULL), \
                ('delete', '--', 'b2'), \
                ('update', 'ok', 'c3')",
        ])
        .await
        .unwrap();

        for (predicate, expected) in [
            ("action <> 'update'", 0.5),
            ("note <> '--'", 0.5),
            ("\"commit\" IS NOT NULL", 0.75),
        ] {
            let constraint =
                ComplianceConstraint::new(predicate, Assertion::greater_than(0.0)).unwrap();
            let result = constraint.evaluate(source.as_ref(), "audit").await.unwrap();
            assert!(result.status.is_success(), "{predicate}");
            assert_eq!(result.metric, Some(expected), "{predicate}");
        }

        let err = ComplianceConstraint::new(
            "action = 'update'; DROP TABLE audit",
            Assertion::equal_to(1.0),
        )
        .unwrap_err();
        assert!(matches!(err, QualinkError::SecurityError(_)));
    }
}
