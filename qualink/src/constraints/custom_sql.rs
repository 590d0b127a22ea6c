//! A SQL predicate every row must satisfy.

use super::compliance::{default_label, predicate_ratio};
use super::{grade, Assertion};
use crate::core::{Constraint, ConstraintMetadata, ConstraintResult};
use crate::error::Result;
use crate::security::SqlSecurity;
use crate::source::DataSource;
use async_trait::async_trait;
use tracing::instrument;

/// Passes only when every row satisfies `expression` (ratio `== 1.0`).
///
/// The optional hint names the rule; without one the name carries the
/// start of the expression.
#[derive(Debug, Clone)]
pub struct CustomSqlConstraint {
    name: String,
    expression: String,
    assertion: Assertion,
}

impl CustomSqlConstraint {
    pub fn new(expression: impl Into<String>) -> Result<Self> {
        Self::with_hint(expression, None::<String>)
    }

    /// Creates the constraint, naming it after `hint` when one is given.
    pub fn with_hint(
        expression: impl Into<String>,
        hint: Option<impl Into<String>>,
    ) -> Result<Self> {
        let expression = expression.into();
        SqlSecurity::validate_sql_expression(&expression)?;
        let label = hint
            .map(Into::into)
            .filter(|hint: &String| !hint.trim().is_empty())
            .unwrap_or_else(|| default_label(&expression));
        Ok(Self {
            name: format!("CustomSQL({label})"),
            expression,
            assertion: Assertion::equal_to(1.0),
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }
}

#[async_trait]
impl Constraint for CustomSqlConstraint {
    #[instrument(skip(self, source), fields(constraint.name = %self.name))]
    async fn evaluate(&self, source: &dyn DataSource, table: &str) -> Result<ConstraintResult> {
        let value = predicate_ratio(source, table, &self.expression).await?;
        grade(&self.name, value, &self.assertion, None, || {
            format!(
                "Custom SQL compliance is {value:.4} (expression: {})",
                self.expression
            )
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> ConstraintMetadata {
        ConstraintMetadata::new(&self.name)
            .with_description(format!("All rows must satisfy: {}", self.expression))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::people_source;

    #[tokio::test]
    async fn test_all_rows_must_hold() {
        let source = people_source().await.unwrap();

        let holds = CustomSqlConstraint::new("age BETWEEN 18 AND 99").unwrap();
        assert_eq!(holds.name(), "CustomSQL(age BETWEEN 18 AND 99)");
        let result = holds.evaluate(source.as_ref(), "people").await.unwrap();
        assert!(result.status.is_success());
        assert_eq!(result.metric, Some(1.0));

        let fails = CustomSqlConstraint::with_hint("age < 30", Some("young customers")).unwrap();
        assert_eq!(fails.name(), "CustomSQL(young customers)");
        let result = fails.evaluate(source.as_ref(), "people").await.unwrap();
        assert!(result.status.is_failure());
        assert_eq!(result.metric, Some(0.4));
        assert_eq!(
            result.message,
            "Custom SQL compliance is 0.4000 (expression: age < 30), expected == 1.0"
        );
    }

    #[test]
    fn test_expression_screened() {
        assert!(CustomSqlConstraint::new("id IN (SELECT id FROM other)").is_err());
        assert!(CustomSqlConstraint::new("DELETE FROM people").is_err());
        assert!(CustomSqlConstraint::new("updated_at IS NOT NULL").is_ok());
        assert!(CustomSqlConstraint::new("note <> '--'").is_ok());
        assert!(CustomSqlConstraint::new("status <> 'delete'").is_ok());
        assert!(CustomSqlConstraint::new("note <> '--").is_err());
    }
}
