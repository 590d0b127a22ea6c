//! Pearson correlation between two columns.

use super::{grade, not_null_filter, quote_columns, Assertion};
use crate::core::{Constraint, ConstraintMetadata, ConstraintResult};
use crate::error::Result;
use crate::security::SqlSecurity;
use crate::source::DataSource;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Checks the Pearson correlation of two numeric columns.
///
/// Only rows where both columns are non-null take part. When the
/// correlation is undefined (fewer than two rows, or a constant column) the
/// metric is `0.0`.
///
/// # Examples
///
/// ```rust
/// use qualink::constraints::{Assertion, CorrelationConstraint};
/// use qualink::core::Constraint;
///
/// let constraint =
///     CorrelationConstraint::new("height", "weight", Assertion::greater_than(0.5)).unwrap();
/// assert_eq!(constraint.name(), "Correlation(height, weight)");
/// ```
#[derive(Debug, Clone)]
pub struct CorrelationConstraint {
    name: String,
    columns: [String; 2],
    quoted: [String; 2],
    assertion: Assertion,
    hint: Option<String>,
}

impl CorrelationConstraint {
    pub fn new(
        column_a: impl Into<String>,
        column_b: impl Into<String>,
        assertion: Assertion,
    ) -> Result<Self> {
        let columns = [column_a.into(), column_b.into()];
        let quoted = quote_columns(&columns, "Correlation")?;
        Ok(Self {
            name: format!("Correlation({}, {})", columns[0], columns[1]),
            quoted: [quoted[0].clone(), quoted[1].clone()],
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
impl Constraint for CorrelationConstraint {
    #[instrument(skip(self, source), fields(constraint.name = %self.name))]
    async fn evaluate(&self, source: &dyn DataSource, table: &str) -> Result<ConstraintResult> {
        SqlSecurity::validate_table_name(table)?;
        let [a, b] = &self.quoted;
        let sql = format!(
            "SELECT CORR(CAST({a} AS DOUBLE), CAST({b} AS DOUBLE)) AS correlation FROM {table} WHERE {}",
            not_null_filter(&self.quoted)
        );
        let row = source.execute_scalar_query(&sql).await?;

        let value = match row.get("correlation")? {
            Some(value) if !value.is_nan() => value,
            raw => {
                debug!(constraint.name = %self.name, raw = ?raw, "Correlation undefined, using 0.0");
                0.0
            }
        };

        grade(&self.name, value, &self.assertion, self.hint.as_deref(), || {
            format!(
                "Correlation({}, {}) is {value:.4}",
                self.columns[0], self.columns[1]
            )
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> ConstraintMetadata {
        ConstraintMetadata::new(&self.name)
            .with_description(format!(
                "Correlation of '{}' and '{}' must satisfy {}",
                self.columns[0], self.columns[1], self.assertion
            ))
            .with_extra("columns", self.columns.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::source_from_sql;

    async fn measurements() -> std::sync::Arc<crate::source::DataFusionSource> {
        source_from_sql(&[
            "CREATE TABLE measurements (x DOUBLE, up DOUBLE, down DOUBLE, flat DOUBLE)",
            "INSERT INTO measurements VALUES \
             (1.0, 2.0, 10.0, 5.0), (2.0, 4.0, 8.0, 5.0), (3.0, 6.0, 6.0, 5.0), \
             (4.0, 8.0, 4.0, 5.0), (NULL, 1.0, 1.0, 5.0)",
        ])
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_perfect_correlations() {
        let source = measurements().await;

        let positive = CorrelationConstraint::new("x", "up", Assertion::greater_than(0.99))
            .unwrap()
            .evaluate(source.as_ref(), "measurements")
            .await
            .unwrap();
        assert!(positive.status.is_success(), "{positive:?}");

        let negative = CorrelationConstraint::new("x", "down", Assertion::greater_than(0.0))
            .unwrap()
            .evaluate(source.as_ref(), "measurements")
            .await
            .unwrap();
        assert!(negative.status.is_failure());
        assert!(negative.metric.unwrap() < -0.99);
        assert!(negative.message.starts_with("Correlation(x, down) is -1.0000"));
    }

    #[tokio::test]
    async fn test_undefined_correlation_is_zero() {
        let source = measurements().await;
        let result = CorrelationConstraint::new("x", "flat", Assertion::equal_to(0.0))
            .unwrap()
            .evaluate(source.as_ref(), "measurements")
            .await
            .unwrap();
        assert!(result.status.is_success(), "{result:?}");
        assert_eq!(result.metric, Some(0.0));
    }

    #[test]
    fn test_rejects_empty_column() {
        assert!(CorrelationConstraint::new("x", "", Assertion::greater_than(0.0)).is_err());
    }
}
