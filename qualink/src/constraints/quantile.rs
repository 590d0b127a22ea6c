//! Approximate quantiles.

use super::{grade, missing_metric, unit_interval, Assertion};
use crate::core::{Constraint, ConstraintMetadata, ConstraintResult};
use crate::error::Result;
use crate::security::SqlSecurity;
use crate::source::DataSource;
use async_trait::async_trait;
use tracing::instrument;

/// Checks an approximate quantile of a numeric column.
///
/// # Examples
///
/// ```rust
/// use qualink::constraints::{ApproxQuantileConstraint, Assertion};
/// use qualink::core::Constraint;
///
/// let p95 = ApproxQuantileConstraint::new("latency_ms", 0.95, Assertion::less_than(250.0)).unwrap();
/// assert_eq!(p95.name(), "ApproxQuantile(latency_ms, 0.95)");
///
/// assert!(ApproxQuantileConstraint::new("latency_ms", 1.5, Assertion::less_than(1.0)).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ApproxQuantileConstraint {
    name: String,
    column: String,
    quoted: String,
    quantile: f64,
    assertion: Assertion,
    hint: Option<String>,
}

impl ApproxQuantileConstraint {
    /// Creates an approximate quantile constraint; `quantile` must be in `[0, 1]`.
    pub fn new(column: impl Into<String>, quantile: f64, assertion: Assertion) -> Result<Self> {
        let column = column.into();
        let quoted = SqlSecurity::escape_identifier(&column)?;
        let quantile = unit_interval(quantile, "quantile")?;
        Ok(Self {
            name: format!("ApproxQuantile({column}, {quantile})"),
            column,
            quoted,
            quantile,
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
impl Constraint for ApproxQuantileConstraint {
    #[instrument(skip(self, source), fields(constraint.name = %self.name))]
    async fn evaluate(&self, source: &dyn DataSource, table: &str) -> Result<ConstraintResult> {
        SqlSecurity::validate_table_name(table)?;
        let sql = format!(
            "SELECT CAST(APPROX_PERCENTILE_CONT({q:?}) WITHIN GROUP (ORDER BY {col}) AS DOUBLE) AS quantile_value \
             FROM {table} WHERE {col} IS NOT NULL",
            q = self.quantile,
            col = self.quoted,
        );
        let row = source.execute_scalar_query(&sql).await?;

        let Some(value) = row.get("quantile_value")? else {
            return Ok(missing_metric(
                &self.name,
                format!(
                    "Column '{}' produced NULL for quantile {}",
                    self.column, self.quantile
                ),
                &self.assertion,
                self.hint.as_deref(),
            ));
        };

        grade(&self.name, value, &self.assertion, self.hint.as_deref(), || {
            format!(
                "ApproxQuantile({}) of '{}' is {value:.4}",
                self.quantile, self.column
            )
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> ConstraintMetadata {
        ConstraintMetadata::for_column(&self.name, &self.column)
            .with_description(format!(
                "Quantile {} of '{}' must satisfy {}",
                self.quantile, self.column, self.assertion
            ))
            .with_extra("quantile", self.quantile.to_string())
    }
}
