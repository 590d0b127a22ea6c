//! Aggregate statistics of a numeric column.

use super::{grade, missing_metric, Assertion};
use crate::core::{Constraint, ConstraintMetadata, ConstraintResult};
use crate::error::{QualinkError, Result};
use crate::security::SqlSecurity;
use crate::source::DataSource;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::instrument;

/// The aggregate a [`StatisticalConstraint`] computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticType {
    /// Minimum value
    Min,
    /// Maximum value
    Max,
    /// Arithmetic mean
    Mean,
    /// Sum of values
    Sum,
    /// Sample standard deviation
    StandardDeviation,
    /// Exact median
    Median,
}

impl StatisticType {
    /// Upper-case label used in constraint names, e.g. `MEAN`.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatisticType::Min => "MIN",
            StatisticType::Max => "MAX",
            StatisticType::Mean => "MEAN",
            StatisticType::Sum => "SUM",
            StatisticType::StandardDeviation => "STDDEV",
            StatisticType::Median => "MEDIAN",
        }
    }

    /// The SQL aggregate function computing this statistic.
    pub fn sql_function(&self) -> &'static str {
        match self {
            StatisticType::Min => "MIN",
            StatisticType::Max => "MAX",
            StatisticType::Mean => "AVG",
            StatisticType::Sum => "SUM",
            StatisticType::StandardDeviation => "STDDEV",
            StatisticType::Median => "MEDIAN",
        }
    }
}

impl fmt::Display for StatisticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatisticType {
    type Err = QualinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "min" | "minimum" => Ok(StatisticType::Min),
            "max" | "maximum" => Ok(StatisticType::Max),
            "mean" | "avg" | "average" => Ok(StatisticType::Mean),
            "sum" => Ok(StatisticType::Sum),
            "stddev" | "std" | "standard_deviation" => Ok(StatisticType::StandardDeviation),
            "median" => Ok(StatisticType::Median),
            other => Err(QualinkError::Configuration(format!(
                "unknown statistic '{other}'; expected min, max, mean, sum, stddev or median"
            ))),
        }
    }
}

/// Compares an aggregate of a column against an assertion.
///
/// # Examples
///
/// ```rust
/// use qualink::constraints::{Assertion, StatisticType, StatisticalConstraint};
/// use qualink::core::Constraint;
///
/// let constraint =
///     StatisticalConstraint::new("age", StatisticType::Mean, Assertion::between(18.0, 65.0))
///         .unwrap();
/// assert_eq!(constraint.name(), "MEAN(age)");
/// ```
#[derive(Debug, Clone)]
pub struct StatisticalConstraint {
    name: String,
    column: String,
    quoted: String,
    statistic: StatisticType,
    assertion: Assertion,
    hint: Option<String>,
}

impl StatisticalConstraint {
    /// Creates a statistical constraint.
    pub fn new(
        column: impl Into<String>,
        statistic: StatisticType,
        assertion: Assertion,
    ) -> Result<Self> {
        let column = column.into();
        let quoted = SqlSecurity::escape_identifier(&column)?;
        Ok(Self {
            name: format!("{statistic}({column})"),
            column,
            quoted,
            statistic,
            assertion,
            hint: None,
        })
    }

    /// Appends advice to the failure message.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// The aggregate this constraint computes.
    pub fn statistic(&self) -> StatisticType {
        self.statistic
    }
}

#[async_trait]
impl Constraint for StatisticalConstraint {
    #[instrument(skip(self, source), fields(constraint.name = %self.name))]
    async fn evaluate(&self, source: &dyn DataSource, table: &str) -> Result<ConstraintResult> {
        SqlSecurity::validate_table_name(table)?;
        let sql = format!(
            "SELECT CAST({}({}) AS DOUBLE) AS metric FROM {table}",
            self.statistic.sql_function(),
            self.quoted
        );
        let row = source.execute_scalar_query(&sql).await?;

        let Some(metric) = row.get("metric")? else {
            return Ok(missing_metric(
                &self.name,
                format!("Column '{}' produced NULL for {}", self.column, self.statistic),
                &self.assertion,
                self.hint.as_deref(),
            ));
        };

        grade(&self.name, metric, &self.assertion, self.hint.as_deref(), || {
            format!("{}('{}') = {metric}", self.statistic, self.column)
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> ConstraintMetadata {
        ConstraintMetadata::for_column(&self.name, &self.column).with_description(format!(
            "{} of '{}' must satisfy {}",
            self.statistic, self.column, self.assertion
        ))
    }
}
