//! Check type and builder for grouping constraints.
//!
//! A [`Check`] is a named, severity-leveled, ordered list of constraints.
//! Running it evaluates every constraint in order and derives a single
//! [`CheckStatus`] from the outcomes and the check's [`Level`].
//!
//! ```rust
//! use qualink::core::{Check, Level};
//! use qualink::constraints::{Assertion, FormatType};
//!
//! # fn example() -> qualink::error::Result<Check> {
//! let check = Check::builder("customer_validation")
//!     .level(Level::Error)
//!     .description("Ensure customer data integrity")
//!     .is_complete("customer_id")
//!     .is_unique("customer_id")
//!     .has_completeness("email", Assertion::greater_than_or_equal(0.95))
//!     .contains_email("email", 0.99)
//!     .has_min("age", Assertion::greater_than_or_equal(0.0))
//!     .has_size(Assertion::greater_than(0.0))
//!     .build()?;
//! # Ok(check)
//! # }
//! ```

use super::{BoxedConstraint, Constraint, ConstraintResult, ConstraintStatus, Level};
use crate::constraints::{
    ApproxCountDistinctConstraint, ApproxQuantileConstraint, Assertion, ColumnCountConstraint,
    ColumnExistsConstraint, CompletenessConstraint, ComplianceConstraint, CorrelationConstraint,
    CustomSqlConstraint, DistinctnessConstraint, FormatConstraint, FormatType,
    MaxLengthConstraint, MinLengthConstraint, PatternMatchConstraint,
    ReferentialIntegrityConstraint, RowCountMatchConstraint, SchemaMatchConstraint,
    SizeConstraint, StatisticType, StatisticalConstraint, UniqueValueRatioConstraint,
    UniquenessConstraint,
};
use crate::error::{QualinkError, Result};
use crate::source::DataSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// The derived outcome of a check, ordered `Success < Warning < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Success,
    Warning,
    Error,
}

impl CheckStatus {
    /// Status of a check at `level`, given whether any of its constraints failed.
    ///
    /// `Info` checks never escalate.
    pub fn from_outcome(level: Level, has_failure: bool) -> Self {
        match (level, has_failure) {
            (Level::Error, true) => CheckStatus::Error,
            (Level::Warning, true) => CheckStatus::Warning,
            _ => CheckStatus::Success,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Success => "success",
            CheckStatus::Warning => "warning",
            CheckStatus::Error => "error",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validation check containing one or more constraints.
///
/// Checks are immutable once built and can be run any number of times,
/// against any table.
#[derive(Debug, Clone)]
pub struct Check {
    /// The name of the check
    name: String,
    /// The severity level of the check
    level: Level,
    /// Optional description of what this check validates
    description: Option<String>,
    /// The constraints that make up this check, in evaluation order
    constraints: Vec<Arc<dyn Constraint>>,
}

impl Check {
    /// Creates a new builder for constructing a check.
    ///
    /// ```rust
    /// use qualink::core::Check;
    ///
    /// let builder = Check::builder("data_quality");
    /// ```
    pub fn builder(name: impl Into<String>) -> CheckBuilder {
        CheckBuilder::new(name)
    }

    /// Returns the name of the check.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the severity level of the check.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Returns the description of the check if available.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the constraints in this check.
    pub fn constraints(&self) -> &[Arc<dyn Constraint>] {
        &self.constraints
    }

    /// Evaluates every constraint against `table`, in order.
    ///
    /// Each result is labelled with its constraint's name when the
    /// constraint left it blank. A backend error aborts the check.
    #[instrument(skip(self, source), fields(
        check.name = %self.name,
        check.level = %self.level,
        check.constraints = self.constraints.len()
    ))]
    pub async fn run(&self, source: &dyn DataSource, table: &str) -> Result<CheckResult<'_>> {
        let mut results = Vec::with_capacity(self.constraints.len());

        for constraint in &self.constraints {
            let mut result = constraint.evaluate(source, table).await?;
            if result.constraint_name.is_empty() {
                result.constraint_name = constraint.name().to_string();
            }
            results.push(result);
        }

        let has_failure = results.iter().any(|r| r.status.is_failure());
        let status = CheckStatus::from_outcome(self.level, has_failure);
        if has_failure {
            warn!(
                check.name = %self.name,
                check.level = %self.level,
                check.status = %status,
                "Check has failing constraints"
            );
        } else {
            debug!(check.name = %self.name, "Check passed");
        }

        Ok(CheckResult {
            check: self,
            status,
            results,
        })
    }
}

/// The outcome of running one [`Check`].
///
/// `results` is index-aligned with [`Check::constraints`].
#[derive(Debug, Clone)]
pub struct CheckResult<'a> {
    check: &'a Check,
    status: CheckStatus,
    results: Vec<ConstraintResult>,
}

impl<'a> CheckResult<'a> {
    /// The check that produced this result.
    pub fn check(&self) -> &'a Check {
        self.check
    }

    /// The aggregated status of the check.
    pub fn status(&self) -> CheckStatus {
        self.status
    }

    /// Per-constraint results in declaration order.
    pub fn results(&self) -> &[ConstraintResult] {
        &self.results
    }

    /// Constraints paired with their results, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<dyn Constraint>, &ConstraintResult)> {
        self.check.constraints.iter().zip(&self.results)
    }

    /// Results with status `Failure`.
    pub fn failures(&self) -> impl Iterator<Item = &ConstraintResult> {
        self.results.iter().filter(|r| r.status == ConstraintStatus::Failure)
    }

    /// Consumes the result, returning the per-constraint results.
    pub fn into_results(self) -> Vec<ConstraintResult> {
        self.results
    }
}

/// Builder for constructing [`Check`] instances.
///
/// Every `has_*`/`is_*` method is shorthand for constructing the matching
/// constraint and appending it. Construction errors never panic: the first
/// one is kept and returned by [`CheckBuilder::build`], before any query runs.
///
/// The default level is [`Level::Error`].
///
/// ```rust
/// use qualink::core::{Check, Level};
/// use qualink::constraints::Assertion;
///
/// let check = Check::builder("completeness_check")
///     .level(Level::Warning)
///     .description("Ensures all required fields are present")
///     .is_complete("id")
///     .build()
///     .unwrap();
/// assert_eq!(check.constraints().len(), 1);
///
/// let broken = Check::builder("bad").has_approx_quantile("x", 2.0, Assertion::less_than(1.0)).build();
/// assert!(broken.is_err());
/// ```
#[derive(Debug)]
pub struct CheckBuilder {
    name: String,
    level: Level,
    description: Option<String>,
    constraints: Vec<Arc<dyn Constraint>>,
    error: Option<QualinkError>,
}

impl CheckBuilder {
    /// Creates a new check builder with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: Level::Error,
            description: None,
            constraints: Vec::new(),
            error: None,
        }
    }

    /// Sets the severity level for the check.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the description for the check.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a constraint to the check.
    pub fn constraint(mut self, constraint: impl Constraint + 'static) -> Self {
        self.constraints.push(Arc::new(constraint));
        self
    }

    /// Adds a boxed constraint to the check.
    pub fn boxed_constraint(mut self, constraint: BoxedConstraint) -> Self {
        self.constraints.push(Arc::from(constraint));
        self
    }

    /// Adds multiple boxed constraints to the check.
    pub fn constraints<I>(mut self, constraints: I) -> Self
    where
        I: IntoIterator<Item = BoxedConstraint>,
    {
        self.constraints.extend(constraints.into_iter().map(Arc::from));
        self
    }

    fn push<C: Constraint + 'static>(mut self, constraint: Result<C>) -> Self {
        match constraint {
            Ok(constraint) => self.constraints.push(Arc::new(constraint)),
            Err(e) => {
                if self.error.is_none() {
                    self.error = Some(e);
                }
            }
        }
        self
    }

    // Completeness and existence

    /// The column must contain no nulls.
    pub fn is_complete(self, column: impl Into<String>) -> Self {
        self.push(CompletenessConstraint::complete(column))
    }

    /// The non-null ratio of the column must satisfy `assertion`.
    pub fn has_completeness(self, column: impl Into<String>, assertion: Assertion) -> Self {
        self.push(CompletenessConstraint::new(column, assertion))
    }

    /// The column must exist in the table schema.
    pub fn has_column(self, column: impl Into<String>) -> Self {
        self.push(ColumnExistsConstraint::new(column))
    }

    // Uniqueness family

    /// Every non-null value of the column must be distinct.
    pub fn is_unique(self, column: impl Into<String>) -> Self {
        self.push(UniquenessConstraint::unique(vec![column.into()]))
    }

    /// The combination of columns must be unique.
    pub fn is_primary_key<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(UniquenessConstraint::unique(collect_columns(columns)))
    }

    /// At least `threshold` of the non-null rows must be distinct.
    pub fn has_uniqueness<I, S>(self, columns: I, threshold: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(UniquenessConstraint::new(collect_columns(columns), threshold))
    }

    pub fn has_distinctness<I, S>(self, columns: I, assertion: Assertion) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(DistinctnessConstraint::new(collect_columns(columns), assertion))
    }

    pub fn has_unique_value_ratio<I, S>(self, columns: I, assertion: Assertion) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(UniqueValueRatioConstraint::new(
            collect_columns(columns),
            assertion,
        ))
    }

    // Table shape

    /// The row count must satisfy `assertion`.
    ///
    /// ```rust
    /// use qualink::core::Check;
    /// use qualink::constraints::Assertion;
    ///
    /// let check = Check::builder("size_validation")
    ///     .has_size(Assertion::greater_than(1000.0))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(check.constraints()[0].name(), "Size(> 1000.0)");
    /// ```
    pub fn has_size(mut self, assertion: Assertion) -> Self {
        self.constraints.push(Arc::new(SizeConstraint::new(assertion)));
        self
    }

    /// The number of columns must satisfy `assertion`.
    pub fn has_column_count(mut self, assertion: Assertion) -> Self {
        self.constraints
            .push(Arc::new(ColumnCountConstraint::new(assertion)));
        self
    }

    // Statistics

    pub fn has_statistic(
        self,
        column: impl Into<String>,
        statistic: StatisticType,
        assertion: Assertion,
    ) -> Self {
        self.push(StatisticalConstraint::new(column, statistic, assertion))
    }

    pub fn has_min(self, column: impl Into<String>, assertion: Assertion) -> Self {
        self.has_statistic(column, StatisticType::Min, assertion)
    }

    pub fn has_max(self, column: impl Into<String>, assertion: Assertion) -> Self {
        self.has_statistic(column, StatisticType::Max, assertion)
    }

    pub fn has_mean(self, column: impl Into<String>, assertion: Assertion) -> Self {
        self.has_statistic(column, StatisticType::Mean, assertion)
    }

    pub fn has_sum(self, column: impl Into<String>, assertion: Assertion) -> Self {
        self.has_statistic(column, StatisticType::Sum, assertion)
    }

    pub fn has_standard_deviation(self, column: impl Into<String>, assertion: Assertion) -> Self {
        self.has_statistic(column, StatisticType::StandardDeviation, assertion)
    }

    pub fn has_median(self, column: impl Into<String>, assertion: Assertion) -> Self {
        self.has_statistic(column, StatisticType::Median, assertion)
    }

    pub fn has_min_length(self, column: impl Into<String>, assertion: Assertion) -> Self {
        self.push(MinLengthConstraint::new(column, assertion))
    }

    pub fn has_max_length(self, column: impl Into<String>, assertion: Assertion) -> Self {
        self.push(MaxLengthConstraint::new(column, assertion))
    }

    pub fn has_approx_count_distinct(self, column: impl Into<String>, assertion: Assertion) -> Self {
        self.push(ApproxCountDistinctConstraint::new(column, assertion))
    }

    /// Quantile must be in `[0, 1]`.
    pub fn has_approx_quantile(
        self,
        column: impl Into<String>,
        quantile: f64,
        assertion: Assertion,
    ) -> Self {
        self.push(ApproxQuantileConstraint::new(column, quantile, assertion))
    }

    pub fn has_correlation(
        self,
        column_a: impl Into<String>,
        column_b: impl Into<String>,
        assertion: Assertion,
    ) -> Self {
        self.push(CorrelationConstraint::new(column_a, column_b, assertion))
    }

    // Patterns and formats

    /// The share of non-null values matching `pattern` must satisfy `assertion`.
    pub fn has_pattern(
        self,
        column: impl Into<String>,
        pattern: impl Into<String>,
        assertion: Assertion,
    ) -> Self {
        self.push(PatternMatchConstraint::new(column, pattern, assertion))
    }

    /// At least `threshold` of the non-null values must have `format`.
    pub fn has_format(self, column: impl Into<String>, format: FormatType, threshold: f64) -> Self {
        self.push(FormatConstraint::new(column, format, threshold))
    }

    pub fn contains_email(self, column: impl Into<String>, threshold: f64) -> Self {
        self.has_format(column, FormatType::Email, threshold)
    }

    pub fn contains_url(self, column: impl Into<String>, threshold: f64) -> Self {
        self.has_format(column, FormatType::Url, threshold)
    }

    pub fn contains_phone(self, column: impl Into<String>, threshold: f64) -> Self {
        self.has_format(column, FormatType::Phone, threshold)
    }

    pub fn contains_credit_card(self, column: impl Into<String>, threshold: f64) -> Self {
        self.has_format(column, FormatType::CreditCard, threshold)
    }

    pub fn contains_ssn(self, column: impl Into<String>, threshold: f64) -> Self {
        self.has_format(column, FormatType::Ssn, threshold)
    }

    pub fn contains_ipv4(self, column: impl Into<String>, threshold: f64) -> Self {
        self.has_format(column, FormatType::Ipv4, threshold)
    }

    // SQL predicates

    /// The share of rows satisfying `predicate` must satisfy `assertion`.
    pub fn satisfies(self, predicate: impl Into<String>, assertion: Assertion) -> Self {
        self.push(ComplianceConstraint::new(predicate, assertion))
    }

    /// Every row must satisfy `expression`.
    pub fn custom_sql(self, expression: impl Into<String>) -> Self {
        self.push(CustomSqlConstraint::new(expression))
    }

    // Cross-table

    pub fn referential_integrity(
        self,
        child_table: impl Into<String>,
        child_column: impl Into<String>,
        parent_table: impl Into<String>,
        parent_column: impl Into<String>,
        assertion: Assertion,
    ) -> Self {
        self.push(ReferentialIntegrityConstraint::new(
            child_table,
            child_column,
            parent_table,
            parent_column,
            assertion,
        ))
    }

    pub fn row_count_match(
        self,
        table_a: impl Into<String>,
        table_b: impl Into<String>,
        assertion: Assertion,
    ) -> Self {
        self.push(RowCountMatchConstraint::new(table_a, table_b, assertion))
    }

    pub fn schema_match(
        self,
        table_a: impl Into<String>,
        table_b: impl Into<String>,
        assertion: Assertion,
    ) -> Self {
        self.push(SchemaMatchConstraint::new(table_a, table_b, assertion))
    }

    /// Builds the check, or returns the first constraint construction error.
    pub fn build(self) -> Result<Check> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok(Check {
            name: self.name,
            level: self.level,
            description: self.description,
            constraints: self.constraints,
        })
    }
}

fn collect_columns<I, S>(columns: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    columns.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConstraintMetadata;
    use crate::test_utils::people_source;
    use async_trait::async_trait;

    /// Returns a fixed result with no constraint name set.
    #[derive(Debug)]
    struct Fixed(ConstraintResult);

    #[async_trait]
    impl Constraint for Fixed {
        async fn evaluate(&self, _: &dyn DataSource, _: &str) -> Result<ConstraintResult> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "Fixed"
        }

        fn metadata(&self) -> ConstraintMetadata {
            ConstraintMetadata::new("Fixed")
        }
    }

    #[test]
    fn test_status_derivation() {
        assert_eq!(CheckStatus::from_outcome(Level::Error, true), CheckStatus::Error);
        assert_eq!(CheckStatus::from_outcome(Level::Warning, true), CheckStatus::Warning);
        assert_eq!(CheckStatus::from_outcome(Level::Info, true), CheckStatus::Success);
        for level in [Level::Info, Level::Warning, Level::Error] {
            assert_eq!(CheckStatus::from_outcome(level, false), CheckStatus::Success);
        }
        assert!(CheckStatus::Error > CheckStatus::Warning);
        assert!(CheckStatus::Warning > CheckStatus::Success);
    }

    #[test]
    fn test_builder_defaults() {
        let check = Check::builder("defaults").build().unwrap();
        assert_eq!(check.name(), "defaults");
        assert_eq!(check.level(), Level::Error);
        assert_eq!(check.description(), None);
        assert!(check.constraints().is_empty());
    }

    #[test]
    fn test_builder_keeps_declaration_order() {
        let check = Check::builder("ordered")
            .level(Level::Warning)
            .description("several constraints")
            .is_complete("id")
            .is_unique("id")
            .has_mean("age", Assertion::between(18.0, 65.0))
            .contains_email("email", 0.9)
            .row_count_match("a", "b", Assertion::equal_to(1.0))
            .build()
            .unwrap();

        let names: Vec<_> = check.constraints().iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec![
                "Completeness(id)",
                "Uniqueness(id)",
                "MEAN(age)",
                "Format(email, email)",
                "RowCountMatch(a vs b)",
            ]
        );
        assert_eq!(check.description(), Some("several constraints"));
    }

    #[test]
    fn test_builder_reports_first_error() {
        let err = Check::builder("broken")
            .is_complete("")
            .has_approx_quantile("x", 5.0, Assertion::less_than(1.0))
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("identifier"), "{err}");
    }

    #[tokio::test]
    async fn test_run_aligns_results_and_backfills_names() {
        let source = people_source().await.unwrap();
        let check = Check::builder("mixed")
            .level(Level::Warning)
            .is_complete("id")
            .is_complete("email")
            .constraint(Fixed(ConstraintResult::success()))
            .build()
            .unwrap();

        let result = check.run(source.as_ref(), "people").await.unwrap();
        assert_eq!(result.status(), CheckStatus::Warning);
        assert_eq!(result.results().len(), 3);
        assert_eq!(result.results()[0].constraint_name, "Completeness(id)");
        assert!(result.results()[1].status.is_failure());
        assert_eq!(result.results()[2].constraint_name, "Fixed");
        assert_eq!(result.failures().count(), 1);
        assert_eq!(result.check().name(), "mixed");
    }

    #[tokio::test]
    async fn test_passing_check_is_success_at_any_level() {
        let source = people_source().await.unwrap();
        for level in [Level::Info, Level::Warning, Level::Error] {
            let check = Check::builder("clean")
                .level(level)
                .is_complete("id")
                .has_size(Assertion::equal_to(5.0))
                .build()
                .unwrap();
            let result = check.run(source.as_ref(), "people").await.unwrap();
            assert_eq!(result.status(), CheckStatus::Success);
        }
    }

    #[tokio::test]
    async fn test_info_failures_do_not_escalate() {
        let source = people_source().await.unwrap();
        let check = Check::builder("observations")
            .level(Level::Info)
            .is_complete("email")
            .build()
            .unwrap();
        let result = check.run(source.as_ref(), "people").await.unwrap();
        assert_eq!(result.status(), CheckStatus::Success);
        assert_eq!(result.failures().count(), 1);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let source = people_source().await.unwrap();
        let check = Check::builder("repeatable")
            .is_complete("email")
            .has_max("age", Assertion::less_than(30.0))
            .has_pattern("name", "^[A-Z]", Assertion::equal_to(1.0))
            .build()
            .unwrap();

        let first = check.run(source.as_ref(), "people").await.unwrap().into_results();
        let second = check.run(source.as_ref(), "people").await.unwrap().into_results();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_backend_error_aborts_check() {
        let source = people_source().await.unwrap();
        let check = Check::builder("missing table")
            .has_size(Assertion::greater_than(0.0))
            .build()
            .unwrap();
        assert!(check.run(source.as_ref(), "nowhere").await.is_err());
    }
}
