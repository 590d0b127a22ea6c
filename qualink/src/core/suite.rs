//! Validation suite for organizing and running checks.

use super::{
    Check, CheckResult, CheckStatus, ConstraintStatus, Level, ValidationIssue, ValidationReport,
    ValidationResult,
};
use crate::error::{QualinkError, Result};
use crate::observer::{NoopObserver, ValidationObserver};
use crate::security::SqlSecurity;
use crate::source::DataSource;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// A collection of validation checks to be run together against one table.
///
/// Cross-table constraints name their own secondary tables; every other
/// constraint runs against the suite's bound table.
///
/// # Examples
///
/// ```rust
/// use qualink::core::{Check, Level, ValidationSuite};
/// use qualink::constraints::Assertion;
/// use qualink::source::DataFusionSource;
/// use datafusion::prelude::SessionContext;
/// use std::sync::Arc;
///
/// # async fn example() -> qualink::error::Result<()> {
/// let ctx = SessionContext::new();
/// ctx.sql("CREATE TABLE users (id BIGINT, email VARCHAR)").await?.collect().await?;
/// ctx.sql("INSERT INTO users VALUES (1, 'a@example.com'), (2, NULL)").await?.collect().await?;
///
/// let suite = ValidationSuite::builder("users_quality")
///     .on_data(Arc::new(DataFusionSource::new(ctx)), "users")
///     .check(Check::builder("ids").is_complete("id").is_unique("id").build()?)
///     .check(
///         Check::builder("contact")
///             .level(Level::Warning)
///             .has_completeness("email", Assertion::greater_than_or_equal(0.9))
///             .build()?,
///     )
///     .build()?;
///
/// let result = suite.run().await?;
/// assert!(result.is_success());
/// assert_eq!(result.report().issues.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ValidationSuite {
    /// The name of the validation suite
    name: String,
    /// Optional description of the suite's purpose
    description: Option<String>,
    /// The checks to run, in declaration order
    checks: Vec<Arc<Check>>,
    /// The bound query backend
    source: Option<Arc<dyn DataSource>>,
    /// The name of the table to validate (defaults to "data")
    table_name: String,
    /// Whether checks are dispatched concurrently
    parallel: bool,
    /// Upper bound on checks in flight when running in parallel
    max_concurrency: usize,
    observer: Arc<dyn ValidationObserver>,
}

impl fmt::Debug for ValidationSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationSuite")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("checks", &self.checks.len())
            .field("bound", &self.source.is_some())
            .field("table_name", &self.table_name)
            .field("parallel", &self.parallel)
            .field("max_concurrency", &self.max_concurrency)
            .finish()
    }
}

impl ValidationSuite {
    /// Creates a new builder for constructing a validation suite.
    pub fn builder(name: impl Into<String>) -> ValidationSuiteBuilder {
        ValidationSuiteBuilder::new(name)
    }

    /// Returns the name of the validation suite.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description of the validation suite if available.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the checks in this validation suite.
    pub fn checks(&self) -> &[Arc<Check>] {
        &self.checks
    }

    /// Returns the table the checks run against.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Returns whether checks run concurrently.
    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Returns the maximum number of checks in flight in parallel mode.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Returns whether a data source is bound.
    pub fn is_bound(&self) -> bool {
        self.source.is_some()
    }

    /// Runs every check and folds the results into one report.
    ///
    /// The report is built in check declaration order in both sequential and
    /// parallel mode. A backend error aborts the run and no report is
    /// produced.
    #[instrument(skip(self), fields(
        suite.name = %self.name,
        suite.checks = self.checks.len(),
        suite.parallel = self.parallel
    ))]
    pub async fn run(&self) -> Result<ValidationResult> {
        let source = self
            .source
            .as_deref()
            .ok_or_else(|| QualinkError::UnboundDataSource {
                suite: self.name.clone(),
            })?;

        info!(
            suite.name = %self.name,
            suite.table = %self.table_name,
            suite.checks = self.checks.len(),
            suite.description = ?self.description,
            "Starting validation suite"
        );
        self.observer.on_suite_start(&self.name, self.checks.len());
        let start_time = Instant::now();
        let mut report = ValidationReport::new(&self.name, &self.table_name);

        let check_results = if self.parallel {
            self.run_parallel(source).await?
        } else {
            self.run_sequential(source).await?
        };

        let mut worst_status = CheckStatus::Success;
        for result in &check_results {
            Self::fold(&mut report, result);
            worst_status = worst_status.max(result.status());
            self.observer.on_check_complete(result);
        }

        report.metrics.execution_time_ms = start_time.elapsed().as_millis() as u64;
        let result = ValidationResult::new(worst_status, report);
        let metrics = result.metrics();
        let verdict = if result.is_success() { "passed" } else { "failed" };

        info!(
            suite.name = %self.name,
            metrics.passed = metrics.passed,
            metrics.failed = metrics.failed,
            metrics.skipped = metrics.skipped,
            metrics.total = metrics.total_constraints,
            metrics.duration_ms = metrics.execution_time_ms,
            metrics.pass_rate = %format!("{:.2}%", metrics.pass_rate() * 100.0),
            suite.result = verdict,
            "Validation suite completed"
        );
        self.observer.on_suite_complete(&result);

        Ok(result)
    }

    async fn run_sequential<'a>(&'a self, source: &dyn DataSource) -> Result<Vec<CheckResult<'a>>> {
        let mut results = Vec::with_capacity(self.checks.len());
        for check in &self.checks {
            debug!(
                check.name = %check.name(),
                check.level = %check.level(),
                check.constraints = check.constraints().len(),
                "Running validation check"
            );
            results.push(check.run(source, &self.table_name).await?);
        }
        Ok(results)
    }

    /// Runs up to `max_concurrency` checks at once. `buffered` yields in
    /// input order, so the results line up with `self.checks`.
    async fn run_parallel<'a>(&'a self, source: &dyn DataSource) -> Result<Vec<CheckResult<'a>>> {
        debug!(
            suite.name = %self.name,
            max_concurrency = self.max_concurrency,
            "Dispatching checks concurrently"
        );
        stream::iter(
            self.checks
                .iter()
                .map(|check| check.run(source, &self.table_name)),
        )
        .buffered(self.max_concurrency.max(1))
        .try_collect()
        .await
    }

    fn fold(report: &mut ValidationReport, result: &CheckResult<'_>) {
        let check = result.check();
        let metrics = &mut report.metrics;
        metrics.total_checks += 1;

        for (constraint, outcome) in result.iter() {
            metrics.total_constraints += 1;

            match outcome.status {
                ConstraintStatus::Success => metrics.passed += 1,
                ConstraintStatus::Skipped => metrics.skipped += 1,
                ConstraintStatus::Failure => {
                    metrics.failed += 1;
                    match check.level() {
                        Level::Error => metrics.error_count += 1,
                        Level::Warning => metrics.warning_count += 1,
                        Level::Info => {}
                    }

                    let metadata = constraint.metadata();
                    warn!(
                        check.name = %check.name(),
                        check.level = %check.level(),
                        constraint.name = %outcome.constraint_name,
                        constraint.metric = ?outcome.metric,
                        failure.message = %outcome.message,
                        "Constraint failed"
                    );
                    report.issues.push(ValidationIssue {
                        check_name: check.name().to_string(),
                        constraint_name: outcome.constraint_name.clone(),
                        level: check.level(),
                        message: outcome.message.clone(),
                        metric: outcome.metric,
                        column: metadata.column,
                        description: metadata.description,
                        extra: metadata.extra,
                    });
                }
            }

            if let Some(metric) = outcome.metric {
                metrics.custom_metrics.insert(
                    format!("{}.{}", check.name(), outcome.constraint_name),
                    metric,
                );
            }
        }

        report
            .check_results
            .insert(check.name().to_string(), result.results().to_vec());
    }
}

/// Builder for constructing [`ValidationSuite`] instances.
///
/// ```rust
/// use qualink::core::{Check, ValidationSuite};
///
/// let suite = ValidationSuite::builder("quality_checks")
///     .description("Data quality validation suite")
///     .check(Check::builder("ids").is_complete("id").build().unwrap())
///     .run_parallel(true)
///     .max_concurrency(4)
///     .build()
///     .unwrap();
/// assert!(suite.is_parallel());
/// assert!(!suite.is_bound());
/// ```
pub struct ValidationSuiteBuilder {
    name: String,
    description: Option<String>,
    checks: Vec<Arc<Check>>,
    source: Option<Arc<dyn DataSource>>,
    table_name: String,
    parallel: bool,
    max_concurrency: usize,
    observer: Arc<dyn ValidationObserver>,
}

impl fmt::Debug for ValidationSuiteBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationSuiteBuilder")
            .field("name", &self.name)
            .field("checks", &self.checks.len())
            .field("table_name", &self.table_name)
            .field("parallel", &self.parallel)
            .finish_non_exhaustive()
    }
}

impl ValidationSuiteBuilder {
    /// Creates a new validation suite builder with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            checks: Vec::new(),
            source: None,
            table_name: "data".to_string(),
            parallel: false,
            max_concurrency: num_cpus::get(),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Sets the description for the validation suite.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Binds the data source and the primary table to validate.
    pub fn on_data(mut self, source: Arc<dyn DataSource>, table_name: impl Into<String>) -> Self {
        self.source = Some(source);
        self.table_name = table_name.into();
        self
    }

    /// Binds only the data source, keeping the current table name.
    pub fn source(mut self, source: Arc<dyn DataSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the table name to validate. Defaults to `data`.
    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Adds a check to the validation suite.
    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(Arc::new(check));
        self
    }

    /// Adds multiple checks to the validation suite.
    pub fn checks<I>(mut self, checks: I) -> Self
    where
        I: IntoIterator<Item = Check>,
    {
        self.checks.extend(checks.into_iter().map(Arc::new));
        self
    }

    /// Dispatches checks concurrently when `true`. Defaults to sequential.
    pub fn run_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Bounds checks in flight in parallel mode. Defaults to the CPU count.
    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Sets the observer notified as each check is folded into the report.
    pub fn with_observer(mut self, observer: Arc<dyn ValidationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Builds the suite. The table name must be a valid identifier.
    pub fn build(self) -> Result<ValidationSuite> {
        SqlSecurity::validate_table_name(&self.table_name)?;
        Ok(ValidationSuite {
            name: self.name,
            description: self.description,
            checks: self.checks,
            source: self.source,
            table_name: self.table_name,
            parallel: self.parallel,
            max_concurrency: self.max_concurrency,
            observer: self.observer,
        })
    }
}
