//! Validation result types.

use super::{CheckStatus, ConstraintResult, Level};
use crate::error::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Counters collected while folding check results into a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    /// Number of checks executed
    pub total_checks: usize,
    /// Number of constraints evaluated across all checks
    pub total_constraints: usize,
    /// Constraints with status `Success`
    pub passed: usize,
    /// Constraints with status `Failure`
    pub failed: usize,
    /// Constraints with status `Skipped`
    pub skipped: usize,
    /// Failing constraints in `Error`-level checks
    pub error_count: usize,
    /// Failing constraints in `Warning`-level checks
    pub warning_count: usize,
    /// Wall-clock time of the whole run in milliseconds
    pub execution_time_ms: u64,
    /// `"<check>.<constraint>"` -> metric, for every constraint that produced one
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub custom_metrics: IndexMap<String, f64>,
}

impl ValidationMetrics {
    /// Creates new validation metrics with all counts set to zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Share of decided constraints that passed; skipped ones are ignored.
    ///
    /// Returns `0.0` when nothing passed or failed.
    pub fn pass_rate(&self) -> f64 {
        let decided = self.passed + self.failed;
        if decided == 0 {
            0.0
        } else {
            self.passed as f64 / decided as f64
        }
    }
}

/// A failing constraint, as reported to consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// The name of the check that found the issue
    pub check_name: String,
    /// The name of the constraint that failed
    pub constraint_name: String,
    /// The severity level of the owning check
    pub level: Level,
    /// The constraint's failure message
    pub message: String,
    /// Optional metric value associated with the issue
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<f64>,
    /// Column from the constraint's metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Description from the constraint's metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Extra metadata, e.g. both tables of a cross-table constraint
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// Everything one suite run observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// The name of the validation suite that was run
    pub suite_name: String,
    /// The primary table the suite ran against
    pub table_name: String,
    /// Start of the run, RFC 3339 in UTC
    pub timestamp: String,
    /// Overall validation metrics
    pub metrics: ValidationMetrics,
    /// Check name -> constraint results, in check declaration order
    pub check_results: IndexMap<String, Vec<ConstraintResult>>,
    /// Failing constraints, in check then constraint declaration order
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Creates an empty report stamped with the current time.
    pub fn new(suite_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            suite_name: suite_name.into(),
            table_name: table_name.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            metrics: ValidationMetrics::new(),
            check_results: IndexMap::new(),
            issues: Vec::new(),
        }
    }

    /// Adds an issue to the report.
    pub fn add_issue(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Returns true if there are any error-level issues.
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|issue| issue.level == Level::Error)
    }

    /// Returns true if there are any warning-level issues.
    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|issue| issue.level == Level::Warning)
    }

    /// Gets all issues of a specific level.
    pub fn issues_by_level(&self, level: Level) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.level == level)
            .collect()
    }
}

/// The result of running a validation suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// False iff an `Error`-level check had a failing constraint
    pub success: bool,
    /// Highest check status seen during the run
    pub worst_status: CheckStatus,
    pub report: ValidationReport,
}

impl ValidationResult {
    pub fn new(worst_status: CheckStatus, report: ValidationReport) -> Self {
        Self {
            success: worst_status != CheckStatus::Error,
            worst_status,
            report,
        }
    }

    /// Returns true if the validation succeeded.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Returns true if the validation failed.
    pub fn is_failure(&self) -> bool {
        !self.success
    }

    pub fn worst_status(&self) -> CheckStatus {
        self.worst_status
    }

    /// Returns the validation report.
    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    pub fn metrics(&self) -> &ValidationMetrics {
        &self.report.metrics
    }

    /// Serializes the result as compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serializes the result as indented JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = &self.report;
        let metrics = &report.metrics;
        let verdict = if self.success { "PASSED" } else { "FAILED" };

        writeln!(f, "Validation {verdict}: {}", report.suite_name)?;
        writeln!(
            f,
            "  Checks: {} | Constraints: {}",
            metrics.total_checks, metrics.total_constraints
        )?;
        write!(
            f,
            "  Passed: {} | Failed: {} | Skipped: {}",
            metrics.passed, metrics.failed, metrics.skipped
        )?;

        if !report.issues.is_empty() {
            write!(f, "\n  Issues:")?;
            for issue in &report.issues {
                write!(
                    f,
                    "\n    [{}] {} / {}: {}",
                    issue.level, issue.check_name, issue.constraint_name, issue.message
                )?;
            }
        }
        Ok(())
    }
}
