//! The constraint catalog.
//!
//! Every constraint follows the same evaluation pattern:
//!
//! 1. render one aggregate query with escaped identifiers,
//! 2. execute it against the bound table,
//! 3. read the numeric result,
//! 4. fail immediately if the aggregate produced no value,
//! 5. otherwise evaluate the constraint's [`Assertion`].
//!
//! The metric is recorded on both success and failure. The message is set
//! only on failure and always includes the assertion's label.
//!
//! | Constraint | Metric |
//! |---|---|
//! | [`CompletenessConstraint`] | non-null ratio |
//! | [`UniquenessConstraint`] | distinct / non-null rows |
//! | [`DistinctnessConstraint`] | distinct / all rows |
//! | [`UniqueValueRatioConstraint`] | singleton groups / groups |
//! | [`ColumnExistsConstraint`] | 1.0 or 0.0 |
//! | [`ColumnCountConstraint`] | number of columns |
//! | [`SizeConstraint`] | number of rows |
//! | [`StatisticalConstraint`] | min, max, mean, sum, stddev or median |
//! | [`MinLengthConstraint`] / [`MaxLengthConstraint`] | string length |
//! | [`ApproxCountDistinctConstraint`] | approximate distinct count |
//! | [`ApproxQuantileConstraint`] | approximate quantile |
//! | [`PatternMatchConstraint`] / [`FormatConstraint`] | regex match ratio |
//! | [`ComplianceConstraint`] / [`CustomSqlConstraint`] | predicate match ratio |
//! | [`CorrelationConstraint`] | Pearson correlation |
//! | [`ReferentialIntegrityConstraint`] | child keys found in parent |
//! | [`RowCountMatchConstraint`] | min / max row count |
//! | [`SchemaMatchConstraint`] | 1.0 or 0.0 |

mod approx_count_distinct;
mod assertion;
mod column_count;
mod column_exists;
mod completeness;
mod compliance;
mod correlation;
mod custom_sql;
mod format;
mod length;
mod pattern;
mod quantile;
mod referential_integrity;
mod row_count_match;
mod schema_match;
mod size;
mod statistics;
mod uniqueness;

pub use approx_count_distinct::ApproxCountDistinctConstraint;
pub(crate) use assertion::number_from_value;
pub use assertion::{Assertion, AssertionFn};
pub use column_count::ColumnCountConstraint;
pub use column_exists::ColumnExistsConstraint;
pub use completeness::CompletenessConstraint;
pub use compliance::ComplianceConstraint;
pub use correlation::CorrelationConstraint;
pub use custom_sql::CustomSqlConstraint;
pub use format::{FormatConstraint, FormatType};
pub use length::{MaxLengthConstraint, MinLengthConstraint};
pub use pattern::PatternMatchConstraint;
pub use quantile::ApproxQuantileConstraint;
pub use referential_integrity::ReferentialIntegrityConstraint;
pub use row_count_match::RowCountMatchConstraint;
pub use schema_match::SchemaMatchConstraint;
pub use size::SizeConstraint;
pub use statistics::{StatisticType, StatisticalConstraint};
pub use uniqueness::{DistinctnessConstraint, UniqueValueRatioConstraint, UniquenessConstraint};

use crate::core::ConstraintResult;
use crate::error::{QualinkError, Result};
use crate::security::SqlSecurity;
use tracing::debug;

/// Evaluates `assertion` against `metric` and builds the result.
///
/// `subject` renders the first half of the failure message, e.g.
/// `"Completeness of 'email' is 0.8000"`; it is only called on failure.
pub(crate) fn grade(
    name: &str,
    metric: f64,
    assertion: &Assertion,
    hint: Option<&str>,
    subject: impl FnOnce() -> String,
) -> Result<ConstraintResult> {
    if assertion.evaluate(metric)? {
        debug!(constraint.name = %name, constraint.metric = metric, "Constraint passed");
        Ok(ConstraintResult::success_with_metric(metric))
    } else {
        debug!(
            constraint.name = %name,
            constraint.metric = metric,
            constraint.expected = %assertion,
            "Constraint failed"
        );
        Ok(ConstraintResult::failure_with_metric(
            metric,
            failure_message(subject(), assertion, hint),
        ))
    }
}

/// Failure for an aggregate that produced `NULL`; no metric is recorded.
pub(crate) fn missing_metric(
    name: &str,
    subject: String,
    assertion: &Assertion,
    hint: Option<&str>,
) -> ConstraintResult {
    tracing::warn!(constraint.name = %name, reason = %subject, "Constraint has no metric");
    ConstraintResult::failure(failure_message(subject, assertion, hint))
}

fn failure_message(subject: String, assertion: &Assertion, hint: Option<&str>) -> String {
    match hint.map(str::trim).filter(|h| !h.is_empty()) {
        Some(hint) => format!("{subject}, expected {assertion}. {hint}"),
        None => format!("{subject}, expected {assertion}"),
    }
}

/// `numerator / max(denominator, 1)`
pub(crate) fn ratio(numerator: f64, denominator: f64) -> f64 {
    numerator / denominator.max(1.0)
}

/// Rejects an empty column list and quotes every column.
pub(crate) fn quote_columns(columns: &[String], constraint: &str) -> Result<Vec<String>> {
    if columns.is_empty() {
        return Err(QualinkError::Configuration(format!(
            "{constraint} requires at least one column"
        )));
    }
    columns
        .iter()
        .map(|column| SqlSecurity::escape_identifier(column))
        .collect()
}

/// Checks that a threshold or quantile lies in `[0, 1]`.
pub(crate) fn unit_interval(value: f64, what: &str) -> Result<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(QualinkError::Configuration(format!(
            "{what} must be in [0, 1], got {value}"
        )))
    }
}

/// `"a" IS NOT NULL AND "b" IS NOT NULL`
pub(crate) fn not_null_filter(quoted: &[String]) -> String {
    quoted
        .iter()
        .map(|column| format!("{column} IS NOT NULL"))
        .collect::<Vec<_>>()
        .join(" AND ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_success_has_empty_message() {
        let result =
            grade("Size(> 0.0)", 5.0, &Assertion::greater_than(0.0), None, String::new).unwrap();
        assert!(result.status.is_success());
        assert_eq!(result.metric, Some(5.0));
        assert!(result.message.is_empty());
    }

    #[test]
    fn test_grade_failure_message_includes_label_and_hint() {
        let result = grade(
            "Size(> 10.0)",
            5.0,
            &Assertion::greater_than(10.0),
            Some("load more rows"),
            || "Row count is 5".to_string(),
        )
        .unwrap();
        assert!(result.status.is_failure());
        assert_eq!(result.metric, Some(5.0));
        assert_eq!(result.message, "Row count is 5, expected > 10.0. load more rows");
    }

    #[test]
    fn test_missing_metric() {
        let result = missing_metric(
            "MIN(age)",
            "Column 'age' produced NULL for MIN".to_string(),
            &Assertion::greater_than(0.0),
            None,
        );
        assert!(result.status.is_failure());
        assert_eq!(result.metric, None);
        assert_eq!(result.message, "Column 'age' produced NULL for MIN, expected > 0.0");
    }

    #[test]
    fn test_ratio_guards_zero_denominator() {
        assert_eq!(ratio(0.0, 0.0), 0.0);
        assert_eq!(ratio(3.0, 4.0), 0.75);
    }

    #[test]
    fn test_helpers_reject_bad_configuration() {
        assert!(quote_columns(&[], "Uniqueness").is_err());
        assert!(quote_columns(&["".to_string()], "Uniqueness").is_err());
        assert!(unit_interval(1.5, "quantile").is_err());
        assert!(unit_interval(-0.1, "threshold").is_err());
        assert_eq!(unit_interval(0.5, "quantile").unwrap(), 0.5);
    }

    #[test]
    fn test_not_null_filter() {
        let quoted = quote_columns(&["a".to_string(), "b".to_string()], "x").unwrap();
        assert_eq!(not_null_filter(&quoted), "\"a\" IS NOT NULL AND \"b\" IS NOT NULL");
    }
}
