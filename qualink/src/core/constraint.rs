//! Constraint trait and related types for validation rules.

use crate::error::Result;
use crate::source::DataSource;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// The status of a constraint evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintStatus {
    /// The constraint check passed
    Success,
    /// The constraint check failed
    Failure,
    /// The constraint was not evaluated
    Skipped,
}

impl ConstraintStatus {
    /// Returns true if this is a Success status.
    pub fn is_success(&self) -> bool {
        matches!(self, ConstraintStatus::Success)
    }

    /// Returns true if this is a Failure status.
    pub fn is_failure(&self) -> bool {
        matches!(self, ConstraintStatus::Failure)
    }

    /// Returns true if this is a Skipped status.
    pub fn is_skipped(&self) -> bool {
        matches!(self, ConstraintStatus::Skipped)
    }
}

/// The result of evaluating a constraint.
///
/// `message` is empty on success and never empty on failure; report
/// consumers rely on that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintResult {
    /// The status of the constraint evaluation
    pub status: ConstraintStatus,
    /// The metric computed during evaluation, if any
    pub metric: Option<f64>,
    /// Explanation of a failure or skip; empty on success
    pub message: String,
    /// Name of the constraint that produced this result
    pub constraint_name: String,
}

impl ConstraintResult {
    /// Creates a successful constraint result.
    pub fn success() -> Self {
        Self {
            status: ConstraintStatus::Success,
            metric: None,
            message: String::new(),
            constraint_name: String::new(),
        }
    }

    /// Creates a successful constraint result with a metric.
    pub fn success_with_metric(metric: f64) -> Self {
        Self {
            metric: Some(metric),
            ..Self::success()
        }
    }

    /// Creates a failed constraint result.
    pub fn failure(message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "constraint failed".to_string();
        }
        Self {
            status: ConstraintStatus::Failure,
            metric: None,
            message,
            constraint_name: String::new(),
        }
    }

    /// Creates a failed constraint result with a metric.
    pub fn failure_with_metric(metric: f64, message: impl Into<String>) -> Self {
        Self {
            metric: Some(metric),
            ..Self::failure(message)
        }
    }

    /// Creates a skipped constraint result.
    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            status: ConstraintStatus::Skipped,
            metric: None,
            message: message.into(),
            constraint_name: String::new(),
        }
    }

    /// Sets the name of the constraint that produced this result.
    pub fn with_constraint_name(mut self, name: impl Into<String>) -> Self {
        self.constraint_name = name.into();
        self
    }
}

/// Descriptive information about a constraint, copied into report issues.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintMetadata {
    /// The constraint's name
    pub name: String,
    /// A human-readable description of what this constraint validates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The column this constraint operates on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Additional key-value pairs, e.g. both table names of a cross-table constraint
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl ConstraintMetadata {
    /// Creates metadata carrying only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates metadata for a single column constraint.
    pub fn for_column(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            column: Some(column.into()),
            ..Self::new(name)
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds an extra metadata entry.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// A type alias for boxed constraints, as produced by the registry.
pub type BoxedConstraint = Box<dyn Constraint>;

/// A validation constraint that can be evaluated against a table.
///
/// Implementations are stateless after construction, so one instance can be
/// evaluated any number of times, against any table, from concurrent checks.
/// Configuration is validated when the constraint is built; `evaluate` only
/// fails on backend faults.
///
/// # Examples
///
/// ```rust
/// use qualink::core::{Constraint, ConstraintResult};
/// use qualink::error::Result;
/// use qualink::source::DataSource;
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct NonEmpty;
///
/// #[async_trait]
/// impl Constraint for NonEmpty {
///     async fn evaluate(&self, source: &dyn DataSource, table: &str) -> Result<ConstraintResult> {
///         let row = source
///             .execute_scalar_query(&format!("SELECT COUNT(*) AS n FROM {table}"))
///             .await?;
///         let n = row.count("n")?;
///         Ok(if n > 0.0 {
///             ConstraintResult::success_with_metric(n)
///         } else {
///             ConstraintResult::failure_with_metric(n, format!("Table '{table}' is empty"))
///         })
///     }
///
///     fn name(&self) -> &str {
///         "NonEmpty"
///     }
/// }
/// ```
#[async_trait]
pub trait Constraint: Debug + Send + Sync {
    /// Evaluates the constraint against `table`.
    ///
    /// Data-quality outcomes, including missing data, are returned as
    /// results. Backend errors are propagated.
    async fn evaluate(&self, source: &dyn DataSource, table: &str) -> Result<ConstraintResult>;

    /// Stable identity of the constraint, used as the report key.
    fn name(&self) -> &str;

    /// Metadata copied into validation issues. Defaults to the name only.
    fn metadata(&self) -> ConstraintMetadata {
        ConstraintMetadata::new(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_metadata_builder() {
        let metadata = ConstraintMetadata::for_column("Completeness(user_id)", "user_id")
            .with_description("Checks user ID completeness")
            .with_extra("owner", "identity");

        assert_eq!(metadata.name, "Completeness(user_id)");
        assert_eq!(metadata.column.as_deref(), Some("user_id"));
        assert_eq!(
            metadata.description.as_deref(),
            Some("Checks user ID completeness")
        );
        assert_eq!(metadata.extra.get("owner").map(String::as_str), Some("identity"));
    }

    #[test]
    fn test_constraint_result_builders() {
        let success = ConstraintResult::success_with_metric(0.95);
        assert_eq!(success.status, ConstraintStatus::Success);
        assert_eq!(success.metric, Some(0.95));
        assert!(success.message.is_empty());

        let failure = ConstraintResult::failure_with_metric(0.3, "Below threshold");
        assert_eq!(failure.status, ConstraintStatus::Failure);
        assert_eq!(failure.metric, Some(0.3));
        assert_eq!(failure.message, "Below threshold");

        let skipped = ConstraintResult::skipped("No data").with_constraint_name("Size(> 0.0)");
        assert!(skipped.status.is_skipped());
        assert_eq!(skipped.constraint_name, "Size(> 0.0)");
    }

    #[test]
    fn test_failure_message_never_empty() {
        let failure = ConstraintResult::failure("");
        assert!(failure.status.is_failure());
        assert!(!failure.message.is_empty());
    }
}
