//! Hooks for observing suite runs.
//!
//! qualink never installs tracing subscribers or metric exporters of its own.
//! Callers that want progress reporting or telemetry implement
//! [`ValidationObserver`] and attach it with
//! [`ValidationSuiteBuilder::with_observer`](crate::core::ValidationSuiteBuilder::with_observer).
//!
//! Callbacks run on the orchestrating task, in check declaration order,
//! after each check has been folded into the report.

use crate::core::{CheckResult, ValidationResult};
use std::fmt::Debug;

/// Receives suite lifecycle events. Every method defaults to a no-op.
///
/// # Examples
///
/// ```rust
/// use qualink::core::CheckResult;
/// use qualink::observer::ValidationObserver;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Debug, Default)]
/// struct FailureCounter(AtomicUsize);
///
/// impl ValidationObserver for FailureCounter {
///     fn on_check_complete(&self, result: &CheckResult<'_>) {
///         self.0.fetch_add(result.failures().count(), Ordering::Relaxed);
///     }
/// }
/// ```
pub trait ValidationObserver: Debug + Send + Sync {
    /// Called before the first check runs.
    fn on_suite_start(&self, _suite: &str, _checks: usize) {}

    /// Called once per check, after its results are in the report.
    fn on_check_complete(&self, _result: &CheckResult<'_>) {}

    /// Called with the final result, before it is returned.
    fn on_suite_complete(&self, _result: &ValidationResult) {}
}

/// The default observer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ValidationObserver for NoopObserver {}
