//! Error types for qualink.
//!
//! Everything fallible in the crate returns [`QualinkError`] through the
//! [`Result`] alias. Configuration problems are reported when a constraint,
//! check or suite is built; backend faults surface from `run()` and abort the
//! whole validation.
//!
//! Data-quality failures are never errors. They are recorded as failing
//! constraint results inside the validation report.

use thiserror::Error;

/// The main error type for qualink.
#[derive(Error, Debug)]
pub enum QualinkError {
    /// Malformed assertion, unknown constraint type, missing or out-of-range
    /// parameter.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A suite was run before any data source was bound to it.
    #[error("No data source bound: call `on_data` before running suite '{suite}'")]
    UnboundDataSource {
        /// Name of the suite that was run
        suite: String,
    },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// The backend answered, but not with the shape the generated query asked for.
    #[error("Unexpected query result: {0}")]
    UnexpectedResult(String),

    /// Security-related error (unsafe identifier, expression or pattern).
    #[error("Security error: {0}")]
    SecurityError(String),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, QualinkError>`.
pub type Result<T> = std::result::Result<T, QualinkError>;

impl QualinkError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Returns true for errors raised while building constraints, checks or suites.
    ///
    /// Security validation of identifiers and expressions happens at build time
    /// too, so it counts as configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            QualinkError::Configuration(_) | QualinkError::SecurityError(_)
        )
    }
}

/// Extension trait for adding context to errors.
///
/// Backend errors keep their `DataFusion` variant with the context attached,
/// so callers can still tell a query fault from an internal one.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<QualinkError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.with_context(|| msg.to_string())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| match e.into() {
            QualinkError::DataFusion(inner) => QualinkError::DataFusion(inner.context(f())),
            QualinkError::Internal(inner) => QualinkError::Internal(format!("{}: {inner}", f())),
            other => QualinkError::Internal(format!("{}: {other}", f())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_display() {
        let err = QualinkError::configuration("quantile must be in [0, 1], got 1.5");
        assert_eq!(
            err.to_string(),
            "Configuration error: quantile must be in [0, 1], got 1.5"
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unbound_source_display() {
        let err = QualinkError::UnboundDataSource {
            suite: "orders".to_string(),
        };
        assert!(err.to_string().contains("orders"));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_security_error_is_configuration() {
        let err = QualinkError::SecurityError("bad identifier".to_string());
        assert!(err.is_configuration());
    }

    #[test]
    fn test_error_context() {
        fn failing_operation() -> Result<()> {
            Err(QualinkError::Internal("Something went wrong".to_string()))
        }

        let err = failing_operation()
            .context("While reading schema")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Internal error: While reading schema: Something went wrong"
        );
    }

    #[test]
    fn test_error_context_keeps_backend_variant() {
        let backend: std::result::Result<(), _> = Err(
            datafusion::error::DataFusionError::Plan("table 'orders' not found".to_string()),
        );
        let err = backend
            .with_context(|| "reading schema of 'orders'".to_string())
            .unwrap_err();
        assert!(matches!(err, QualinkError::DataFusion(_)));
        let message = err.to_string();
        assert!(message.contains("reading schema of 'orders'"), "{message}");
        assert!(message.contains("table 'orders' not found"), "{message}");
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: QualinkError = parse.unwrap_err().into();
        assert!(matches!(err, QualinkError::Serialization(_)));
    }
}
