//! Prelude for commonly used types and traits in qualink.

pub use crate::config::{ConstraintRegistry, SuiteConfig};
pub use crate::constraints::{Assertion, FormatType, StatisticType};
pub use crate::core::{
    Check, CheckStatus, Constraint, ConstraintResult, ConstraintStatus, Level, ValidationResult,
    ValidationSuite,
};
pub use crate::error::{ErrorContext, QualinkError, Result};
pub use crate::logging::LogConfig;
pub use crate::observer::ValidationObserver;
pub use crate::source::{DataFusionSource, DataSource};
