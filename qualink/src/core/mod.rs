//! Core validation types.
//!
//! - **[`ValidationSuite`]**: a collection of checks run against one bound table
//! - **[`Check`]**: a named group of constraints with a severity [`Level`]
//! - **[`Constraint`]**: one measurable property (implemented in [`crate::constraints`])
//! - **[`ValidationResult`]**: the outcome of a suite run, wrapping a [`ValidationReport`]
//!
//! ```text
//! ValidationSuite
//!     ├── Check (Level: Error)
//!     │   ├── Constraint 1
//!     │   └── Constraint 2
//!     └── Check (Level: Warning)
//!         ├── Constraint 3
//!         └── Constraint 4
//! ```
//!
//! Status escalation: an `Error` check with a failing constraint makes the
//! whole run fail; a `Warning` check only raises the worst status; an `Info`
//! check never escalates.

mod check;
mod constraint;
mod level;
mod result;
mod suite;

pub use check::{Check, CheckBuilder, CheckResult, CheckStatus};
pub use constraint::{
    BoxedConstraint, Constraint, ConstraintMetadata, ConstraintResult, ConstraintStatus,
};
pub use level::Level;
pub use result::{ValidationIssue, ValidationMetrics, ValidationReport, ValidationResult};
pub use suite::{ValidationSuite, ValidationSuiteBuilder};
