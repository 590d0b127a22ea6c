//! # qualink - declarative data-quality validation
//!
//! qualink validates tabular data by turning each rule into one aggregate SQL
//! query, running it on a query engine and grading the answer. DataFusion is
//! the bundled engine; anything implementing [`source::DataSource`] works.
//!
//! ## Quick Start
//!
//! ```rust
//! use qualink::prelude::*;
//! use datafusion::prelude::SessionContext;
//! use std::sync::Arc;
//!
//! # async fn example() -> qualink::error::Result<()> {
//! let ctx = SessionContext::new();
//! ctx.sql("CREATE TABLE users (id BIGINT, email VARCHAR, age BIGINT)").await?.collect().await?;
//! ctx.sql("INSERT INTO users VALUES (1, 'a@example.com', 31), (2, 'b@example.com', 45)")
//!     .await?
//!     .collect()
//!     .await?;
//!
//! let suite = ValidationSuite::builder("user_data_validation")
//!     .on_data(Arc::new(DataFusionSource::new(ctx)), "users")
//!     .check(
//!         Check::builder("critical_checks")
//!             .level(Level::Error)
//!             .is_complete("id")
//!             .is_unique("id")
//!             .build()?,
//!     )
//!     .check(
//!         Check::builder("data_quality")
//!             .level(Level::Warning)
//!             .contains_email("email", 0.98)
//!             .has_min("age", Assertion::greater_than_or_equal(0.0))
//!             .has_max("age", Assertion::less_than_or_equal(120.0))
//!             .build()?,
//!     )
//!     .build()?;
//!
//! let result = suite.run().await?;
//! if result.is_failure() {
//!     for issue in &result.report().issues {
//!         println!("[{}] {}: {}", issue.level, issue.check_name, issue.message);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Concepts
//!
//! - **Assertion**: a predicate over one number, e.g. `>= 0.95` or `in [0, 100]`
//! - **Constraint**: one measurable property of a table graded by an assertion
//! - **Check**: a named list of constraints with a severity [`core::Level`]
//! - **Suite**: every check of one run, folded into a single report
//!
//! Data-quality failures never surface as errors. They are recorded in the
//! report. Errors are reserved for bad configuration, caught when a check or
//! suite is built, and for backend faults, which abort the run.
//!
//! ## Configuration
//!
//! Suites can also be declared as data and resolved through the constraint
//! registry, see [`config`].
//!
//! ## Modules
//!
//! - **`constraints`**: assertions and the constraint catalog
//! - **`core`**: checks, suites and result types
//! - **`config`**: the constraint registry and declarative suite configs
//! - **`source`**: the query backend seam and its DataFusion implementation
//! - **`observer`**: hooks for progress reporting and telemetry
//! - **`logging`**: log configuration and optional subscriber setup

pub mod config;
pub mod constraints;
pub mod core;
pub mod error;
pub mod logging;
pub mod observer;
pub mod prelude;
pub mod security;
pub mod source;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
