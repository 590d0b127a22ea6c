//! Building constraints, checks and suites from configuration.
//!
//! [`ConstraintRegistry`] turns a `(type name, parameters)` pair into a
//! constraint. [`SuiteConfig`] describes a whole suite as serde data and
//! resolves its rules through a registry.

mod params;
mod registry;
mod suite_config;

pub use params::{ParamReader, Params};
pub use registry::{ConstraintDef, ConstraintRegistry, Factory, ParamShape};
pub use suite_config::{CheckConfig, RuleConfig, SuiteConfig};
