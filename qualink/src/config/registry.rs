//! Builds constraints from a type name and a flat parameter map.
//!
//! Every configurable constraint is one [`ConstraintDef`]: a set of
//! case-insensitive aliases plus a [`Factory`]. Most factories declare a
//! fixed parameter shape and a plain constructor; the registry pulls the
//! arguments for that shape out of the map. Constraints with unusual
//! parameters use [`Factory::Custom`] and read the map themselves.
//!
//! ```rust
//! use qualink::config::{ConstraintRegistry, Params};
//! use serde_json::json;
//!
//! let params: Params = serde_json::from_value(json!({"columns": ["id"]})).unwrap();
//! let constraint = ConstraintRegistry::builtin().build("uniqueness", &params).unwrap();
//! assert_eq!(constraint.name(), "Uniqueness(id)");
//! ```

use super::params::{ParamReader, Params};
use crate::constraints::{
    ApproxCountDistinctConstraint, ApproxQuantileConstraint, Assertion, ColumnCountConstraint,
    ColumnExistsConstraint, CompletenessConstraint, ComplianceConstraint, CorrelationConstraint,
    CustomSqlConstraint, DistinctnessConstraint, FormatConstraint, FormatType,
    MaxLengthConstraint, MinLengthConstraint, PatternMatchConstraint,
    ReferentialIntegrityConstraint, RowCountMatchConstraint, SchemaMatchConstraint,
    SizeConstraint, StatisticType, StatisticalConstraint, UniqueValueRatioConstraint,
    UniquenessConstraint,
};
use crate::core::{BoxedConstraint, Constraint};
use crate::error::{QualinkError, Result};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// How a factory's constructor arguments are read from the parameter map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamShape {
    /// `column`, `threshold` (default 1.0)
    ColumnThreshold,
    /// `columns` (or `column`), `threshold` (default 1.0)
    ColumnsThreshold,
    /// `column`, `assertion`
    ColumnAssertion,
    /// `columns` (or `column`), `assertion`
    ColumnsAssertion,
    /// `column_a`, `column_b`, `assertion`
    TwoColumnAssertion,
    /// `assertion`
    AssertionOnly,
    /// `column`
    ColumnOnly,
    /// `expression` (or `sql`)
    Expression,
    /// `column`, `assertion`, with the statistic fixed by the definition
    Statistic(StatisticType),
    /// Read by the factory itself
    Custom,
}

type CustomFactory = Arc<dyn Fn(&ParamReader<'_>) -> Result<BoxedConstraint> + Send + Sync>;

/// A constructor together with the shape of its arguments.
#[derive(Clone)]
pub enum Factory {
    ColumnThreshold(fn(String, f64) -> Result<BoxedConstraint>),
    ColumnsThreshold(fn(Vec<String>, f64) -> Result<BoxedConstraint>),
    ColumnAssertion(fn(String, Assertion) -> Result<BoxedConstraint>),
    ColumnsAssertion(fn(Vec<String>, Assertion) -> Result<BoxedConstraint>),
    TwoColumnAssertion(fn(String, String, Assertion) -> Result<BoxedConstraint>),
    AssertionOnly(fn(Assertion) -> Result<BoxedConstraint>),
    ColumnOnly(fn(String) -> Result<BoxedConstraint>),
    Expression(fn(String) -> Result<BoxedConstraint>),
    Statistic(StatisticType),
    Custom(CustomFactory),
}

impl Factory {
    /// Wraps a closure that reads its own parameters.
    pub fn custom<F>(build: F) -> Self
    where
        F: Fn(&ParamReader<'_>) -> Result<BoxedConstraint> + Send + Sync + 'static,
    {
        Factory::Custom(Arc::new(build))
    }

    pub fn shape(&self) -> ParamShape {
        match self {
            Factory::ColumnThreshold(_) => ParamShape::ColumnThreshold,
            Factory::ColumnsThreshold(_) => ParamShape::ColumnsThreshold,
            Factory::ColumnAssertion(_) => ParamShape::ColumnAssertion,
            Factory::ColumnsAssertion(_) => ParamShape::ColumnsAssertion,
            Factory::TwoColumnAssertion(_) => ParamShape::TwoColumnAssertion,
            Factory::AssertionOnly(_) => ParamShape::AssertionOnly,
            Factory::ColumnOnly(_) => ParamShape::ColumnOnly,
            Factory::Expression(_) => ParamShape::Expression,
            Factory::Statistic(statistic) => ParamShape::Statistic(*statistic),
            Factory::Custom(_) => ParamShape::Custom,
        }
    }

    fn build(&self, params: &ParamReader<'_>) -> Result<BoxedConstraint> {
        match self {
            Factory::ColumnThreshold(new) => new(params.column()?, params.threshold()?),
            Factory::ColumnsThreshold(new) => new(params.columns()?, params.threshold()?),
            Factory::ColumnAssertion(new) => new(params.column()?, params.required_assertion()?),
            Factory::ColumnsAssertion(new) => {
                new(params.columns()?, params.required_assertion()?)
            }
            Factory::TwoColumnAssertion(new) => new(
                params.required_string("column_a")?,
                params.required_string("column_b")?,
                params.required_assertion()?,
            ),
            Factory::AssertionOnly(new) => new(params.required_assertion()?),
            Factory::ColumnOnly(new) => new(params.column()?),
            Factory::Expression(new) => new(params.first_string(&["expression", "sql"])?),
            Factory::Statistic(statistic) => boxed(StatisticalConstraint::new(
                params.column()?,
                *statistic,
                params.required_assertion()?,
            )),
            Factory::Custom(build) => build(params),
        }
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Factory({:?})", self.shape())
    }
}

/// One configurable constraint type.
#[derive(Debug, Clone)]
pub struct ConstraintDef {
    names: Vec<String>,
    factory: Factory,
}

impl ConstraintDef {
    /// Creates a definition. Aliases are matched case-insensitively.
    pub fn new<I, S>(names: I, factory: Factory) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .map(|name| name.into().trim().to_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
            factory,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn shape(&self) -> ParamShape {
        self.factory.shape()
    }
}

static BUILTIN: Lazy<ConstraintRegistry> = Lazy::new(ConstraintRegistry::with_builtins);

/// Maps constraint type aliases to their definitions.
#[derive(Debug, Clone, Default)]
pub struct ConstraintRegistry {
    index: BTreeMap<String, Arc<ConstraintDef>>,
}

impl ConstraintRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared registry holding every built-in constraint type.
    pub fn builtin() -> &'static ConstraintRegistry {
        &BUILTIN
    }

    /// A fresh registry with the built-in types, ready to be extended.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for def in builtin_defs() {
            registry.register(def);
        }
        registry
    }

    /// Registers a definition under all of its aliases.
    ///
    /// An alias that is already taken is rebound to the new definition.
    pub fn register(&mut self, def: ConstraintDef) {
        let def = Arc::new(def);
        for name in def.names() {
            if self.index.insert(name.clone(), Arc::clone(&def)).is_some() {
                debug!(constraint.type_name = %name, "Rebinding constraint alias");
            }
        }
    }

    /// Builds the constraint registered as `type_name`.
    pub fn build(&self, type_name: &str, params: &Params) -> Result<BoxedConstraint> {
        let key = type_name.trim().to_lowercase();
        let def = self.index.get(&key).ok_or_else(|| {
            QualinkError::Configuration(format!(
                "unknown constraint type '{type_name}'; available types: {}",
                self.available_types().join(", ")
            ))
        })?;

        let constraint = def.factory.build(&ParamReader::new(&key, params))?;
        debug!(
            constraint.type_name = %key,
            constraint.name = %constraint.name(),
            "Built constraint from parameters"
        );
        Ok(constraint)
    }

    /// Every registered alias, sorted.
    pub fn available_types(&self) -> Vec<&str> {
        self.index.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.index.contains_key(&type_name.trim().to_lowercase())
    }

    /// The parameter shape of a registered type.
    pub fn shape_of(&self, type_name: &str) -> Option<ParamShape> {
        self.index
            .get(&type_name.trim().to_lowercase())
            .map(|def| def.shape())
    }
}

fn boxed<C: Constraint + 'static>(constraint: Result<C>) -> Result<BoxedConstraint> {
    constraint.map(|c| Box::new(c) as BoxedConstraint)
}

fn assertion_or_exact(params: &ParamReader<'_>) -> Result<Assertion> {
    Ok(params
        .assertion()?
        .unwrap_or_else(|| Assertion::equal_to(1.0)))
}

fn fixed_format(format: FormatType) -> Factory {
    Factory::custom(move |p| {
        boxed(FormatConstraint::new(
            p.column()?,
            format.clone(),
            p.threshold()?,
        ))
    })
}

fn builtin_defs() -> Vec<ConstraintDef> {
    let stat = |names: &[&str], statistic| ConstraintDef::new(names.to_vec(), Factory::Statistic(statistic));

    vec![
        ConstraintDef::new(
            ["uniqueness", "is_unique", "has_uniqueness", "is_primary_key"],
            Factory::ColumnsThreshold(|c, t| boxed(UniquenessConstraint::new(c, t))),
        ),
        ConstraintDef::new(
            ["distinctness", "has_distinctness"],
            Factory::ColumnsAssertion(|c, a| boxed(DistinctnessConstraint::new(c, a))),
        ),
        ConstraintDef::new(
            ["unique_value_ratio", "has_unique_value_ratio"],
            Factory::ColumnsAssertion(|c, a| boxed(UniqueValueRatioConstraint::new(c, a))),
        ),
        ConstraintDef::new(
            ["completeness", "is_complete", "has_completeness"],
            Factory::ColumnAssertion(|c, a| boxed(CompletenessConstraint::new(c, a))),
        ),
        ConstraintDef::new(
            ["min_length", "has_min_length"],
            Factory::ColumnAssertion(|c, a| boxed(MinLengthConstraint::new(c, a))),
        ),
        ConstraintDef::new(
            ["max_length", "has_max_length"],
            Factory::ColumnAssertion(|c, a| boxed(MaxLengthConstraint::new(c, a))),
        ),
        ConstraintDef::new(
            ["approx_count_distinct", "has_approx_count_distinct"],
            Factory::ColumnAssertion(|c, a| boxed(ApproxCountDistinctConstraint::new(c, a))),
        ),
        ConstraintDef::new(
            ["correlation", "has_correlation"],
            Factory::TwoColumnAssertion(|x, y, a| boxed(CorrelationConstraint::new(x, y, a))),
        ),
        ConstraintDef::new(
            ["size", "has_size", "row_count"],
            Factory::AssertionOnly(|a| Ok(Box::new(SizeConstraint::new(a)) as BoxedConstraint)),
        ),
        ConstraintDef::new(
            ["column_count", "has_column_count"],
            Factory::AssertionOnly(|a| {
                Ok(Box::new(ColumnCountConstraint::new(a)) as BoxedConstraint)
            }),
        ),
        ConstraintDef::new(
            ["column_exists", "has_column"],
            Factory::ColumnOnly(|c| boxed(ColumnExistsConstraint::new(c))),
        ),
        ConstraintDef::new(
            ["custom_sql", "sql"],
            Factory::Expression(|e| boxed(CustomSqlConstraint::new(e))),
        ),
        stat(&["min", "has_min"], StatisticType::Min),
        stat(&["max", "has_max"], StatisticType::Max),
        stat(&["mean", "has_mean"], StatisticType::Mean),
        stat(&["sum", "has_sum"], StatisticType::Sum),
        stat(
            &["stddev", "has_standard_deviation", "has_stddev"],
            StatisticType::StandardDeviation,
        ),
        stat(&["median", "has_median"], StatisticType::Median),
        ConstraintDef::new(
            ["compliance", "satisfies"],
            Factory::custom(|p| {
                let predicate = p.first_string(&["predicate", "expression"])?;
                let mut constraint = ComplianceConstraint::new(predicate, p.required_assertion()?)?;
                if let Some(label) = p.string("name")? {
                    constraint = constraint.with_label(label);
                }
                boxed(Ok(constraint))
            }),
        ),
        ConstraintDef::new(
            ["pattern", "pattern_match", "has_pattern"],
            Factory::custom(|p| {
                boxed(PatternMatchConstraint::new(
                    p.column()?,
                    p.required_string("pattern")?,
                    assertion_or_exact(p)?,
                ))
            }),
        ),
        ConstraintDef::new(
            ["format", "has_format"],
            Factory::custom(|p| {
                let pattern = p.string("pattern")?;
                let format = FormatType::parse(
                    &p.first_string(&["format_type", "format"])?,
                    pattern.as_deref(),
                )?;
                boxed(FormatConstraint::new(p.column()?, format, p.threshold()?))
            }),
        ),
        ConstraintDef::new(["contains_email"], fixed_format(FormatType::Email)),
        ConstraintDef::new(["contains_url"], fixed_format(FormatType::Url)),
        ConstraintDef::new(["contains_phone"], fixed_format(FormatType::Phone)),
        ConstraintDef::new(["contains_credit_card"], fixed_format(FormatType::CreditCard)),
        ConstraintDef::new(["contains_ssn"], fixed_format(FormatType::Ssn)),
        ConstraintDef::new(["contains_ipv4"], fixed_format(FormatType::Ipv4)),
        ConstraintDef::new(
            ["approx_quantile", "has_approx_quantile"],
            Factory::custom(|p| {
                boxed(ApproxQuantileConstraint::new(
                    p.column()?,
                    p.required_number("quantile")?,
                    p.required_assertion()?,
                ))
            }),
        ),
        ConstraintDef::new(
            ["referential_integrity"],
            Factory::custom(|p| {
                boxed(ReferentialIntegrityConstraint::new(
                    p.required_string("child_table")?,
                    p.required_string("child_column")?,
                    p.required_string("parent_table")?,
                    p.required_string("parent_column")?,
                    assertion_or_exact(p)?,
                ))
            }),
        ),
        ConstraintDef::new(
            ["row_count_match"],
            Factory::custom(|p| {
                boxed(RowCountMatchConstraint::new(
                    p.required_string("table_a")?,
                    p.required_string("table_b")?,
                    assertion_or_exact(p)?,
                ))
            }),
        ),
        ConstraintDef::new(
            ["schema_match"],
            Factory::custom(|p| {
                boxed(SchemaMatchConstraint::new(
                    p.required_string("table_a")?,
                    p.required_string("table_b")?,
                    assertion_or_exact(p)?,
                ))
            }),
        ),
    ]
}
