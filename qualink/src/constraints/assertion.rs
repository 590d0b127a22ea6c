//! Numeric predicates evaluated against constraint metrics.

use crate::error::{QualinkError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A user-supplied predicate for [`Assertion::Custom`].
pub type AssertionFn = Arc<dyn Fn(f64) -> bool + Send + Sync>;

/// An assertion that can be evaluated against a metric.
///
/// Every constraint pairs one metric with one assertion. The assertion's
/// [label](Assertion::label) is embedded verbatim in failure messages, so it is
/// stable across releases.
///
/// Equality is exact. Ratios such as `2/3` are not exactly representable, so
/// compare them with `between` or an inequality rather than `equal_to`.
///
/// # Examples
///
/// ```rust
/// use qualink::constraints::Assertion;
///
/// let assertion = Assertion::between(1.0, 10.0);
/// assert!(assertion.evaluate(1.0).unwrap());
/// assert!(assertion.evaluate(10.0).unwrap());
/// assert!(!assertion.evaluate(0.0).unwrap());
/// assert_eq!(assertion.label(), "in [1.0, 10.0]");
///
/// let parsed: Assertion = ">= 0.95".parse().unwrap();
/// assert_eq!(parsed, Assertion::greater_than_or_equal(0.95));
///
/// let even = Assertion::custom(|v| v % 2.0 == 0.0, "is even");
/// assert!(even.evaluate(4.0).unwrap());
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assertion {
    /// Metric must be strictly greater than the value
    GreaterThan(f64),
    /// Metric must be greater than or equal to the value
    GreaterThanOrEqual(f64),
    /// Metric must be strictly less than the value
    LessThan(f64),
    /// Metric must be less than or equal to the value
    LessThanOrEqual(f64),
    /// Metric must equal the value exactly
    EqualTo(f64),
    /// Metric must lie in the inclusive range `[lower, upper]`
    Between(f64, f64),
    /// Metric must satisfy a caller-supplied predicate
    Custom {
        /// Label rendered in messages
        label: String,
        /// Predicate; absent after deserialization
        #[serde(skip)]
        predicate: Option<AssertionFn>,
    },
}

impl Assertion {
    /// `metric > value`
    pub fn greater_than(value: f64) -> Self {
        Self::GreaterThan(value)
    }

    /// `metric >= value`
    pub fn greater_than_or_equal(value: f64) -> Self {
        Self::GreaterThanOrEqual(value)
    }

    /// `metric < value`
    pub fn less_than(value: f64) -> Self {
        Self::LessThan(value)
    }

    /// `metric <= value`
    pub fn less_than_or_equal(value: f64) -> Self {
        Self::LessThanOrEqual(value)
    }

    /// `metric == value`, with no tolerance.
    pub fn equal_to(value: f64) -> Self {
        Self::EqualTo(value)
    }

    /// `lower <= metric <= upper`. A reversed range never matches.
    pub fn between(lower: f64, upper: f64) -> Self {
        Self::Between(lower, upper)
    }

    /// A predicate with a caller-chosen label.
    pub fn custom<F>(predicate: F, label: impl Into<String>) -> Self
    where
        F: Fn(f64) -> bool + Send + Sync + 'static,
    {
        Self::Custom {
            label: label.into(),
            predicate: Some(Arc::new(predicate)),
        }
    }

    /// Evaluates the assertion against a metric.
    ///
    /// Fails only for a custom assertion that has no predicate, which happens
    /// when one is deserialized from configuration.
    pub fn evaluate(&self, metric: f64) -> Result<bool> {
        Ok(match self {
            Self::GreaterThan(v) => metric > *v,
            Self::GreaterThanOrEqual(v) => metric >= *v,
            Self::LessThan(v) => metric < *v,
            Self::LessThanOrEqual(v) => metric <= *v,
            Self::EqualTo(v) => metric == *v,
            Self::Between(lower, upper) => metric >= *lower && metric <= *upper,
            Self::Custom { label, predicate } => match predicate {
                Some(predicate) => predicate(metric),
                None => {
                    return Err(QualinkError::Configuration(format!(
                        "custom assertion '{label}' has no predicate"
                    )))
                }
            },
        })
    }

    /// The rendered form used in messages, e.g. `">= 0.95"` or `"in [1.0, 10.0]"`.
    pub fn label(&self) -> String {
        match self {
            Self::GreaterThan(v) => format!("> {v:?}"),
            Self::GreaterThanOrEqual(v) => format!(">= {v:?}"),
            Self::LessThan(v) => format!("< {v:?}"),
            Self::LessThanOrEqual(v) => format!("<= {v:?}"),
            Self::EqualTo(v) => format!("== {v:?}"),
            Self::Between(lower, upper) => format!("in [{lower:?}, {upper:?}]"),
            Self::Custom { label, .. } => label.clone(),
        }
    }

    /// Builds an assertion from a configuration value.
    ///
    /// Accepts a shorthand string (`"> 5"`, `"between 0 100"`), a bare number
    /// (treated as equality), or a descriptor object:
    ///
    /// ```json
    /// {"operator": "gte", "value": 0.95}
    /// {"op": "between", "lower": 0, "upper": 100}
    /// ```
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => s.parse(),
            Value::Number(n) => n.as_f64().map(Self::EqualTo).ok_or_else(|| {
                QualinkError::Configuration(format!("assertion value {n} is not a finite number"))
            }),
            Value::Object(descriptor) => {
                let operator = descriptor
                    .get("operator")
                    .or_else(|| descriptor.get("op"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        QualinkError::Configuration(
                            "assertion descriptor requires an 'operator' (or 'op') string"
                                .to_string(),
                        )
                    })?
                    .trim()
                    .to_lowercase();

                let bound = |keys: &[&str]| -> Result<f64> {
                    keys.iter()
                        .find_map(|key| descriptor.get(*key))
                        .and_then(number_from_value)
                        .ok_or_else(|| {
                            QualinkError::Configuration(format!(
                                "assertion descriptor '{operator}' requires numeric '{}'",
                                keys[0]
                            ))
                        })
                };

                match operator.as_str() {
                    "between" | "in" => {
                        Ok(Self::Between(bound(&["lower", "min", "value"])?, bound(&["upper", "max"])?))
                    }
                    other => {
                        let build = comparison(other).ok_or_else(|| unknown_operator(other))?;
                        Ok(build(bound(&["value"])?))
                    }
                }
            }
            other => Err(QualinkError::Configuration(format!(
                "cannot build an assertion from {other}"
            ))),
        }
    }
}

/// Maps an operator spelling to its constructor.
fn comparison(operator: &str) -> Option<fn(f64) -> Assertion> {
    let build: fn(f64) -> Assertion = match operator {
        ">" | "gt" | "greater_than" => Assertion::GreaterThan,
        ">=" | "gte" | "ge" | "greater_than_or_equal" => Assertion::GreaterThanOrEqual,
        "<" | "lt" | "less_than" => Assertion::LessThan,
        "<=" | "lte" | "le" | "less_than_or_equal" => Assertion::LessThanOrEqual,
        "==" | "=" | "eq" | "equal_to" | "equals" => Assertion::EqualTo,
        _ => return None,
    };
    Some(build)
}

fn unknown_operator(operator: &str) -> QualinkError {
    QualinkError::Configuration(format!(
        "unsupported assertion operator '{operator}'; expected one of >, >=, <, <=, ==, between"
    ))
}

/// Reads a number given either as a JSON number or a numeric string.
pub(crate) fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl FromStr for Assertion {
    type Err = QualinkError;

    fn from_str(s: &str) -> Result<Self> {
        static SHORTHAND: Lazy<Regex> = Lazy::new(|| {
            // Hard-coded pattern, known to compile
            #[allow(clippy::expect_used)]
            Regex::new(r"(?i)^\s*(>=|<=|>|<|==|!=|between)\s+([\d.eE+\-]+)(?:\s+([\d.eE+\-]+))?\s*$")
                .expect("Hard-coded regex pattern should be valid")
        });

        let caps = SHORTHAND.captures(s).ok_or_else(|| {
            QualinkError::Configuration(format!(
                "invalid assertion '{s}'; expected e.g. '> 5', '>= 0.95' or 'between 0 100'"
            ))
        })?;

        let number = |text: &str| -> Result<f64> {
            text.parse::<f64>().map_err(|_| {
                QualinkError::Configuration(format!("invalid number '{text}' in assertion '{s}'"))
            })
        };

        let operator = caps[1].to_lowercase();
        let first = number(&caps[2])?;
        let second = caps.get(3).map(|m| number(m.as_str())).transpose()?;

        match (operator.as_str(), second) {
            ("between", Some(upper)) => Ok(Self::Between(first, upper)),
            ("between", None) => Err(QualinkError::Configuration(format!(
                "'between' requires two values in assertion '{s}'"
            ))),
            (_, Some(_)) => Err(QualinkError::Configuration(format!(
                "operator '{operator}' takes a single value in assertion '{s}'"
            ))),
            (other, None) => {
                let build = comparison(other).ok_or_else(|| unknown_operator(other))?;
                Ok(build(first))
            }
        }
    }
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl fmt::Debug for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom { label, predicate } => f
                .debug_struct("Custom")
                .field("label", label)
                .field("has_predicate", &predicate.is_some())
                .finish(),
            other => write!(f, "Assertion({})", other.label()),
        }
    }
}

/// Custom assertions compare by label; predicates are opaque.
impl PartialEq for Assertion {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::GreaterThan(a), Self::GreaterThan(b))
            | (Self::GreaterThanOrEqual(a), Self::GreaterThanOrEqual(b))
            | (Self::LessThan(a), Self::LessThan(b))
            | (Self::LessThanOrEqual(a), Self::LessThanOrEqual(b))
            | (Self::EqualTo(a), Self::EqualTo(b)) => a == b,
            (Self::Between(a1, a2), Self::Between(b1, b2)) => a1 == b1 && a2 == b2,
            (Self::Custom { label: a, .. }, Self::Custom { label: b, .. }) => a == b,
            _ => false,
        }
    }
}
