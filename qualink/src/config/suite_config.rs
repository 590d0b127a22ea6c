//! Declarative suite definitions.
//!
//! A suite config is plain serde data, so it can come from JSON or any
//! format with a serde deserializer:
//!
//! ```json
//! {
//!   "name": "users",
//!   "table_name": "users",
//!   "checks": [
//!     {
//!       "name": "critical",
//!       "level": "error",
//!       "rules": [
//!         {"is_complete": "user_id"},
//!         {"is_unique": ["user_id"]},
//!         {"has_size": {"gt": 0}},
//!         {"has_mean": {"column": "age", "between": [18, 80]}},
//!         {"type": "has_pattern", "params": {"column": "email", "pattern": "@"}}
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Rule values are normalised before they reach the registry. A string
//! becomes `column`, a list becomes `columns`, and inline bounds (`gt`,
//! `gte`, `min`, `lt`, `lte`, `max`, `eq`, `value`, `between`) become an
//! `assertion` shorthand.

use super::params::Params;
use super::registry::ConstraintRegistry;
use crate::core::{Check, Level, ValidationSuite, ValidationSuiteBuilder};
use crate::error::{QualinkError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

/// Rules that default to `== 1.0` when no bound is given.
const EXACT_BY_DEFAULT: &[&str] = &["is_complete", "has_completeness", "completeness"];

/// A whole validation suite, minus its data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Primary table the checks run against
    #[serde(default = "default_table_name")]
    pub table_name: String,
    /// Dispatch checks concurrently
    #[serde(default)]
    pub parallel: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    #[serde(default)]
    pub checks: Vec<CheckConfig>,
}

fn default_table_name() -> String {
    "data".to_string()
}

impl SuiteConfig {
    /// Parses a suite config from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds every check with `registry` and returns a suite builder.
    ///
    /// The caller still binds a data source before building and running.
    ///
    /// ```rust
    /// use qualink::config::{ConstraintRegistry, SuiteConfig};
    ///
    /// let config = SuiteConfig::from_json(
    ///     r#"{"name": "orders", "checks": [{"name": "ids", "rules": [{"is_complete": "id"}]}]}"#,
    /// )
    /// .unwrap();
    /// let suite = config
    ///     .into_builder(ConstraintRegistry::builtin())
    ///     .unwrap()
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(suite.table_name(), "data");
    /// assert_eq!(suite.checks()[0].constraints()[0].name(), "Completeness(id)");
    /// ```
    pub fn into_builder(&self, registry: &ConstraintRegistry) -> Result<ValidationSuiteBuilder> {
        info!(
            suite.name = %self.name,
            suite.checks = self.checks.len(),
            "Building suite from configuration"
        );

        let mut builder = ValidationSuite::builder(&self.name)
            .table_name(&self.table_name)
            .run_parallel(self.parallel);
        if let Some(description) = &self.description {
            builder = builder.description(description);
        }
        if let Some(max_concurrency) = self.max_concurrency {
            builder = builder.max_concurrency(max_concurrency);
        }

        let checks = self
            .checks
            .iter()
            .map(|check| check.build(registry))
            .collect::<Result<Vec<_>>>()?;
        Ok(builder.checks(checks))
    }
}

/// One check: a name, a level and its rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckConfig {
    pub name: String,
    #[serde(default = "default_level")]
    pub level: Level,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

fn default_level() -> Level {
    Level::Error
}

impl CheckConfig {
    /// Builds the check, resolving each rule through `registry`.
    pub fn build(&self, registry: &ConstraintRegistry) -> Result<Check> {
        debug!(
            check.name = %self.name,
            check.level = %self.level,
            check.rules = self.rules.len(),
            "Building check from configuration"
        );
        let constraints = self
            .rules
            .iter()
            .map(|rule| {
                registry
                    .build(&rule.type_name, &rule.params)
                    .map_err(|e| match e {
                        QualinkError::Configuration(message) => QualinkError::Configuration(
                            format!("check '{}': {message}", self.name),
                        ),
                        other => other,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut builder = Check::builder(&self.name)
            .level(self.level)
            .constraints(constraints);
        if let Some(description) = &self.description {
            builder = builder.description(description);
        }
        builder.build()
    }
}

/// One rule: a registry type name and normalised parameters.
///
/// Deserializes from either a single-key map (`{"has_min": {...}}`) or an
/// explicit pair (`{"type": "has_min", "params": {...}}`). Serializes as the
/// explicit pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Map<String, Value>")]
pub struct RuleConfig {
    #[serde(rename = "type")]
    pub type_name: String,
    pub params: Params,
}

impl RuleConfig {
    /// Creates a rule from a raw value, applying the same normalisation as
    /// deserialization.
    pub fn new(type_name: impl Into<String>, value: Value) -> Result<Self> {
        let type_name = type_name.into();
        let params = normalise_params(&type_name, value)?;
        Ok(Self { type_name, params })
    }
}

impl TryFrom<serde_json::Map<String, Value>> for RuleConfig {
    type Error = QualinkError;

    fn try_from(mut map: serde_json::Map<String, Value>) -> Result<Self> {
        if let Some(type_name) = map.get("type").and_then(Value::as_str).map(str::to_string) {
            let params = map.remove("params").unwrap_or(Value::Object(Params::new()));
            return Self::new(type_name, params);
        }

        let mut entries = map.into_iter();
        match (entries.next(), entries.next()) {
            (Some((type_name, value)), None) => Self::new(type_name, value),
            _ => Err(QualinkError::Configuration(
                "a rule must be a single-key map {type: value} or {\"type\": ..., \"params\": {...}}"
                    .to_string(),
            )),
        }
    }
}

fn normalise_params(type_name: &str, raw: Value) -> Result<Params> {
    let mut params = Params::new();
    match raw {
        Value::String(column) => {
            params.insert("column".to_string(), Value::String(column));
        }
        Value::Array(columns) => {
            params.insert("columns".to_string(), Value::Array(columns));
        }
        Value::Object(map) => {
            let mut bound = None;
            for (key, value) in map {
                match bound_shorthand(&key, &value)? {
                    Some(shorthand) => {
                        if bound.replace(key.clone()).is_some() {
                            return Err(QualinkError::Configuration(format!(
                                "rule '{type_name}' has more than one bound key"
                            )));
                        }
                        params.insert("assertion".to_string(), Value::String(shorthand));
                    }
                    None => {
                        params.insert(key, value);
                    }
                }
            }
        }
        Value::Null => {}
        other => {
            return Err(QualinkError::Configuration(format!(
                "rule '{type_name}' has an unsupported value {other}"
            )))
        }
    }

    if !params.contains_key("assertion") {
        if let Some(threshold) = params.remove("threshold") {
            let threshold = crate::constraints::number_from_value(&threshold).ok_or_else(|| {
                QualinkError::Configuration(format!(
                    "rule '{type_name}' has a non-numeric threshold {threshold}"
                ))
            })?;
            params.insert(
                "assertion".to_string(),
                Value::String(format!(">= {threshold}")),
            );
        } else if EXACT_BY_DEFAULT.contains(&type_name.trim().to_lowercase().as_str()) {
            params.insert("assertion".to_string(), Value::String("== 1.0".to_string()));
        }
    }

    Ok(params)
}

/// Converts an inline bound key into an assertion shorthand, or `None` for
/// ordinary parameters.
fn bound_shorthand(key: &str, value: &Value) -> Result<Option<String>> {
    let operator = match key {
        "gt" => ">",
        "gte" | "min" => ">=",
        "lt" => "<",
        "lte" | "max" => "<=",
        "eq" | "value" => "==",
        "between" => {
            let bounds = value.as_array().filter(|items| items.len() == 2).ok_or_else(|| {
                QualinkError::Configuration(format!(
                    "'between' takes a two-element list, got {value}"
                ))
            })?;
            return Ok(Some(format!(
                "between {} {}",
                bound_number(key, &bounds[0])?,
                bound_number(key, &bounds[1])?
            )));
        }
        _ => return Ok(None),
    };
    Ok(Some(format!("{operator} {}", bound_number(key, value)?)))
}

fn bound_number(key: &str, value: &Value) -> Result<f64> {
    crate::constraints::number_from_value(value).ok_or_else(|| {
        QualinkError::Configuration(format!("bound '{key}' must be numeric, got {value}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(value: Value) -> RuleConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_scalar_and_list_values() {
        let complete = rule(json!({"is_complete": "user_id"}));
        assert_eq!(complete.type_name, "is_complete");
        assert_eq!(complete.params["column"], "user_id");
        assert_eq!(complete.params["assertion"], "== 1.0");

        let unique = rule(json!({"is_unique": ["a", "b"]}));
        assert_eq!(unique.params["columns"], json!(["a", "b"]));
        assert!(!unique.params.contains_key("assertion"));
    }

    #[test]
    fn test_inline_bounds() {
        let size = rule(json!({"has_size": {"gt": 0}}));
        assert_eq!(size.params["assertion"], "> 0");

        let mean = rule(json!({"has_mean": {"column": "age", "between": [18, 80.5]}}));
        assert_eq!(mean.params["assertion"], "between 18 80.5");
        assert_eq!(mean.params["column"], "age");

        let max = rule(json!({"has_max": {"column": "age", "max": "120"}}));
        assert_eq!(max.params["assertion"], "<= 120");

        let err = serde_json::from_value::<RuleConfig>(json!({"has_min": {"gt": 1, "lt": 5}}));
        assert!(err.is_err());
    }

    #[test]
    fn test_threshold_becomes_assertion() {
        let email = rule(json!({"contains_email": {"column": "email", "threshold": 0.95}}));
        assert_eq!(email.params["assertion"], ">= 0.95");
        assert!(!email.params.contains_key("threshold"));
    }

    #[test]
    fn test_explicit_form_and_serialization() {
        let explicit = rule(json!({
            "type": "has_pattern",
            "params": {"column": "email", "pattern": "@", "gte": 0.5}
        }));
        assert_eq!(explicit.type_name, "has_pattern");
        assert_eq!(explicit.params["assertion"], ">= 0.5");

        let json = serde_json::to_value(&explicit).unwrap();
        assert_eq!(json["type"], "has_pattern");
        let back: RuleConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, explicit);
    }

    #[test]
    fn test_multi_key_rule_rejected() {
        assert!(serde_json::from_value::<RuleConfig>(json!({"a": "x", "b": "y"})).is_err());
        assert!(serde_json::from_value::<RuleConfig>(json!({})).is_err());
    }

    #[test]
    fn test_suite_defaults_and_build() {
        let config = SuiteConfig::from_json(
            r#"{
                "name": "users",
                "checks": [
                    {"name": "critical", "rules": [{"is_complete": "id"}, {"has_size": {"gte": 1}}]},
                    {"name": "soft", "level": "warning", "description": "nice to have",
                     "rules": [{"has_min": {"column": "age", "gte": 0}}]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.table_name, "data");
        assert!(!config.parallel);
        assert_eq!(config.checks[0].level, Level::Error);

        let suite = config
            .into_builder(ConstraintRegistry::builtin())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(suite.name(), "users");
        assert_eq!(suite.checks().len(), 2);
        assert_eq!(suite.checks()[1].level(), Level::Warning);
        assert_eq!(suite.checks()[1].description(), Some("nice to have"));
        assert_eq!(suite.checks()[0].constraints()[1].name(), "Size(>= 1.0)");
    }

    #[test]
    fn test_unknown_rule_names_the_check() {
        let config = CheckConfig {
            name: "broken".to_string(),
            level: Level::Info,
            description: None,
            rules: vec![RuleConfig::new("has_entropy", json!("x")).unwrap()],
        };
        let err = config.build(ConstraintRegistry::builtin()).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("check 'broken'"), "{err}");
    }
}
