//! Typed access to flat constraint parameter maps.

use crate::constraints::{number_from_value, Assertion};
use crate::error::{QualinkError, Result};
use serde_json::Value;

/// Flat parameters for one rule, as produced by a config loader.
pub type Params = serde_json::Map<String, Value>;

/// Pulls typed arguments out of a [`Params`] map.
///
/// Every error names the constraint type and the offending key.
///
/// ```rust
/// use qualink::config::{ParamReader, Params};
/// use serde_json::json;
///
/// let params: Params = serde_json::from_value(json!({
///     "columns": ["id", "region"],
///     "assertion": ">= 0.9",
/// }))
/// .unwrap();
/// let reader = ParamReader::new("distinctness", &params);
/// assert_eq!(reader.columns().unwrap(), vec!["id", "region"]);
/// assert!(reader.required_string("pattern").is_err());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ParamReader<'a> {
    type_name: &'a str,
    params: &'a Params,
}

impl<'a> ParamReader<'a> {
    pub fn new(type_name: &'a str, params: &'a Params) -> Self {
        Self { type_name, params }
    }

    /// The constraint type these parameters were supplied for.
    pub fn type_name(&self) -> &'a str {
        self.type_name
    }

    pub fn raw(&self, key: &str) -> Option<&'a Value> {
        self.params.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Reads a string parameter if present.
    pub fn string(&self, key: &str) -> Result<Option<String>> {
        match self.params.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.invalid(key, "a string", other)),
        }
    }

    pub fn required_string(&self, key: &str) -> Result<String> {
        self.string(key)?.ok_or_else(|| self.missing(key))
    }

    /// Reads the first present key out of `keys`.
    pub fn first_string(&self, keys: &[&str]) -> Result<String> {
        for key in keys {
            if let Some(value) = self.string(key)? {
                return Ok(value);
            }
        }
        Err(self.missing(&keys.join("' or '")))
    }

    pub fn column(&self) -> Result<String> {
        self.required_string("column")
    }

    /// Reads `columns` as a string or a list of strings, falling back to
    /// `column`.
    pub fn columns(&self) -> Result<Vec<String>> {
        match self.params.get("columns") {
            Some(Value::String(s)) => Ok(vec![s.clone()]),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(self.invalid("columns", "a list of strings", other)),
                })
                .collect(),
            Some(other) => Err(self.invalid("columns", "a string or a list of strings", other)),
            None => match self.string("column")? {
                Some(column) => Ok(vec![column]),
                None => Err(self.missing("column' or 'columns")),
            },
        }
    }

    /// Reads a number given as a JSON number or a numeric string.
    pub fn number(&self, key: &str) -> Result<Option<f64>> {
        match self.params.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => number_from_value(value)
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a number", value)),
        }
    }

    pub fn required_number(&self, key: &str) -> Result<f64> {
        self.number(key)?.ok_or_else(|| self.missing(key))
    }

    /// Parses `assertion` if present.
    pub fn assertion(&self) -> Result<Option<Assertion>> {
        match self.params.get("assertion") {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Assertion::from_value(value)
                .map(Some)
                .map_err(|e| self.wrap("assertion", e)),
        }
    }

    pub fn required_assertion(&self) -> Result<Assertion> {
        self.assertion()?.ok_or_else(|| self.missing("assertion"))
    }

    /// Reads a minimum ratio for threshold-style constraints.
    ///
    /// Uses `threshold` when given. Otherwise a `>=` assertion (or `== 1`)
    /// supplies the bound, and a missing assertion means `1.0`.
    pub fn threshold(&self) -> Result<f64> {
        if let Some(threshold) = self.number("threshold")? {
            return Ok(threshold);
        }
        match self.assertion()? {
            None => Ok(1.0),
            Some(Assertion::GreaterThanOrEqual(bound)) => Ok(bound),
            Some(Assertion::EqualTo(bound)) if bound == 1.0 => Ok(bound),
            Some(other) => Err(QualinkError::Configuration(format!(
                "'{}' takes a minimum threshold; assertion '{other}' cannot be used",
                self.type_name
            ))),
        }
    }

    fn missing(&self, key: &str) -> QualinkError {
        QualinkError::Configuration(format!(
            "'{}' requires parameter '{key}'",
            self.type_name
        ))
    }

    fn invalid(&self, key: &str, expected: &str, got: &Value) -> QualinkError {
        QualinkError::Configuration(format!(
            "'{}' parameter '{key}' must be {expected}, got {got}",
            self.type_name
        ))
    }

    fn wrap(&self, key: &str, error: QualinkError) -> QualinkError {
        match error {
            QualinkError::Configuration(message) => QualinkError::Configuration(format!(
                "'{}' parameter '{key}': {message}",
                self.type_name
            )),
            other => other,
        }
    }
}
