//! Built-in value formats.

use super::pattern::match_ratio;
use super::{grade, unit_interval, Assertion};
use crate::core::{Constraint, ConstraintMetadata, ConstraintResult};
use crate::error::{QualinkError, Result};
use crate::security::SqlSecurity;
use crate::source::DataSource;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::instrument;

/// A known value format, or a free-form regular expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatType {
    Email,
    Url,
    Phone,
    CreditCard,
    Ssn,
    Ipv4,
    /// A caller-supplied pattern.
    Regex(String),
}

impl FormatType {
    /// Short tag used in constraint names, e.g. `credit_card`.
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatType::Email => "email",
            FormatType::Url => "url",
            FormatType::Phone => "phone",
            FormatType::CreditCard => "credit_card",
            FormatType::Ssn => "ssn",
            FormatType::Ipv4 => "ipv4",
            FormatType::Regex(_) => "regex",
        }
    }

    /// The regular expression values must match.
    pub fn pattern(&self) -> &str {
        match self {
            FormatType::Email => r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$",
            FormatType::Url => r"^https?://[^\s/$.?#].[^\s]*$",
            FormatType::Phone => r"^\+?[0-9\s\-().]{7,20}$",
            FormatType::CreditCard => r"^[0-9]{13,19}$",
            FormatType::Ssn => r"^\d{3}-?\d{2}-?\d{4}$",
            FormatType::Ipv4 => r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}$",
            FormatType::Regex(pattern) => pattern,
        }
    }

    /// Resolves a format tag. `regex` needs a pattern.
    pub fn parse(name: &str, pattern: Option<&str>) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "email" => Ok(FormatType::Email),
            "url" => Ok(FormatType::Url),
            "phone" => Ok(FormatType::Phone),
            "credit_card" | "creditcard" => Ok(FormatType::CreditCard),
            "ssn" => Ok(FormatType::Ssn),
            "ipv4" => Ok(FormatType::Ipv4),
            "regex" => match pattern {
                Some(pattern) if !pattern.is_empty() => Ok(FormatType::Regex(pattern.to_string())),
                _ => Err(QualinkError::Configuration(
                    "format 'regex' requires a pattern".to_string(),
                )),
            },
            other => Err(QualinkError::Configuration(format!(
                "unknown format '{other}'; expected email, url, phone, credit_card, ssn, ipv4 or regex"
            ))),
        }
    }
}

impl fmt::Display for FormatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks that at least `threshold` of the non-null values have a format.
///
/// # Examples
///
/// ```rust
/// use qualink::constraints::{FormatConstraint, FormatType};
/// use qualink::core::Constraint;
///
/// let constraint = FormatConstraint::new("contact", FormatType::Email, 0.95).unwrap();
/// assert_eq!(constraint.name(), "Format(contact, email)");
///
/// let codes = FormatConstraint::new("code", FormatType::Regex(r"^[A-Z]{2}\d{4}$".into()), 1.0);
/// assert!(codes.is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct FormatConstraint {
    name: String,
    column: String,
    quoted: String,
    format: FormatType,
    escaped_pattern: String,
    assertion: Assertion,
    hint: Option<String>,
}

impl FormatConstraint {
    /// Creates a format constraint; `threshold` must be in `[0, 1]`.
    pub fn new(column: impl Into<String>, format: FormatType, threshold: f64) -> Result<Self> {
        let column = column.into();
        let quoted = SqlSecurity::escape_identifier(&column)?;
        let threshold = unit_interval(threshold, "threshold")?;
        let escaped_pattern = SqlSecurity::validate_regex_pattern(format.pattern())?;
        Ok(Self {
            name: format!("Format({column}, {format})"),
            column,
            quoted,
            format,
            escaped_pattern,
            assertion: Assertion::greater_than_or_equal(threshold),
            hint: None,
        })
    }

    /// Every non-null value must have the format.
    pub fn strict(column: impl Into<String>, format: FormatType) -> Result<Self> {
        Self::new(column, format, 1.0)
    }

    /// Appends advice to the failure message.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn format(&self) -> &FormatType {
        &self.format
    }
}

#[async_trait]
impl Constraint for FormatConstraint {
    #[instrument(skip(self, source), fields(constraint.name = %self.name))]
    async fn evaluate(&self, source: &dyn DataSource, table: &str) -> Result<ConstraintResult> {
        let value = match_ratio(source, table, &self.quoted, &self.escaped_pattern).await?;
        grade(&self.name, value, &self.assertion, self.hint.as_deref(), || {
            format!(
                "Format compliance of '{}' ({}) is {value:.4}",
                self.column, self.format
            )
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> ConstraintMetadata {
        ConstraintMetadata::for_column(&self.name, &self.column)
            .with_description(format!(
                "Format compliance of '{}' ({}) must satisfy {}",
                self.column, self.format, self.assertion
            ))
            .with_extra("format", self.format.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{people_source, source_from_sql};

    #[tokio::test]
    async fn test_email_format() {
        let source = people_source().await.unwrap();

        let strict = FormatConstraint::strict("email", FormatType::Email).unwrap();
        let result = strict.evaluate(source.as_ref(), "people").await.unwrap();
        assert!(result.status.is_failure());
        assert_eq!(result.metric, Some(0.75));
        assert_eq!(
            result.message,
            "Format compliance of 'email' (email) is 0.7500, expected >= 1.0"
        );

        let lenient = FormatConstraint::new("email", FormatType::Email, 0.7).unwrap();
        let result = lenient.evaluate(source.as_ref(), "people").await.unwrap();
        assert!(result.status.is_success());
    }

    #[tokio::test]
    async fn test_builtin_catalog() {
        let source = source_from_sql(&[
            "CREATE TABLE contacts (site VARCHAR, phone VARCHAR, card VARCHAR, ssn VARCHAR, ip VARCHAR)",
            "INSERT INTO contacts VALUES \
             ('https://example.com/a', '+1 (555) 123-4567', '4111111111111111', '123-45-6789', '10.0.0.1'), \
             ('ftp://example.com', 'call me', '4111-1111', '123456789', '10.0.0')",
        ])
        .await
        .unwrap();

        for (column, format) in [
            ("site", FormatType::Url),
            ("phone", FormatType::Phone),
            ("card", FormatType::CreditCard),
            ("ip", FormatType::Ipv4),
        ] {
            let result = FormatConstraint::strict(column, format)
                .unwrap()
                .evaluate(source.as_ref(), "contacts")
                .await
                .unwrap();
            assert_eq!(result.metric, Some(0.5), "{column}");
        }

        let ssn = FormatConstraint::strict("ssn", FormatType::Ssn)
            .unwrap()
            .evaluate(source.as_ref(), "contacts")
            .await
            .unwrap();
        assert!(ssn.status.is_success());
    }

    #[tokio::test]
    async fn test_custom_regex() {
        let source = people_source().await.unwrap();
        let format = FormatType::Regex(r"\.org$".to_string());
        let constraint = FormatConstraint::new("email", format, 0.25).unwrap();
        assert_eq!(constraint.name(), "Format(email, regex)");

        let result = constraint.evaluate(source.as_ref(), "people").await.unwrap();
        assert!(result.status.is_success());
        assert_eq!(result.metric, Some(0.25));
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(FormatType::parse("EMAIL", None).unwrap(), FormatType::Email);
        assert_eq!(
            FormatType::parse("credit_card", None).unwrap(),
            FormatType::CreditCard
        );
        assert!(FormatType::parse("regex", None).is_err());
        assert_eq!(
            FormatType::parse("regex", Some("^a")).unwrap(),
            FormatType::Regex("^a".to_string())
        );
        assert!(FormatType::parse("zip", None).is_err());
    }

    #[test]
    fn test_threshold_validated() {
        assert!(FormatConstraint::new("email", FormatType::Email, 1.5).is_err());
        assert!(FormatConstraint::new("email", FormatType::Regex("(".into()), 1.0).is_err());
    }
}
