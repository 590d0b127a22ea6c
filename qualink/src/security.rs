//! SQL hardening for generated validation queries.
//!
//! Every query qualink issues is a template filled with user-supplied column
//! names, table names, regex patterns and predicate expressions. The helpers
//! here are the only way those values reach SQL text.

use crate::error::{QualinkError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

const MAX_IDENTIFIER_LENGTH: usize = 128;
const MAX_PATTERN_LENGTH: usize = 1000;
const MAX_EXPRESSION_LENGTH: usize = 5000;

/// SQL security utilities.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Quotes a column name for use in SQL.
    ///
    /// Column names are always double-quoted, so any character is allowed
    /// except NUL. Embedded double quotes are doubled.
    ///
    /// # Examples
    /// ```rust
    /// use qualink::security::SqlSecurity;
    ///
    /// assert_eq!(SqlSecurity::escape_identifier("user_id").unwrap(), "\"user_id\"");
    /// assert_eq!(SqlSecurity::escape_identifier("a\"b").unwrap(), "\"a\"\"b\"");
    /// assert!(SqlSecurity::escape_identifier("  ").is_err());
    /// ```
    pub fn escape_identifier(identifier: &str) -> Result<String> {
        if identifier.trim().is_empty() {
            return Err(QualinkError::SecurityError(
                "SQL identifier cannot be empty or whitespace-only".to_string(),
            ));
        }

        if identifier.len() > MAX_IDENTIFIER_LENGTH {
            return Err(QualinkError::SecurityError(format!(
                "SQL identifier too long (max {MAX_IDENTIFIER_LENGTH} characters)"
            )));
        }

        if identifier.contains('\0') {
            return Err(QualinkError::SecurityError(
                "SQL identifier cannot contain null bytes".to_string(),
            ));
        }

        let escaped = identifier.replace('"', "\"\"");
        Ok(format!("\"{escaped}\""))
    }

    /// Validates a table name that is interpolated into `FROM` unquoted.
    ///
    /// Accepts plain or dot-qualified names made of letters, digits and
    /// underscores, starting with a letter or underscore.
    pub fn validate_table_name(table: &str) -> Result<()> {
        static TABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
            // Hard-coded pattern, known to compile
            #[allow(clippy::expect_used)]
            Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*$")
                .expect("Hard-coded regex pattern should be valid")
        });

        if table.len() > MAX_IDENTIFIER_LENGTH {
            return Err(QualinkError::SecurityError(format!(
                "Table name too long (max {MAX_IDENTIFIER_LENGTH} characters)"
            )));
        }

        if !TABLE_REGEX.is_match(table) {
            return Err(QualinkError::SecurityError(format!(
                "Invalid table name: '{table}'. Table names must start with a letter or underscore and contain only letters, numbers, underscores, and dots"
            )));
        }

        Ok(())
    }

    /// Validates a regex pattern and escapes it for use inside a SQL string literal.
    pub fn validate_regex_pattern(pattern: &str) -> Result<String> {
        if pattern.len() > MAX_PATTERN_LENGTH {
            return Err(QualinkError::SecurityError(format!(
                "Regex pattern too long (max {MAX_PATTERN_LENGTH} characters)"
            )));
        }

        if pattern.contains('\0') {
            return Err(QualinkError::SecurityError(
                "Regex pattern cannot contain null bytes".to_string(),
            ));
        }

        if let Err(e) = Regex::new(pattern) {
            return Err(QualinkError::Configuration(format!(
                "Invalid regex pattern: {e}"
            )));
        }

        for dangerous in ["(.*)*", "(.*)+", "(a+)+", "(a*)*"] {
            if pattern.contains(dangerous) {
                return Err(QualinkError::SecurityError(
                    "Regex pattern might cause catastrophic backtracking".to_string(),
                ));
            }
        }

        Ok(Self::escape_literal(pattern))
    }

    /// Escapes a value for use inside a single-quoted SQL string literal.
    pub fn escape_literal(value: &str) -> String {
        value.replace('\'', "''")
    }

    /// Screens a user-supplied boolean predicate before it is embedded in a query.
    ///
    /// Keywords are matched as whole words, so columns such as `created_at`
    /// or `updated_by` are fine while `DROP TABLE x` is not. String literals
    /// and quoted identifiers are blanked before scanning, so `note <> '--'`
    /// and `"commit" IS NOT NULL` pass.
    pub fn validate_sql_expression(expression: &str) -> Result<()> {
        if expression.trim().is_empty() {
            return Err(QualinkError::Configuration(
                "SQL expression cannot be empty".to_string(),
            ));
        }

        if expression.len() > MAX_EXPRESSION_LENGTH {
            return Err(QualinkError::SecurityError(format!(
                "SQL expression too long (max {MAX_EXPRESSION_LENGTH} characters)"
            )));
        }

        if expression.contains('\0') {
            return Err(QualinkError::SecurityError(
                "SQL expression cannot contain null bytes".to_string(),
            ));
        }

        let masked = Self::mask_quoted(expression)?;

        for marker in [";", "--", "/*", "*/"] {
            if masked.contains(marker) {
                return Err(QualinkError::SecurityError(format!(
                    "SQL expression contains forbidden token: '{marker}'"
                )));
            }
        }

        static DANGEROUS_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
            // Hard-coded pattern, known to compile
            #[allow(clippy::expect_used)]
            Regex::new(
                r"(?i)\b(drop|create|alter|truncate|insert|update|delete|merge|grant|revoke|exec|execute|declare|cursor|commit|rollback|copy|attach|detach|information_schema|load_file|openrowset|opendatasource|outfile|dumpfile)\b",
            )
            .expect("Hard-coded regex pattern should be valid")
        });
        if let Some(found) = DANGEROUS_KEYWORDS.find(&masked) {
            return Err(QualinkError::SecurityError(format!(
                "SQL expression contains dangerous keyword: '{}'",
                found.as_str().to_lowercase()
            )));
        }

        static SUBQUERY: Lazy<Regex> = Lazy::new(|| {
            // Hard-coded pattern, known to compile
            #[allow(clippy::expect_used)]
            Regex::new(r"(?i)(\(\s*select\b|\bunion\b)")
                .expect("Hard-coded regex pattern should be valid")
        });
        if SUBQUERY.is_match(&masked) {
            return Err(QualinkError::SecurityError(
                "SQL expression may not contain subqueries or UNION".to_string(),
            ));
        }

        Ok(())
    }

    /// Replaces the contents of `'...'` literals and `"..."` identifiers with
    /// spaces, keeping the quotes. A doubled quote inside either form is an
    /// escaped quote.
    fn mask_quoted(expression: &str) -> Result<String> {
        let mut masked = String::with_capacity(expression.len());
        let mut chars = expression.chars().peekable();
        let mut open: Option<char> = None;

        while let Some(c) = chars.next() {
            match open {
                None => {
                    if c == '\'' || c == '"' {
                        open = Some(c);
                    }
                    masked.push(c);
                }
                Some(quote) if c == quote => {
                    if chars.peek() == Some(&quote) {
                        chars.next();
                        masked.push_str("  ");
                    } else {
                        open = None;
                        masked.push(c);
                    }
                }
                Some(_) => masked.push(' '),
            }
        }

        if let Some(quote) = open {
            return Err(QualinkError::SecurityError(format!(
                "SQL expression contains an unterminated {quote} quote"
            )));
        }

        Ok(masked)
    }
}
