//! Check severity levels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::QualinkError;

/// The severity level of a check.
///
/// Levels are ordered by severity: `Error > Warning > Info`. Only `Error`
/// and `Warning` checks escalate a suite's status when they contain a
/// failing constraint. `Info` checks are recorded in the report but never
/// change the outcome.
///
/// # Examples
///
/// ```rust
/// use qualink::core::Level;
///
/// assert!(Level::Error > Level::Warning);
/// assert!(Level::Warning > Level::Info);
/// assert_eq!("warning".parse::<Level>().unwrap(), Level::Warning);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Metrics and observations
    Info = 0,
    /// Issues worth reviewing that should not block processing
    Warning = 1,
    /// Critical data quality issues
    Error = 2,
}

impl Level {
    /// Returns the string representation of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }

    /// Checks if this level is at least as severe as another level.
    pub fn is_at_least(&self, other: Level) -> bool {
        *self >= other
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = QualinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "info" => Ok(Level::Info),
            "warning" | "warn" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            other => Err(QualinkError::Configuration(format!(
                "unknown level '{other}'; expected info, warning or error"
            ))),
        }
    }
}
