//! Error types for configuration loading.
//!
//! # Design
//! - Keep error messages constant while carrying context fields for operators.
//! - A single load reports every issue it finds; `ConfigErrors` owns that list.

use std::fmt::{self, Display, Formatter};
use std::io;

use thiserror::Error;

/// Value shape a configuration field expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Free-form text.
    String,
    /// Whole number.
    Integer,
    /// Boolean flag.
    Boolean,
    /// Sequence of text entries (comma-separated when supplied as text).
    List,
}

impl ValueKind {
    /// Render the kind as its lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::List => "list",
        }
    }
}

impl Display for ValueKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Individual configuration issue detected while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field without a default was not supplied by any source.
    #[error("missing required configuration field")]
    MissingRequired {
        /// Canonical field key.
        field: &'static str,
        /// Environment variable that maps to the field.
        env: &'static str,
    },
    /// A supplied value could not be converted to the field type.
    #[error("configuration value has the wrong type")]
    TypeMismatch {
        /// Key exactly as written by the source that supplied the value.
        field: String,
        /// Type the field expects.
        expected: ValueKind,
        /// Offending raw value.
        got: String,
    },
    /// A value had the right type but broke a field constraint.
    #[error("configuration value violates a constraint")]
    ConstraintViolation {
        /// Key exactly as written by the source (canonical key for cross-field rules).
        field: String,
        /// Machine-readable rule that failed.
        rule: &'static str,
    },
    /// A key did not match any known field.
    #[error("unknown configuration key")]
    UnknownKey {
        /// Key as written by the source.
        key: String,
        /// Source the key came from.
        origin: String,
    },
    /// A source document could not be interpreted.
    #[error("configuration source is malformed")]
    MalformedSource {
        /// Source identifier (file path or label).
        origin: String,
        /// Parser detail.
        reason: String,
    },
    /// A source file could not be read.
    #[error("configuration source could not be read")]
    Unreadable {
        /// File path that failed.
        origin: String,
        /// Source IO error.
        source: io::Error,
    },
}

impl ConfigError {
    /// Field or key the issue refers to, when there is one.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingRequired { field, .. } => Some(field),
            Self::TypeMismatch { field, .. } | Self::ConstraintViolation { field, .. } => {
                Some(field)
            }
            Self::UnknownKey { key, .. } => Some(key),
            Self::MalformedSource { .. } | Self::Unreadable { .. } => None,
        }
    }

    /// One-line operator-facing description including the context fields.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::MissingRequired { field, env } => {
                format!("{field}: required (set {env})")
            }
            Self::TypeMismatch {
                field,
                expected,
                got,
            } => format!("{field}: expected {expected}, got '{got}'"),
            Self::ConstraintViolation { field, rule } => format!("{field}: {rule}"),
            Self::UnknownKey { key, origin } => format!("{key}: unknown key in {origin}"),
            Self::MalformedSource { origin, reason } => format!("{origin}: {reason}"),
            Self::Unreadable { origin, source } => format!("{origin}: {source}"),
        }
    }
}

/// Every issue reported by one load attempt.
#[derive(Debug)]
pub struct ConfigErrors {
    issues: Vec<ConfigError>,
}

impl ConfigErrors {
    pub(crate) const fn new(issues: Vec<ConfigError>) -> Self {
        Self { issues }
    }

    /// Issues in the order they were detected.
    #[must_use]
    pub fn issues(&self) -> &[ConfigError] {
        &self.issues
    }

    /// Number of issues collected.
    #[must_use]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Whether no issues were collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Consume the report and return the underlying issues.
    #[must_use]
    pub fn into_issues(self) -> Vec<ConfigError> {
        self.issues
    }

    /// Render all issues as `; `-separated descriptions.
    #[must_use]
    pub fn summary(&self) -> String {
        self.issues
            .iter()
            .map(ConfigError::describe)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl From<ConfigError> for ConfigErrors {
    fn from(issue: ConfigError) -> Self {
        Self::new(vec![issue])
    }
}

impl Display for ConfigErrors {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "invalid configuration ({} issues)", self.issues.len())
    }
}

impl std::error::Error for ConfigErrors {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.issues
            .first()
            .map(|issue| issue as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn describe_includes_context_fields() {
        let mismatch = ConfigError::TypeMismatch {
            field: "DB_PORT".to_string(),
            expected: ValueKind::Integer,
            got: "abc".to_string(),
        };
        assert_eq!(mismatch.describe(), "DB_PORT: expected integer, got 'abc'");
        assert_eq!(mismatch.field(), Some("DB_PORT"));
        assert_eq!(mismatch.to_string(), "configuration value has the wrong type");

        let missing = ConfigError::MissingRequired {
            field: "db_host",
            env: "DB_HOST",
        };
        assert_eq!(missing.describe(), "db_host: required (set DB_HOST)");
    }

    #[test]
    fn report_exposes_first_issue_as_source() {
        let report = ConfigErrors::new(vec![
            ConfigError::UnknownKey {
                key: "db_prot".to_string(),
                origin: "config.yml".to_string(),
            },
            ConfigError::ConstraintViolation {
                field: "app_port".to_string(),
                rule: "must be between 1 and 65535",
            },
        ]);
        assert_eq!(report.len(), 2);
        assert_eq!(report.to_string(), "invalid configuration (2 issues)");
        assert!(report.source().is_some());
        assert_eq!(
            report.summary(),
            "db_prot: unknown key in config.yml; app_port: must be between 1 and 65535"
        );
    }
}
