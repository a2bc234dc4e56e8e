//! Error handling module for the planner.
//!
//! Provides the crate-wide error type with stable error codes for callers that surface
//! failures to users.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const SCHEMA_ERROR: &str = "SCHEMA_ERROR";
    pub const REFERENCE_ERROR: &str = "REFERENCE_ERROR";
    pub const INVALID_DATE: &str = "INVALID_DATE";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const JSON_ERROR: &str = "JSON_ERROR";
    pub const IO_ERROR: &str = "IO_ERROR";
    pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PlannerError>;

/// One problem found while checking an import payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaIssue {
    /// Path into the payload, e.g. `topics[3]` or `logs`.
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Application error type.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Input rejected before any mutation
    #[error("{0}")]
    Validation(String),

    /// Import payload is not a snapshot
    #[error("invalid snapshot payload ({} issue(s)): {}", .issues.len(), join_issues(.issues))]
    Schema { issues: Vec<SchemaIssue> },

    /// A cross-reference could not be resolved
    #[error("unresolved reference: {0}")]
    Reference(String),

    /// Malformed calendar date
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    /// Entity not found
    #[error("{0}")]
    NotFound(String),

    /// Persistence failure
    #[error("database error: {0}")]
    Database(String),

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(String),

    /// File system failure
    #[error("IO error: {0}")]
    Io(String),

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),
}

fn join_issues(issues: &[SchemaIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl PlannerError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            PlannerError::Validation(_) => codes::VALIDATION_ERROR,
            PlannerError::Schema { .. } => codes::SCHEMA_ERROR,
            PlannerError::Reference(_) => codes::REFERENCE_ERROR,
            PlannerError::InvalidDate(_) => codes::INVALID_DATE,
            PlannerError::NotFound(_) => codes::NOT_FOUND,
            PlannerError::Database(_) => codes::DATABASE_ERROR,
            PlannerError::Json(_) => codes::JSON_ERROR,
            PlannerError::Io(_) => codes::IO_ERROR,
            PlannerError::Config(_) => codes::CONFIG_ERROR,
        }
    }

    /// Shorthand for a schema error carrying a single issue.
    pub fn schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        PlannerError::Schema {
            issues: vec![SchemaIssue {
                path: path.into(),
                message: message.into(),
            }],
        }
    }
}

impl From<sqlx::Error> for PlannerError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        PlannerError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for PlannerError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        PlannerError::Json(err.to_string())
    }
}

impl From<std::io::Error> for PlannerError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("IO error: {:?}", err);
        PlannerError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_lists_every_issue() {
        let err = PlannerError::Schema {
            issues: vec![
                SchemaIssue {
                    path: "teams".to_string(),
                    message: "missing".to_string(),
                },
                SchemaIssue {
                    path: "logs".to_string(),
                    message: "expected an array".to_string(),
                },
            ],
        };

        let text = err.to_string();
        assert!(text.contains("2 issue(s)"));
        assert!(text.contains("teams: missing"));
        assert!(text.contains("logs: expected an array"));
        assert_eq!(err.error_code(), codes::SCHEMA_ERROR);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PlannerError::Validation("x".into()).error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            PlannerError::InvalidDate("2025-13-01".into()).error_code(),
            "INVALID_DATE"
        );
    }
}
