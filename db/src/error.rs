//! Error types for the data access layer

use thiserror::Error;

/// Errors surfaced by the data access layer.
///
/// Connection problems and statement problems are distinct variants so
/// callers can react to an unreachable database differently from a bad
/// query, instead of discovering the difference through a secondary
/// failure.
#[derive(Debug, Error)]
pub enum DbError {
    /// Database unreachable or credentials rejected
    #[error("cannot connect to database: {0}")]
    Connection(#[source] sqlx::Error),

    /// Connection attempt exceeded the configured timeout
    #[error("connection attempt timed out after {0}s")]
    Timeout(u64),

    /// Statement execution failure (syntax, constraint, or type errors)
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    /// Configuration error (malformed connection URL and similar)
    #[error("configuration error: {0}")]
    Config(String),

    /// Statement/parameter mismatch (unknown placeholder, missing value)
    #[error("statement error: {0}")]
    Statement(String),
}

impl DbError {
    /// Whether this error was raised while establishing the connection,
    /// before any statement ran.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, DbError::Connection(_) | DbError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        let err = DbError::Config("invalid database URL: bad scheme".to_string());
        assert!(err.to_string().contains("configuration error"));

        let err = DbError::Statement("no parameter named `id`".to_string());
        assert!(err.to_string().contains("statement error"));

        let err = DbError::Timeout(5);
        assert_eq!(err.to_string(), "connection attempt timed out after 5s");
    }

    #[test]
    fn test_connection_failure_classification() {
        assert!(DbError::Timeout(1).is_connection_failure());
        assert!(!DbError::Config("x".into()).is_connection_failure());
        assert!(!DbError::Statement("x".into()).is_connection_failure());
    }
}
