//! Error types for the load pipeline.

use thiserror::Error;

/// Errors raised while extracting, transforming or loading one file.
#[derive(Debug, Error)]
pub enum EtlError {
    /// A record failed to parse or lacks a required field.
    #[error("malformed record at line {line}: {message}")]
    MalformedRecord { line: usize, message: String },

    /// Storage rejected a row (not-null, foreign key, type coercion).
    #[error("constraint violation in {table} at row {row}: {message}")]
    ConstraintViolation {
        table: &'static str,
        row: usize,
        message: String,
    },

    /// The store is unreachable or unusable.
    #[error("storage unavailable: {0}")]
    ConnectionFailure(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error propagated from the core storage layer.
    #[error("database error: {0}")]
    Database(#[from] songplay_core::Error),
}

impl EtlError {
    pub(crate) fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            message: message.into(),
        }
    }

    /// Map a storage error raised while loading `row` of `table`.
    pub(crate) fn storage(table: &'static str, row: usize, err: rusqlite::Error) -> Self {
        if songplay_core::error::is_connection_failure(&err) {
            Self::ConnectionFailure(err.to_string())
        } else {
            Self::ConstraintViolation {
                table,
                row,
                message: err.to_string(),
            }
        }
    }

    /// Returns `true` when the whole run must stop rather than skip a file.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::ConnectionFailure(_) => true,
            Self::Database(e) => e.is_connection_failure(),
            _ => false,
        }
    }

    /// Returns `true` when re-running the file's transaction may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConstraintViolation { .. } | Self::Database(_)) && !self.is_fatal()
    }
}

/// Convenience alias for pipeline results.
pub type EtlResult<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_is_neither_fatal_nor_retryable() {
        let err = EtlError::malformed(3, "missing field `title`");
        assert!(!err.is_fatal());
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "malformed record at line 3: missing field `title`");
    }

    #[test]
    fn test_connection_failure_is_fatal() {
        let err = EtlError::ConnectionFailure("disk I/O error".to_string());
        assert!(err.is_fatal());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_constraint_violation_is_retryable() {
        let err = EtlError::ConstraintViolation {
            table: "songs",
            row: 1,
            message: "NOT NULL constraint failed: songs.title".to_string(),
        };
        assert!(!err.is_fatal());
        assert!(err.is_retryable());
    }
}
