/// Structured error types for the quill database layer.
///
/// Library consumers get one tagged error value per failed call. Errors raised
/// by the underlying store pass through as `Driver` with the original error
/// kept as the source, so callers can downcast to the driver's own type.
use thiserror::Error;

use crate::driver::BoxError;

/// Main error type for quill-db operations
#[derive(Error, Debug)]
pub enum DbError {
    /// A global engine was already created in this process
    #[error("Engine is already initialized")]
    EngineAlreadyInitialized,

    /// No global engine has been created yet
    #[error("Engine is not initialized")]
    EngineNotInitialized,

    /// Opening the physical connection failed
    #[error("Failed to connect to database: {source}")]
    ConnectFailed { source: BoxError },

    /// Commit or rollback requested on a lazy connection that never opened
    #[error("Connection was never opened")]
    NotConnected,

    /// Context state used while it holds no connection
    #[error("Database context is not active")]
    NotActive,

    /// Context state activated twice
    #[error("Database context is already active")]
    AlreadyActive,

    /// The thread-local context is already borrowed further up the stack
    #[error("Thread-local database context is already in use")]
    ContextBusy,

    /// A scalar query produced more (or fewer) than one column
    #[error("Expected exactly one column, query returned {columns}")]
    MultiColumns { columns: usize },

    /// A scalar query produced no rows
    #[error("Query returned no rows")]
    NoRows,

    /// Commit failed; the transaction has been rolled back
    #[error("Commit failed: {source}")]
    CommitFailed { source: BoxError },

    /// Statement could not be built from the supplied input
    #[error("Invalid statement: {reason}")]
    InvalidStatement { reason: String },

    /// Error reported by the underlying store
    #[error("Database error: {source}")]
    Driver {
        #[from]
        source: BoxError,
    },

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Config { reason: String },
}

/// Result type alias for quill-db operations
pub type Result<T> = std::result::Result<T, DbError>;

impl DbError {
    /// Create a connect error from any driver error
    pub fn connect_failed(source: impl Into<BoxError>) -> Self {
        Self::ConnectFailed {
            source: source.into(),
        }
    }

    /// Create a commit error from any driver error
    pub fn commit_failed(source: impl Into<BoxError>) -> Self {
        Self::CommitFailed {
            source: source.into(),
        }
    }

    /// Wrap an error reported by the store
    pub fn driver(source: impl Into<BoxError>) -> Self {
        Self::Driver {
            source: source.into(),
        }
    }

    /// Create an invalid statement error
    pub fn invalid_statement(reason: impl Into<String>) -> Self {
        Self::InvalidStatement {
            reason: reason.into(),
        }
    }

    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Borrow the driver's own error, if this error came from the store.
    pub fn driver_error<T: std::error::Error + 'static>(&self) -> Option<&T> {
        match self {
            Self::Driver { source } | Self::ConnectFailed { source } | Self::CommitFailed { source } => {
                source.downcast_ref::<T>()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_display() {
        let err = DbError::MultiColumns { columns: 3 };
        assert_eq!(
            err.to_string(),
            "Expected exactly one column, query returned 3"
        );

        let err = DbError::invalid_statement("no fields to insert");
        assert!(err.to_string().contains("Invalid statement"));
        assert!(err.to_string().contains("no fields"));
    }

    #[test]
    fn test_driver_error_downcast() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "socket gone");
        let err = DbError::connect_failed(io_err);

        assert!(matches!(err, DbError::ConnectFailed { .. }));
        let inner = err.driver_error::<io::Error>().unwrap();
        assert_eq!(inner.kind(), io::ErrorKind::NotFound);
        assert!(err.driver_error::<std::fmt::Error>().is_none());
    }

    #[test]
    fn test_box_error_conversion() {
        let boxed: BoxError = "syntax error near FROM".into();
        let err: DbError = boxed.into();

        assert!(matches!(err, DbError::Driver { .. }));
        assert!(err.to_string().contains("syntax error"));
    }
}
