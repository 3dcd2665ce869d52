//! Error types for SQLite operations.

use rusqlite::ErrorCode as SqliteCode;
use tether_query::error::{ErrorCode, QueryError};
use thiserror::Error;

/// Result type for SQLite operations.
pub type SqliteResult<T> = Result<T, SqliteError>;

/// `SQLITE_CONSTRAINT_FOREIGNKEY`
const CONSTRAINT_FOREIGNKEY: std::ffi::c_int = 787;
/// `SQLITE_CONSTRAINT_NOTNULL`
const CONSTRAINT_NOTNULL: std::ffi::c_int = 1299;

/// Error type for SQLite operations.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// Pool error.
    #[error("Pool error: {0}")]
    Pool(String),
    /// SQLite driver error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
    /// The store could not be opened or read.
    #[error("Connection error: {0}")]
    Connection(String),
    /// Type conversion error.
    #[error("Type conversion error: {0}")]
    TypeConversion(String),
}

impl SqliteError {
    /// Create a pool error.
    pub fn pool(msg: impl Into<String>) -> Self {
        Self::Pool(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a type conversion error.
    pub fn type_conversion(msg: impl Into<String>) -> Self {
        Self::TypeConversion(msg.into())
    }

    /// The underlying SQLite failure, if the driver reported one.
    fn sqlite_failure(&self) -> Option<(&rusqlite::ffi::Error, Option<&str>)> {
        match self {
            Self::Sqlite(tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(
                err,
                msg,
            ))) => Some((err, msg.as_deref())),
            _ => None,
        }
    }

    /// Check if the store itself could not be reached.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Sqlite(tokio_rusqlite::Error::ConnectionClosed) => true,
            _ => self.sqlite_failure().is_some_and(|(err, _)| {
                matches!(
                    err.code,
                    SqliteCode::CannotOpen
                        | SqliteCode::NotADatabase
                        | SqliteCode::PermissionDenied
                        | SqliteCode::ReadOnly
                        | SqliteCode::SystemIoFailure
                )
            }),
        }
    }
}

impl From<rusqlite::Error> for SqliteError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sqlite(tokio_rusqlite::Error::Rusqlite(err))
    }
}

impl From<SqliteError> for QueryError {
    fn from(err: SqliteError) -> Self {
        if err.is_unavailable() {
            let message = err.to_string();
            return QueryError::storage_unavailable(message).with_source(err);
        }

        if let Some((failure, msg)) = err.sqlite_failure() {
            let detail = msg.unwrap_or("constraint failed").to_string();
            let extended = failure.extended_code;
            match extended {
                CONSTRAINT_FOREIGNKEY => {
                    return QueryError::new(ErrorCode::ForeignKeyConstraint, detail)
                        .with_suggestion("Ensure the related record exists before creating this one")
                        .with_source(err);
                }
                CONSTRAINT_NOTNULL => {
                    return QueryError::new(ErrorCode::NotNullConstraint, detail).with_source(err);
                }
                _ => {}
            }
        }

        match err {
            SqliteError::Pool(msg) => QueryError::pool_exhausted(msg),
            SqliteError::Config(msg) => QueryError::invalid_connection_string(msg),
            SqliteError::TypeConversion(msg) => QueryError::deserialization(msg),
            other => {
                let message = other.to_string();
                QueryError::database(message).with_source(other)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(code: std::ffi::c_int) -> SqliteError {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), Some("boom".into())).into()
    }

    #[test]
    fn test_error_display() {
        let err = SqliteError::config("invalid path");
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("invalid path"));
    }

    #[test]
    fn test_cannot_open_is_storage_unavailable() {
        let err: QueryError = failure(rusqlite::ffi::SQLITE_CANTOPEN).into();
        assert_eq!(err.code, ErrorCode::StorageUnavailable);
        assert!(err.is_storage_unavailable());
    }

    #[test]
    fn test_closed_connection_is_storage_unavailable() {
        let err: QueryError = SqliteError::Sqlite(tokio_rusqlite::Error::ConnectionClosed).into();
        assert!(err.is_storage_unavailable());
    }

    #[test]
    fn test_constraint_codes_map_to_constraint_errors() {
        let fk: QueryError = failure(CONSTRAINT_FOREIGNKEY).into();
        assert_eq!(fk.code, ErrorCode::ForeignKeyConstraint);
        assert!(fk.is_constraint_violation());

        let not_null: QueryError = failure(CONSTRAINT_NOTNULL).into();
        assert_eq!(not_null.code, ErrorCode::NotNullConstraint);
    }

    #[test]
    fn test_other_failures_are_database_errors() {
        let err: QueryError = failure(rusqlite::ffi::SQLITE_ERROR).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);

        let err: QueryError = SqliteError::config("bad url").into();
        assert_eq!(err.code, ErrorCode::InvalidConnectionString);
        assert!(err.is_configuration());
    }
}
