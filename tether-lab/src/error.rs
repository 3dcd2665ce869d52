//! Lab error types and result alias.

use miette::Diagnostic;
use tether_query::{ErrorKind, QueryError};
use thiserror::Error;

/// Result type alias for lab operations.
pub type LabResult<T> = Result<T, LabError>;

/// Lab error types.
#[derive(Error, Debug, Diagnostic)]
pub enum LabError {
    /// The database could not be reached.
    #[error("Storage unavailable")]
    #[diagnostic(
        code(tether::storage),
        help("check DATABASE_URL and that the database directory exists")
    )]
    Storage(#[source] QueryError),

    /// A loading or storage call failed.
    #[error("Query failed")]
    #[diagnostic(code(tether::query))]
    Query(#[source] QueryError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    #[diagnostic(code(tether::config))]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    #[diagnostic(code(tether::io))]
    Io(#[from] std::io::Error),

    /// A scenario observed something other than what it demonstrates.
    #[error("Scenario '{scenario}' failed: {message}")]
    #[diagnostic(code(tether::scenario))]
    Scenario { scenario: String, message: String },
}

impl LabError {
    /// Create a scenario error.
    pub fn scenario(scenario: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Scenario {
            scenario: scenario.into(),
            message: message.into(),
        }
    }
}

impl From<QueryError> for LabError {
    fn from(err: QueryError) -> Self {
        match err.kind() {
            ErrorKind::StorageUnavailable => Self::Storage(err),
            _ => Self::Query(err),
        }
    }
}

impl From<toml::de::Error> for LabError {
    fn from(err: toml::de::Error) -> Self {
        LabError::Config(format!("Failed to parse TOML: {}", err))
    }
}
