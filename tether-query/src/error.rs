//! Error types for relationship loading with actionable messages.
//!
//! Every error carries an [`ErrorCode`] for programmatic handling and an
//! [`ErrorKind`] that groups codes into the handful of situations callers
//! actually react to:
//!
//! - [`ErrorKind::StorageUnavailable`]: the store could not be reached or opened.
//! - [`ErrorKind::InvalidOperation`]: the call is not valid in the current state,
//!   e.g. lazy access after the owning session was released.
//! - [`ErrorKind::Configuration`]: an unknown model, relation, or include path.
//!
//! # Error Codes
//!
//! Error codes follow a pattern: T{category}{number}
//! - 1xxx: Query errors (not found, invalid include, invalid operation)
//! - 2xxx: Constraint violations (foreign key, not null)
//! - 3xxx: Storage errors (unreachable store, pool)
//! - 5xxx: Execution errors (syntax, general database)
//! - 6xxx: Data errors (type, deserialization)
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use tether_query::{ErrorCode, ErrorKind, QueryError};
//!
//! let err = QueryError::unknown_relation("User", "employer");
//! assert_eq!(err.code, ErrorCode::UnknownRelation);
//! assert_eq!(err.kind(), ErrorKind::Configuration);
//! assert!(err.to_string().contains("employer"));
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Query errors (1xxx)
    /// Record not found (T1001).
    RecordNotFound = 1001,
    /// Invalid filter or where clause (T1003).
    InvalidFilter = 1003,
    /// Invalid include or relation path (T1004).
    InvalidInclude = 1004,
    /// Operation not valid in the current state (T1006).
    InvalidOperation = 1006,

    // Constraint errors (2xxx)
    /// Unique constraint violation (T2001).
    UniqueConstraint = 2001,
    /// Foreign key constraint violation (T2002).
    ForeignKeyConstraint = 2002,
    /// Not null constraint violation (T2004).
    NotNullConstraint = 2004,

    // Storage errors (3xxx)
    /// The store is unreachable or could not be opened (T3001).
    StorageUnavailable = 3001,
    /// Connection pool exhausted (T3002).
    PoolExhausted = 3002,

    // Query execution errors (5xxx)
    /// SQL syntax error (T5002).
    SqlSyntax = 5002,
    /// General database error (T5005).
    DatabaseError = 5005,

    // Data errors (6xxx)
    /// Invalid data type (T6001).
    InvalidDataType = 6001,
    /// Deserialization error (T6003).
    DeserializationError = 6003,

    // Configuration errors (7xxx)
    /// Invalid configuration (T7001).
    InvalidConfiguration = 7001,
    /// Invalid connection string (T7003).
    InvalidConnectionString = 7003,
    /// Relation is not declared on the model (T7004).
    UnknownRelation = 7004,
    /// Model is not registered with the schema (T7005).
    UnknownModel = 7005,

    // Internal errors (9xxx)
    /// Internal error (T9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "T1001").
    pub fn code(&self) -> String {
        format!("T{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RecordNotFound => "Record not found",
            Self::InvalidFilter => "Invalid filter condition",
            Self::InvalidInclude => "Invalid include",
            Self::InvalidOperation => "Invalid operation",
            Self::UniqueConstraint => "Unique constraint violation",
            Self::ForeignKeyConstraint => "Foreign key constraint violation",
            Self::NotNullConstraint => "Not null constraint violation",
            Self::StorageUnavailable => "Storage unavailable",
            Self::PoolExhausted => "Connection pool exhausted",
            Self::SqlSyntax => "SQL syntax error",
            Self::DatabaseError => "Database error",
            Self::InvalidDataType => "Invalid data type",
            Self::DeserializationError => "Deserialization error",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::InvalidConnectionString => "Invalid connection string",
            Self::UnknownRelation => "Unknown relation",
            Self::UnknownModel => "Unknown model",
            Self::Internal => "Internal error",
        }
    }

    /// Get the kind this code belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StorageUnavailable | Self::PoolExhausted => ErrorKind::StorageUnavailable,
            Self::InvalidOperation => ErrorKind::InvalidOperation,
            Self::InvalidConfiguration
            | Self::InvalidConnectionString
            | Self::UnknownRelation
            | Self::UnknownModel
            | Self::InvalidInclude
            | Self::InvalidFilter => ErrorKind::Configuration,
            Self::UniqueConstraint | Self::ForeignKeyConstraint | Self::NotNullConstraint => {
                ErrorKind::Constraint
            }
            Self::RecordNotFound
            | Self::SqlSyntax
            | Self::DatabaseError
            | Self::InvalidDataType
            | Self::DeserializationError => ErrorKind::Data,
            Self::Internal => ErrorKind::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Coarse classification of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The store is unreachable; aborts the run.
    StorageUnavailable,
    /// The call is not valid in the current state; recoverable through a live session.
    InvalidOperation,
    /// Unknown model, relation, or path; should never occur once the schema is validated.
    Configuration,
    /// A store-enforced constraint rejected a write.
    Constraint,
    /// The store returned an error or data that could not be decoded.
    Data,
    /// A bug in the loader.
    Internal,
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
    /// Optional code example.
    pub code: Option<String>,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
        }
    }

    /// Add a code example.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The model involved.
    pub model: Option<String>,
    /// The field or relation involved.
    pub field: Option<String>,
    /// The SQL query (if available).
    pub sql: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur during loading.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
        self
    }

    /// Add a code suggestion.
    pub fn with_code_suggestion(mut self, text: impl Into<String>, code: impl Into<String>) -> Self {
        self.context
            .suggestions
            .push(Suggestion::new(text).with_code(code));
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.context.model = Some(model.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the SQL query.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create a not found error.
    pub fn not_found(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("No {} record found matching the query", model),
        )
        .with_model(&model)
        .with_code_suggestion(
            "Use first() to get None instead of an error",
            format!("session.query::<{}>().first().await", model),
        )
    }

    /// Create an error for a relation that is not declared on a model.
    pub fn unknown_relation(model: impl Into<String>, relation: impl Into<String>) -> Self {
        let model = model.into();
        let relation = relation.into();
        Self::new(
            ErrorCode::UnknownRelation,
            format!("{} has no relation named '{}'", model, relation),
        )
        .with_model(&model)
        .with_field(&relation)
        .with_suggestion(format!(
            "Declare '{}' in {}::describe() or check the spelling",
            relation, model
        ))
    }

    /// Create an error for a model that is not registered with the schema.
    pub fn unknown_model(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::UnknownModel,
            format!("Model '{}' is not registered with the schema", model),
        )
        .with_model(&model)
        .with_code_suggestion(
            "Register the model when building the session factory",
            format!("SessionFactory::builder(engine).register::<{}>()", model),
        )
    }

    /// Create an invalid include error.
    pub fn invalid_include(model: impl Into<String>, message: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(ErrorCode::InvalidInclude, message.into()).with_model(&model)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message.into())
    }

    /// Create an invalid filter error.
    pub fn invalid_filter(model: impl Into<String>, field: impl Into<String>) -> Self {
        let model = model.into();
        let field = field.into();
        Self::new(
            ErrorCode::InvalidFilter,
            format!("{} has no column named '{}'", model, field),
        )
        .with_model(&model)
        .with_field(&field)
    }

    /// Create an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidOperation, message.into())
    }

    /// Create the error returned when a released session is used.
    pub fn session_closed(relation: impl Into<String>) -> Self {
        let relation = relation.into();
        Self::new(
            ErrorCode::InvalidOperation,
            format!(
                "Cannot load '{}': the context that loaded this entity is no longer available",
                relation
            ),
        )
        .with_field(&relation)
        .with_suggestion("Load the relation before closing the session")
        .with_suggestion("Re-fetch the entity through an open session")
        .with_help("Lazy relations keep only a weak link to their session")
    }

    /// Create the error returned when an unloaded relation is accessed with lazy loading disabled.
    pub fn lazy_loading_disabled(relation: impl Into<String>) -> Self {
        let relation = relation.into();
        Self::new(
            ErrorCode::InvalidOperation,
            format!(
                "Relation '{}' is not loaded and lazy loading is disabled",
                relation
            ),
        )
        .with_field(&relation)
        .with_code_suggestion(
            "Include the relation eagerly",
            format!("query.include(\"{}\")", relation),
        )
        .with_code_suggestion(
            "Or load it explicitly",
            format!("session.entry(&entity).load(\"{}\").await", relation),
        )
    }

    /// Create a foreign key violation error.
    pub fn foreign_key_violation(model: impl Into<String>, message: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::ForeignKeyConstraint,
            format!("Foreign key constraint violated on {}: {}", model, message.into()),
        )
        .with_model(&model)
        .with_suggestion("Ensure the related record exists before creating this one")
    }

    /// Create a not null violation error.
    pub fn not_null_violation(model: impl Into<String>, message: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::NotNullConstraint,
            format!("Not null constraint violated on {}: {}", model, message.into()),
        )
        .with_model(&model)
    }

    /// Create a storage unavailable error.
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::StorageUnavailable,
            format!("Storage unavailable: {}", message),
        )
        .with_suggestion("Check that the database file exists and is readable")
        .with_suggestion("Verify the connection URL is correct")
    }

    /// Create a pool exhausted error.
    pub fn pool_exhausted(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::PoolExhausted,
            format!("Connection pool exhausted: {}", message.into()),
        )
        .with_suggestion("Ensure connections are being released properly")
    }

    /// Create an invalid connection string error.
    pub fn invalid_connection_string(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidConnectionString,
            format!("Invalid connection string: {}", message.into()),
        )
    }

    /// Create an SQL syntax error.
    pub fn sql_syntax(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::SqlSyntax,
            format!("SQL syntax error: {}", message.into()),
        )
        .with_sql(sql)
        .with_help("This is likely a bug in the query planner")
    }

    /// Create a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::DeserializationError,
            format!("Failed to deserialize result: {}", message.into()),
        )
        .with_suggestion("Check that the model matches the database schema")
    }

    /// Create a general database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message.into()))
    }

    // ============== Error Checks ==============

    /// Get the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::RecordNotFound
    }

    /// Check if the store was unreachable.
    pub fn is_storage_unavailable(&self) -> bool {
        self.kind() == ErrorKind::StorageUnavailable
    }

    /// Check if the operation was invalid in the current state.
    pub fn is_invalid_operation(&self) -> bool {
        self.kind() == ErrorKind::InvalidOperation
    }

    /// Check if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    /// Check if this is a constraint violation.
    pub fn is_constraint_violation(&self) -> bool {
        self.kind() == ErrorKind::Constraint
    }

    // ============== Display Functions ==============

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref model) = self.context.model {
            output.push_str(&format!("  → Model: {}\n", model));
        }
        if let Some(ref field) = self.context.field {
            output.push_str(&format!("  → Field: {}\n", field));
        }

        // SQL (truncated if too long)
        if let Some(ref sql) = self.context.sql {
            let sql_display = if sql.chars().count() > 200 {
                format!("{}...", sql.chars().take(200).collect::<String>())
            } else {
                sql.clone()
            };
            output.push_str(&format!("  → SQL: {}\n", sql_display));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion.text));
                if let Some(ref code) = suggestion.code {
                    output.push_str(&format!(
                        "     ```\n     {}\n     ```\n",
                        code.replace('\n', "\n     ")
                    ));
                }
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

/// Helper for creating errors with context.
#[macro_export]
macro_rules! query_error {
    ($code:expr, $msg:expr) => {
        $crate::error::QueryError::new($code, $msg)
    };
    ($code:expr, $msg:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        let mut err = $crate::error::QueryError::new($code, $msg);
        $(
            err = err.$key($value);
        )+
        err
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::RecordNotFound.code(), "T1001");
        assert_eq!(ErrorCode::InvalidOperation.code(), "T1006");
        assert_eq!(ErrorCode::StorageUnavailable.code(), "T3001");
        assert_eq!(ErrorCode::UnknownRelation.code(), "T7004");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            QueryError::storage_unavailable("gone").kind(),
            ErrorKind::StorageUnavailable
        );
        assert_eq!(
            QueryError::session_closed("company").kind(),
            ErrorKind::InvalidOperation
        );
        assert_eq!(
            QueryError::unknown_relation("User", "x").kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            QueryError::invalid_include("User", "bad path").kind(),
            ErrorKind::Configuration
        );
        assert!(QueryError::foreign_key_violation("User", "fk").is_constraint_violation());
        assert_eq!(QueryError::database("boom").kind(), ErrorKind::Data);
    }

    #[test]
    fn test_session_closed_error() {
        let err = QueryError::session_closed("company");
        assert!(err.is_invalid_operation());
        assert!(err.message.contains("no longer available"));
        assert_eq!(err.context.field, Some("company".to_string()));
        assert!(err.context.help.is_some());
    }

    #[test]
    fn test_lazy_loading_disabled_error() {
        let err = QueryError::lazy_loading_disabled("users");
        assert!(err.is_invalid_operation());
        assert_eq!(err.context.suggestions.len(), 2);
        assert!(err.context.suggestions.iter().all(|s| s.code.is_some()));
    }

    #[test]
    fn test_error_with_context() {
        let err = QueryError::not_found("User")
            .with_context("Finding user by id")
            .with_suggestion("Seed the database first");

        assert_eq!(err.context.operation, Some("Finding user by id".to_string()));
        assert!(err.context.suggestions.len() >= 2);
    }

    #[test]
    fn test_display_full() {
        let err = QueryError::unknown_relation("User", "employer")
            .with_context("Building include tree")
            .with_sql("SELECT 1");

        let output = err.display_full();
        assert!(output.contains("T7004"));
        assert!(output.contains("User"));
        assert!(output.contains("employer"));
        assert!(output.contains("SQL: SELECT 1"));
        assert!(output.contains("Suggestions"));
    }

    #[test]
    fn test_error_macro() {
        let err = query_error!(
            ErrorCode::InvalidFilter,
            "bad column",
            with_field = "nmae",
            with_suggestion = "Did you mean 'name'?"
        );

        assert_eq!(err.code, ErrorCode::InvalidFilter);
        assert_eq!(err.context.field, Some("nmae".to_string()));
    }

    #[test]
    fn test_error_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = QueryError::storage_unavailable("open failed").with_source(io);
        assert!(std::error::Error::source(&err).is_some());
    }
}
