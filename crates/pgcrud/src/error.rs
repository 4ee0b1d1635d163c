//! Error types for pgcrud

use thiserror::Error;
use tokio_postgres::error::SqlState;

/// Result type alias for pgcrud operations
pub type CrudResult<T> = Result<T, CrudError>;

/// Error types for descriptor validation and statement execution.
///
/// Database errors are carried untouched in [`CrudError::Query`]; callers that
/// care about specific constraint codes can ask through
/// [`CrudError::is_unique_violation`] and [`CrudError::is_foreign_key_violation`].
#[derive(Debug, Error)]
pub enum CrudError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error, as reported by the server or driver
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Pool checkout error
    #[error("Pool error: {0}")]
    Pool(String),

    /// No row matched the filters of a read, update or removal
    #[error("Not found: {0}")]
    NotFound(String),

    /// A descriptor referenced an unknown column, operator or identifier
    #[error("Validation error: {0}")]
    Validation(String),

    /// An operation was refused before any statement was issued
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A failed transaction could not be rolled back cleanly
    #[error("Transaction error: {0}")]
    Transaction(String),
}

impl CrudError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a precondition error
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a precondition error
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }

    /// SQLSTATE of the underlying database error, if there is one.
    pub fn sql_state(&self) -> Option<&SqlState> {
        match self {
            Self::Query(err) => err.code(),
            _ => None,
        }
    }

    /// Unique constraint violation (SQLSTATE 23505).
    pub fn is_unique_violation(&self) -> bool {
        self.sql_state() == Some(&SqlState::UNIQUE_VIOLATION)
    }

    /// Foreign key violation (SQLSTATE 23503), e.g. deleting a row still referenced.
    pub fn is_foreign_key_violation(&self) -> bool {
        self.sql_state() == Some(&SqlState::FOREIGN_KEY_VIOLATION)
    }

    /// Name of the violated constraint, if the server reported one.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            Self::Query(err) => err.as_db_error().and_then(|db| db.constraint()),
            _ => None,
        }
    }
}

/// Build a precondition error for `operation` on `table`, logging the refusal.
pub(crate) fn refuse(operation: &'static str, table: &str, message: impl Into<String>) -> CrudError {
    let message = message.into();
    tracing::warn!(target: "pgcrud", operation, table, %message, "refused before issuing any statement");
    CrudError::Precondition(message)
}

impl From<deadpool_postgres::PoolError> for CrudError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

impl From<serde_json::Error> for CrudError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
