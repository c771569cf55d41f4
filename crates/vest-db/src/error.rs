//! Database error types for vest-db.

use thiserror::Error;
use vest_core::errors::CoreError;

/// Errors from database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The requested row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A uniqueness rule was violated (duplicate email, slug, or distribution).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The entity is not in a state that allows the operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Input failed a business rule.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A withdrawal exceeds the withdrawable balance.
    #[error("Insufficient funds: requested {requested_cents}, available {available_cents}")]
    InsufficientFunds {
        requested_cents: i64,
        available_cents: i64,
    },

    /// A SQL query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DatabaseError {
    pub(crate) fn not_found(entity: &str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.into(),
        }
    }
}

impl From<CoreError> for DatabaseError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => Self::Validation(msg),
            CoreError::InvalidTransition {
                entity_type,
                id,
                from,
                to,
            } => Self::InvalidState(format!("Cannot move {entity_type} {id} from {from} to {to}")),
            CoreError::NotFound { entity_type, id } => Self::NotFound {
                entity: entity_type,
                id,
            },
            CoreError::Other(e) => Self::Other(e),
        }
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(err.into())
    }
}

/// Turn a UNIQUE constraint failure into `Conflict`, leaving other errors untouched.
pub(crate) fn conflict_on_unique(err: libsql::Error, message: impl FnOnce() -> String) -> DatabaseError {
    if err.to_string().contains("UNIQUE constraint failed") {
        DatabaseError::Conflict(message())
    } else {
        DatabaseError::LibSql(err)
    }
}
