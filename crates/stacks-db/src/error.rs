//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        Rule rejection (CoreError)          │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError (this module) ◄──────── DbError::Domain                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CirculationError (stacks-engine) ← what coordinator callers see       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::error::ErrorKind;
use stacks_core::CoreError;
use thiserror::Error;

/// Database operation errors.
///
/// Repositories report circulation rule rejections (a conditional update
/// that matched nothing, a closed record, ...) as [`DbError::Domain`], and
/// storage failures as the remaining variants.
#[derive(Debug, Error)]
pub enum DbError {
    /// A repository rejected the operation on circulation grounds.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Second open borrow record for the same copy
    /// - Duplicate ISBN or copy id
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Registering a copy for an ISBN with no catalog entry
    /// - Reserving an unknown ISBN
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed to begin or commit.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Returns the circulation rejection, if this is one.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            DbError::Domain(err) => Some(err),
            _ => None,
        }
    }

    /// True for a conditional copy update that lost to a concurrent writer.
    pub fn is_transition_conflict(&self) -> bool {
        matches!(self, DbError::Domain(CoreError::TransitionConflict { .. }))
    }

    /// True if the failure is transient and the caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::PoolExhausted) || self.is_transition_conflict()
    }
}

/// Storage failures, classified by the kind SQLite reports.
///
/// ```text
/// RowNotFound                   → NotFound
/// Database(UniqueViolation)     → UniqueViolation { field: "<table>.<column>" }
/// Database(ForeignKeyViolation) → ForeignKeyViolation
/// Database(other)               → QueryFailed
/// PoolTimedOut                  → PoolExhausted
/// PoolClosed                    → ConnectionFailed
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation => DbError::UniqueViolation {
                    field: constraint_target(db_err.message()),
                    value: "unknown".to_string(),
                },
                ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation {
                    message: db_err.message().to_string(),
                },
                _ => DbError::QueryFailed(db_err.message().to_string()),
            },

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

/// `"UNIQUE constraint failed: copies.copy_id"` → `"copies.copy_id"`
fn constraint_target(message: &str) -> String {
    message
        .rsplit_once(": ")
        .map(|(_, target)| target.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_pass_through_display() {
        let err: DbError = CoreError::NoCopyAvailable {
            isbn: "B001".into(),
        }
        .into();
        assert_eq!(err.to_string(), "No copy of B001 is available to borrow");
        assert!(err.as_domain().is_some());
    }

    #[test]
    fn test_conflict_is_retryable() {
        let err: DbError = CoreError::TransitionConflict {
            copy_id: "c".into(),
            expected: "in_library".into(),
            actual: "borrowed".into(),
        }
        .into();
        assert!(err.is_transition_conflict());
        assert!(err.is_retryable());
        assert!(!DbError::QueryFailed("syntax".into()).is_retryable());
    }

    #[test]
    fn test_constraint_target() {
        assert_eq!(
            constraint_target("UNIQUE constraint failed: borrow_records.copy_id"),
            "borrow_records.copy_id"
        );
        assert_eq!(constraint_target("constraint failed"), "unknown");
    }
}
